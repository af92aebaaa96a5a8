//! Mod installation.
//!
//! A batch runs every mod concurrently. Each mod moves through
//! `Queued -> Downloading -> Extracting -> Planning -> Copying -> Committed`
//! or ends in `Failed`; one mod failing never stops the others.
//!
//! The install record is written as pending before any network IO, so a
//! second batch naming the same id is refused while the first is running.
//! A failed mod has its record deleted again.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use hangar_core::io::{Downloader, Extracted, Progress, extract_archive};
use hangar_core::{CatalogStore, ModFilter, PlannedCopy, Reporter, plan_install};
use hangar_schema::{ModId, ModRecord};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ops::{Context, InstallError};
use crate::store::{DbError, DbHandle};

/// What happens to files already copied when a mod fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave them in the game directory.
    #[default]
    KeepCopiedFiles,
    /// Delete the files this mod copied.
    RemoveCopiedFiles,
}

impl FailurePolicy {
    pub fn from_flag(clean_on_failure: bool) -> Self {
        if clean_on_failure {
            Self::RemoveCopiedFiles
        } else {
            Self::KeepCopiedFiles
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Queued,
    Downloading,
    Extracting,
    Planning,
    Copying,
    Committed,
    Failed,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Planning => "planning",
            Self::Copying => "copying",
            Self::Committed => "committed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A mod that did not install, and the phase it reached.
#[derive(Debug)]
pub struct ModFailure {
    pub id: ModId,
    pub phase: InstallPhase,
    pub error: InstallError,
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub installed: Vec<ModId>,
    /// Already committed before the batch started.
    pub skipped: Vec<ModId>,
    pub failed: Vec<ModFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

type JobResult = (ModId, Result<Vec<String>, (InstallPhase, InstallError)>);

/// Runs install batches against one game directory.
pub struct InstallExecutor {
    db: DbHandle,
    downloader: Arc<dyn Downloader>,
    reporter: Arc<dyn Reporter>,
    game_dir: PathBuf,
    scratch_root: PathBuf,
    policy: FailurePolicy,
}

impl fmt::Debug for InstallExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallExecutor")
            .field("game_dir", &self.game_dir)
            .field("scratch_root", &self.scratch_root)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl InstallExecutor {
    pub fn new(
        db: DbHandle,
        downloader: Arc<dyn Downloader>,
        reporter: Arc<dyn Reporter>,
        game_dir: PathBuf,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            db,
            downloader,
            reporter,
            game_dir,
            scratch_root,
            policy: FailurePolicy::default(),
        }
    }

    /// Executor wired to the context's database, reporter and settings.
    pub fn from_context(ctx: &Context, downloader: Arc<dyn Downloader>) -> Self {
        Self::new(
            ctx.db.clone(),
            downloader,
            Arc::clone(&ctx.reporter),
            ctx.settings.game.dir.clone(),
            hangar_core::tmp_path(&ctx.home),
        )
        .with_policy(FailurePolicy::from_flag(ctx.settings.install.clean_on_failure))
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Install every mod in `ids`.
    ///
    /// Returns once each mod has committed or failed.
    pub async fn install_mods(&self, catalog: &dyn CatalogStore, ids: &[ModId]) -> BatchReport {
        let start_time = Instant::now();
        let mut report = BatchReport::default();

        let accepted = self.claim_records(ids, &mut report).await;

        let mut set: JoinSet<JobResult> = JoinSet::new();
        let mut in_flight = HashSet::new();
        for id in accepted {
            let record = match catalog.find_one(&ModFilter::Id(id.clone())) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.fail(&mut report, id.clone(), InstallPhase::Queued, InstallError::NotFound(id))
                        .await;
                    continue;
                }
                Err(e) => {
                    self.fail(&mut report, id, InstallPhase::Queued, e.into()).await;
                    continue;
                }
            };

            in_flight.insert(id);
            let job = InstallJob {
                record,
                downloader: Arc::clone(&self.downloader),
                reporter: Arc::clone(&self.reporter),
                game_dir: self.game_dir.clone(),
                scratch_root: self.scratch_root.clone(),
                policy: self.policy,
            };
            set.spawn(job.run());
        }

        while let Some(joined) = set.join_next().await {
            let (id, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Install task aborted");
                    continue;
                }
            };
            in_flight.remove(&id);

            match outcome {
                Ok(files) => match self.db.commit_install(id.clone(), files).await {
                    Ok(()) => {
                        info!(mod_id = %id, "Installed");
                        self.reporter.done(&id, "installed");
                        report.installed.push(id);
                    }
                    Err(e) => {
                        self.fail(&mut report, id, InstallPhase::Committed, e.into())
                            .await;
                    }
                },
                Err((phase, error)) => self.fail(&mut report, id, phase, error).await,
            }
        }

        // Tasks that panicked never reported back.
        for id in in_flight {
            self.fail(
                &mut report,
                id,
                InstallPhase::Failed,
                InstallError::context("Install task", "aborted before completion"),
            )
            .await;
        }

        if !report.installed.is_empty() {
            self.reporter.summary(
                report.installed.len(),
                "installed",
                start_time.elapsed().as_secs_f64(),
            );
        }
        report
    }

    /// Deduplicate `ids`, skip committed ones and write a pending record for
    /// the rest. Returns the ids this batch owns.
    async fn claim_records(&self, ids: &[ModId], report: &mut BatchReport) -> Vec<ModId> {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();

        for id in ids {
            if !seen.insert(id.clone()) {
                continue;
            }

            match self.db.get_install(id.clone()).await {
                Ok(Some(existing)) if !existing.is_pending() => {
                    self.reporter.done(id, "already installed");
                    report.skipped.push(id.clone());
                    continue;
                }
                Ok(Some(_)) => {
                    self.reject(report, id, InstallError::InProgress(id.clone()));
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    self.reject(report, id, e.into());
                    continue;
                }
            }

            match self.db.insert_pending(id.clone()).await {
                Ok(()) => accepted.push(id.clone()),
                Err(DbError::AlreadyRecorded(_)) => {
                    self.reject(report, id, InstallError::InProgress(id.clone()));
                }
                Err(e) => self.reject(report, id, e.into()),
            }
        }

        debug!(requested = ids.len(), accepted = accepted.len(), "Claimed install records");
        accepted
    }

    /// Record a failure for an id whose record this batch does not own.
    fn reject(&self, report: &mut BatchReport, id: &ModId, error: InstallError) {
        warn!(mod_id = %id, error = %error, "Install rejected");
        self.reporter.failed(id, &error.to_string());
        report.failed.push(ModFailure {
            id: id.clone(),
            phase: InstallPhase::Queued,
            error,
        });
    }

    /// Record a failure and delete the pending record this batch wrote.
    async fn fail(
        &self,
        report: &mut BatchReport,
        id: ModId,
        phase: InstallPhase,
        error: InstallError,
    ) {
        warn!(mod_id = %id, %phase, error = %error, "Install failed");
        if let Err(e) = self.db.remove_install(id.clone()).await {
            warn!(mod_id = %id, error = %e, "Failed to delete pending install record");
        }
        self.reporter.failed(&id, &error.to_string());
        report.failed.push(ModFailure { id, phase, error });
    }
}

/// Everything one mod's task needs, owned so the task is `'static`.
struct InstallJob {
    record: ModRecord,
    downloader: Arc<dyn Downloader>,
    reporter: Arc<dyn Reporter>,
    game_dir: PathBuf,
    scratch_root: PathBuf,
    policy: FailurePolicy,
}

impl InstallJob {
    async fn run(self) -> JobResult {
        let id = self.record.id();
        let outcome = self.install(&id).await;
        (id, outcome)
    }

    async fn install(&self, id: &ModId) -> Result<Vec<String>, (InstallPhase, InstallError)> {
        if self.record.is_metapackage() {
            debug!(mod_id = %id, "Metapackage, nothing to copy");
            return Ok(Vec::new());
        }

        let scratch = self
            .scratch_dir()
            .await
            .map_err(|e| (InstallPhase::Downloading, e))?;

        let extracted = self
            .fetch(id, scratch.path())
            .await?;

        let plan = plan_install(&self.record, &extracted.files)
            .map_err(|e| (InstallPhase::Planning, e.into()))?;

        let copied = self.copy_files(id, &plan, &extracted).await;
        match copied {
            Ok(files) => Ok(files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect()),
            Err((copied, error)) => {
                if self.policy == FailurePolicy::RemoveCopiedFiles {
                    remove_copied(&copied).await;
                }
                Err((InstallPhase::Copying, error))
            }
        }
    }

    async fn scratch_dir(&self) -> Result<tempfile::TempDir, InstallError> {
        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(|e| InstallError::io(&self.scratch_root, e))?;
        tempfile::Builder::new()
            .prefix("hangar-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| InstallError::io(&self.scratch_root, e))
    }

    async fn fetch(
        &self,
        id: &ModId,
        scratch: &Path,
    ) -> Result<Extracted, (InstallPhase, InstallError)> {
        let url = self.record.download.as_deref().ok_or_else(|| {
            (
                InstallPhase::Downloading,
                InstallError::context("Download", "record has no download URL"),
            )
        })?;

        let archive = scratch.join(format!("{}.zip", self.record.identifier));
        let reporter = &self.reporter;
        let progress = |p: Progress| reporter.downloading(id, p.downloaded, p.total);
        self.downloader
            .fetch(url, &archive, &progress)
            .await
            .map_err(|e| (InstallPhase::Downloading, e.into()))?;

        self.reporter.extracting(id);
        extract_archive(archive, scratch.join("unpacked"))
            .await
            .map_err(|e| (InstallPhase::Extracting, e.into()))
    }

    /// Copy planned files one at a time. On error, returns what was copied
    /// before the failure.
    async fn copy_files(
        &self,
        id: &ModId,
        plan: &[PlannedCopy],
        extracted: &Extracted,
    ) -> Result<Vec<PathBuf>, (Vec<PathBuf>, InstallError)> {
        let mut copied = Vec::with_capacity(plan.len());

        for (i, planned) in plan.iter().enumerate() {
            let target = self.game_dir.join(&planned.target);
            if let Err(e) = copy_one(&extracted.path_of(&planned.source), &target).await {
                return Err((copied, e));
            }
            copied.push(target);
            self.reporter.installing(id, i + 1, plan.len());
        }

        Ok(copied)
    }
}

async fn copy_one(source: &Path, target: &Path) -> Result<(), InstallError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::io(parent, e))?;
    }
    tokio::fs::copy(source, target)
        .await
        .map_err(|e| InstallError::io(target, e))?;
    Ok(())
}

async fn remove_copied(copied: &[PathBuf]) {
    for path in copied {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!(path = %path.display(), error = %e, "Failed to remove copied file");
        }
    }
}
