//! Repository bundle refresh.
//!
//! The repository is a zip of JSON documents, one per mod version, plus a
//! few repository-level documents. Every entry goes through
//! [`ModRecord::from_json`]; anything that is not a mod record is counted and
//! dropped.

use std::path::Path;

use hangar_schema::ModRecord;
use thiserror::Error;
use tracing::{debug, info};

use crate::Reporter;
use crate::io::download::{DownloadError, Downloader, Progress};
use crate::io::extract::{ExtractError, for_each_entry};

/// Entries between two parse progress notifications.
const PARSE_NOTIFY_INTERVAL: usize = 250;

/// Errors raised while refreshing the repository.
#[derive(Error, Debug)]
pub enum RepoError {
    /// The bundle could not be fetched.
    #[error("Failed to download repository: {0}")]
    Download(#[from] DownloadError),

    /// The bundle is not a readable zip.
    #[error("Failed to read repository bundle: {0}")]
    Bundle(#[from] ExtractError),

    /// Scratch file handling failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Records read from one bundle.
#[derive(Debug, Default)]
pub struct Bundle {
    /// Entries accepted as mod records.
    pub records: Vec<ModRecord>,
    /// Entries refused at ingest.
    pub rejected: usize,
}

/// Parse every entry of the bundle at `path`.
///
/// `on_progress` receives the fraction of entries visited.
pub fn read_bundle<F>(path: &Path, mut on_progress: F) -> Result<Bundle, ExtractError>
where
    F: FnMut(f64),
{
    let mut bundle = Bundle::default();
    let mut visited = 0usize;

    for_each_entry(path, |name, bytes, index, count| {
        match ModRecord::from_json(bytes) {
            Ok(record) => bundle.records.push(record),
            Err(e) => {
                debug!(entry = name, error = %e, "Skipping bundle entry");
                bundle.rejected += 1;
            }
        }
        visited += 1;
        if visited % PARSE_NOTIFY_INTERVAL == 0 {
            on_progress((index + 1) as f64 / count as f64);
        }
    })?;
    on_progress(1.0);

    Ok(bundle)
}

/// Download the bundle at `url` and parse it.
///
/// Progress is reported as one fraction: the download covers the first half
/// and parsing the second.
pub async fn fetch_repository<R>(
    downloader: &dyn Downloader,
    url: &str,
    reporter: &R,
) -> Result<Bundle, RepoError>
where
    R: Reporter + Clone + 'static,
{
    let scratch = tempfile::Builder::new().prefix("hangar-repo-").tempdir()?;
    let archive = scratch.path().join("repository.zip");

    let report_download = |p: Progress| {
        if let Some(fraction) = p.fraction() {
            reporter.refreshing(fraction * 0.5);
        }
    };
    downloader.fetch(url, &archive, &report_download).await?;
    reporter.refreshing(0.5);

    let parse_reporter = reporter.clone();
    let bundle = tokio::task::spawn_blocking(move || {
        read_bundle(&archive, |fraction| {
            parse_reporter.refreshing(0.5 + fraction * 0.5);
        })
    })
    .await
    .map_err(|e| ExtractError::Task(e.to_string()))??;

    info!(
        url,
        records = bundle.records.len(),
        rejected = bundle.rejected,
        "Repository refreshed"
    );
    drop(scratch);
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::HttpDownloader;
    use crate::io::extract::tests::zip_bytes;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const MOD_A: &str = r#"{"identifier":"A","version":"1.0","download":"https://x/a.zip"}"#;
    const MOD_B: &str = r#"{"identifier":"B","version":"2.0","kind":"metapackage"}"#;

    fn bundle_bytes() -> Vec<u8> {
        zip_bytes(&[
            ("CKAN-meta-master/", ""),
            ("CKAN-meta-master/A/A-1.0.ckan", MOD_A),
            ("CKAN-meta-master/B/B-2.0.ckan", MOD_B),
            (
                "CKAN-meta-master/repositories.json",
                r#"{"repositories":[{"name":"default","uri":"https://x"}]}"#,
            ),
            ("CKAN-meta-master/builds.json", r#"{"builds":{"1":"1.0"}}"#),
            ("CKAN-meta-master/README.md", "# readme"),
        ])
    }

    #[derive(Clone, Default)]
    struct RecordingReporter {
        fractions: Arc<Mutex<Vec<f64>>>,
    }

    impl Reporter for RecordingReporter {
        fn section(&self, _: &str) {}
        fn refreshing(&self, fraction: f64) {
            self.fractions.lock().unwrap().push(fraction);
        }
        fn downloading(&self, _: &hangar_schema::ModId, _: u64, _: Option<u64>) {}
        fn extracting(&self, _: &hangar_schema::ModId) {}
        fn installing(&self, _: &hangar_schema::ModId, _: usize, _: usize) {}
        fn removing(&self, _: &hangar_schema::ModId) {}
        fn done(&self, _: &hangar_schema::ModId, _: &str) {}
        fn failed(&self, _: &hangar_schema::ModId, _: &str) {}
        fn info(&self, _: &str) {}
        fn success(&self, _: &str) {}
        fn warning(&self, _: &str) {}
        fn error(&self, _: &str) {}
        fn summary(&self, _: usize, _: &str, _: f64) {}
    }

    #[test]
    fn test_read_bundle_rejects_foreign_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.zip");
        std::fs::write(&path, bundle_bytes()).unwrap();

        let mut last = 0.0;
        let bundle = read_bundle(&path, |f| last = f).unwrap();

        let ids: Vec<_> = bundle.records.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["A---1.0", "B---2.0"]);
        assert_eq!(bundle.rejected, 3);
        assert!((last - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_fetch_repository() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/master.zip")
            .with_status(200)
            .with_body(bundle_bytes())
            .create_async()
            .await;

        let reporter = RecordingReporter::default();
        let downloader = HttpDownloader::with_default_client().unwrap();
        let bundle = fetch_repository(&downloader, &format!("{}/master.zip", server.url()), &reporter)
            .await
            .unwrap();

        assert_eq!(bundle.records.len(), 2);
        let fractions = reporter.fractions.lock().unwrap().clone();
        assert!(fractions.contains(&0.5));
        assert!((fractions.last().unwrap() - 1.0).abs() < f64::EPSILON);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_fetch_repository_download_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/master.zip")
            .with_status(500)
            .create_async()
            .await;

        let downloader = HttpDownloader::with_default_client().unwrap();
        let err = fetch_repository(
            &downloader,
            &format!("{}/master.zip", server.url()),
            &RecordingReporter::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Download(_)));
    }
}
