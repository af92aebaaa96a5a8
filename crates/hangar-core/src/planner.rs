//! Map extracted archive paths to destinations in the game directory.
//!
//! Archive paths are the `/`-separated entry names produced by
//! [`crate::io::extract`]. Targets are relative to the game directory.

use std::path::{Component, Path, PathBuf};

use hangar_schema::{InstallDirective, Matcher, ModRecord};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

/// Install root used when a record has no `install` stanza.
pub const GAME_DATA: &str = "GameData";

/// `install_to` value naming the game directory itself.
pub const GAME_ROOT: &str = "GameRoot";

/// Why a record's files cannot be placed.
#[derive(Error, Debug)]
pub enum PlanError {
    /// A `find_regexp` directive does not compile.
    #[error("Invalid find_regexp pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },

    /// A target would land outside the game directory.
    #[error("Refusing to place {file} outside the game directory ({target})")]
    UnsafePath {
        /// Archive file being placed.
        file: String,
        /// Resolved target path.
        target: String,
    },
}

/// One file copy: archive path to game-relative target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    /// Path inside the extracted archive.
    pub source: String,
    /// Path relative to the game directory.
    pub target: PathBuf,
}

/// Work out where every file of `record` goes.
///
/// Without directives, files living below `GameData/<dir>/` are installed
/// under `GameData`, keeping the path after the first `GameData/`.
pub fn plan_install(record: &ModRecord, files: &[String]) -> Result<Vec<PlannedCopy>, PlanError> {
    if record.is_metapackage() {
        return Ok(Vec::new());
    }

    let Some(directives) = &record.install else {
        return default_layout(files);
    };

    let mut plan = Vec::new();
    for directive in directives {
        let before = plan.len();
        plan.extend(apply(directive, files)?);
        if plan.len() == before {
            warn!(mod_id = %record.id(), ?directive, "Install directive matched no files");
        }
    }
    debug!(mod_id = %record.id(), copies = plan.len(), "Planned install");
    Ok(plan)
}

fn default_layout(files: &[String]) -> Result<Vec<PlannedCopy>, PlanError> {
    let marker = format!("{GAME_DATA}/");
    files
        .iter()
        .filter(|file| has_game_data_subdir(dirname(file)))
        .filter_map(|file| {
            file.find(&marker)
                .map(|idx| (file, &file[idx + marker.len()..]))
        })
        .map(|(file, destination)| planned(file, GAME_DATA, destination))
        .collect()
}

/// `GameData/` followed by at least one more character.
fn has_game_data_subdir(dir: &str) -> bool {
    dir.match_indices("GameData/")
        .any(|(idx, marker)| dir.len() > idx + marker.len())
}

fn apply(directive: &InstallDirective, files: &[String]) -> Result<Vec<PlannedCopy>, PlanError> {
    let install_to = directive.install_to.as_str();
    match &directive.matcher {
        Matcher::File(prefix) => {
            let prefix = prefix.trim_end_matches('/');
            let keep_from = prefix.len() - basename(prefix).len();
            files
                .iter()
                .filter(|file| file.starts_with(prefix))
                .map(|file| planned(file, install_to, &file[keep_from..]))
                .collect()
        }
        Matcher::Find(needle) => files
            .iter()
            .filter(|file| dirname(file).contains(needle.as_str()))
            .filter_map(|file| file.find(needle.as_str()).map(|idx| (file, &file[idx..])))
            .map(|(file, destination)| {
                planned(file, install_to, strip_install_root(destination, install_to))
            })
            .collect(),
        Matcher::FindRegexp(pattern) => {
            let regex = Regex::new(pattern).map_err(|source| PlanError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            files
                .iter()
                .filter(|file| regex.is_match(file))
                .map(|file| planned(file, install_to, strip_install_root(file, install_to)))
                .collect()
        }
    }
}

/// `find` and `find_regexp` keep the matched path, which often already
/// starts with the install root (`GameData/Foo` into `GameData`). Drop that
/// leading root once so it is not doubled.
fn strip_install_root<'a>(destination: &'a str, install_to: &str) -> &'a str {
    destination
        .strip_prefix(install_to)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(destination)
}

fn planned(file: &str, install_to: &str, destination: &str) -> Result<PlannedCopy, PlanError> {
    let root = if install_to == GAME_ROOT { "" } else { install_to };
    let target = Path::new(root).join(destination);

    let escapes = target
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || destination.is_empty() {
        return Err(PlanError::UnsafePath {
            file: file.to_string(),
            target: target.display().to_string(),
        });
    }

    Ok(PlannedCopy {
        source: file.to_string(),
        target,
    })
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn basename(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}
