//! Zip extraction for mod archives and the repository bundle.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// Errors raised while reading an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The zip itself is malformed.
    #[error("Archive error: {0}")]
    Archive(String),

    /// The blocking extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

/// Result of unpacking one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Directory the entries were written under.
    pub root: PathBuf,
    /// Relative `/`-separated paths of every file entry, in archive order.
    pub files: Vec<String>,
}

impl Extracted {
    /// On-disk location of an entry.
    pub fn path_of(&self, entry: &str) -> PathBuf {
        self.root.join(entry)
    }
}

/// Unpack a zip archive into `dest_dir`.
///
/// Entries whose names would escape `dest_dir` are skipped.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Extracted, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    fs::create_dir_all(dest_dir)?;

    let mut files = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => continue,
        };
        let absolute_path = dest_dir.join(&relative_path);

        if entry.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut out)?;
        files.push(slash_path(&relative_path));
    }

    debug!(archive = %archive_path.display(), files = files.len(), "Extracted archive");
    Ok(Extracted {
        root: dest_dir.to_path_buf(),
        files,
    })
}

/// [`extract_zip`] on the blocking pool.
pub async fn extract_archive(
    archive_path: PathBuf,
    dest_dir: PathBuf,
) -> Result<Extracted, ExtractError> {
    tokio::task::spawn_blocking(move || extract_zip(&archive_path, &dest_dir))
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))?
}

/// Visit the bytes of every file entry without writing anything to disk.
///
/// `visit` receives the entry name, its contents, and the index and count
/// of entries (directories included) for progress reporting.
pub fn for_each_entry<F>(archive_path: &Path, mut visit: F) -> Result<(), ExtractError>
where
    F: FnMut(&str, &[u8], usize, usize),
{
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let count = archive.len();

    let mut buf = Vec::new();
    for i in 0..count {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        buf.clear();
        entry.read_to_end(&mut buf)?;
        visit(entry.name(), &buf, i, count);
    }
    Ok(())
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
