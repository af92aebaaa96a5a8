//! IO primitives: archive downloads and extraction.

pub mod download;
pub mod extract;

pub use download::{DownloadError, Downloader, HttpDownloader, Progress};
pub use extract::{ExtractError, Extracted, extract_archive, extract_zip};
