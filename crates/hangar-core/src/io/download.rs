//! Streaming archive downloads with progress reporting.
//!
//! A failed transfer never leaves a partial file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Bytes between two progress notifications.
pub const NOTIFY_INTERVAL: u64 = 100 * 1024;

/// Errors raised by a [`Downloader`].
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Request failed or returned an error status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the destination file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transfer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes written so far.
    pub downloaded: u64,
    /// `Content-Length`, when the server sent one.
    pub total: Option<u64>,
}

impl Progress {
    /// Completed fraction in `0.0..=1.0`, if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total
            .filter(|total| *total > 0)
            .map(|total| (self.downloaded as f64 / total as f64).min(1.0))
    }
}

/// Callback receiving [`Progress`] updates.
pub type ProgressFn<'a> = &'a (dyn Fn(Progress) + Send + Sync);

/// Fetches a URL into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`, creating parent directories.
    ///
    /// Returns `dest` on success. On failure `dest` does not exist.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<PathBuf, DownloadError>;
}

/// [`Downloader`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    notify_interval: u64,
}

impl HttpDownloader {
    /// Downloader over `client`, notifying every 100 KiB.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            notify_interval: NOTIFY_INTERVAL,
        }
    }

    /// Build a client carrying the hangar user agent.
    pub fn with_default_client() -> Result<Self, DownloadError> {
        let client = Client::builder().user_agent(crate::USER_AGENT).build()?;
        Ok(Self::new(client))
    }

    /// Override the notification interval (bytes).
    pub fn notify_every(mut self, bytes: u64) -> Self {
        self.notify_interval = bytes.max(1);
        self
    }

    async fn stream_to(
        &self,
        url: &str,
        dest: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<(), DownloadError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut last_notified = 0u64;

        progress(Progress {
            downloaded: 0,
            total,
        });

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if downloaded - last_notified >= self.notify_interval {
                last_notified = downloaded;
                progress(Progress { downloaded, total });
            }
        }
        file.flush().await?;

        progress(Progress {
            downloaded,
            total: total.or(Some(downloaded)),
        });
        debug!(url, bytes = downloaded, "Download complete");
        Ok(())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<PathBuf, DownloadError> {
        if let Err(e) = self.stream_to(url, dest, progress).await {
            warn!(url, error = %e, "Download failed");
            tokio::fs::remove_file(dest).await.ok();
            return Err(e);
        }
        Ok(dest.to_path_buf())
    }
}
