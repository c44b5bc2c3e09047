//! HTTP download functionality
//!
//! Streams a remote archive to disk with a bounded number of retries.
//! A failed attempt never leaves a partial file behind.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::defaults;
use crate::error::DownloadError;
use crate::infra::filesystem;

/// Progress callback type for download progress reporting
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Download result containing file path and metadata
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Number of attempts it took
    pub attempts: u32,
}

/// Download manager for fetching files with retry support
#[derive(Debug, Clone)]
pub struct DownloadManager {
    /// HTTP client
    client: reqwest::Client,
    /// Retries after the initial attempt
    max_retries: u32,
    /// Delay between attempts (in milliseconds)
    retry_delay_ms: u64,
}

impl DownloadManager {
    /// Create a new download manager
    pub fn new() -> Self {
        Self::with_config(defaults::MAX_DOWNLOAD_RETRIES, defaults::RETRY_DELAY_MS)
    }

    /// Create a download manager with custom settings
    pub fn with_config(max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            max_retries,
            retry_delay_ms,
        }
    }

    /// Get max retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Download a file, retrying on any transport failure
    ///
    /// Makes at most `max_retries + 1` attempts. The destination is deleted
    /// after every failed attempt.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<DownloadResult, DownloadError> {
        let total_attempts = self.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.download_once(url, dest, progress.as_ref()).await {
                Ok(size) => {
                    return Ok(DownloadResult {
                        path: dest.to_path_buf(),
                        size,
                        attempts: attempt,
                    })
                }
                Err(e) => {
                    filesystem::remove_file(dest).map_err(|cleanup| DownloadError::IoError {
                        path: dest.to_path_buf(),
                        error: cleanup.to_string(),
                    })?;

                    if attempt >= total_attempts {
                        return Err(DownloadError::MaxRetriesExceeded {
                            url: url.to_string(),
                            attempts: attempt,
                            error: e.to_string(),
                        });
                    }

                    tracing::warn!(
                        "Fetch failed. Retrying... (Attempt {} of {}): {}",
                        attempt,
                        self.max_retries,
                        e
                    );

                    if self.retry_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
                    }
                }
            }
        }
    }

    /// Single download attempt without retry
    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64, DownloadError> {
        let network_error = |e: reqwest::Error| DownloadError::NetworkError {
            url: url.to_string(),
            error: e.to_string(),
        };
        let io_error = |e: std::io::Error| DownloadError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(network_error)?;

        let total_size = response.content_length().unwrap_or(0);

        let mut file = File::create(dest).await.map_err(io_error)?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(network_error)?;

            file.write_all(&chunk).await.map_err(io_error)?;
            downloaded += chunk.len() as u64;

            if let Some(cb) = progress {
                cb(downloaded, total_size);
            }
        }

        file.flush().await.map_err(io_error)?;

        Ok(downloaded)
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}
