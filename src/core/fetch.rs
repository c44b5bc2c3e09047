//! Package fetch logic
//!
//! Retrieves a package's source archive into the scratch area. A file that
//! is already there counts as fetched and no network access happens.

use crate::core::workspace::Workspace;
use crate::error::FetchError;
use crate::infra::download::{DownloadManager, ProgressCallback};

/// What a fetch did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The archive was downloaded
    Downloaded {
        /// Bytes written
        size: u64,
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// The archive was already present
    AlreadyPresent,
}

/// Fetches archives into the scratch area
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    downloads: DownloadManager,
}

impl Fetcher {
    /// Create a fetcher using the given download manager
    pub fn new(downloads: DownloadManager) -> Self {
        Self { downloads }
    }

    /// Fetch `uri` into `<scratch>/<local_name>` unless it already exists
    pub async fn fetch(
        &self,
        workspace: &Workspace,
        uri: &str,
        local_name: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<FetchOutcome, FetchError> {
        tracing::info!("Fetching {uri}");

        if workspace.archive_exists(local_name) {
            tracing::info!("Already fetched. Skipping...");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let dest = workspace.archive_path(local_name);
        let result = self
            .downloads
            .download(uri, &dest, progress)
            .await
            .map_err(|error| FetchError::Download {
                uri: uri.to_string(),
                error,
            })?;

        tracing::debug!(
            "Downloaded {} bytes to {} in {} attempt(s)",
            result.size,
            result.path.display(),
            result.attempts
        );

        Ok(FetchOutcome::Downloaded {
            size: result.size,
            attempts: result.attempts,
        })
    }
}
