//! Error types for extbuild
//!
//! Domain-specific error types using thiserror. Each pipeline component has
//! its own enum; the orchestrator wraps them in [`crate::core::pipeline::PipelineError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::core::method::BuildStep;

/// Run configuration errors
///
/// Raised before any side effect and never retried.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Workspace root variable not set
    #[error("Environment variable {var} not set. Please set it to the workspace where dependencies will be built")]
    RootNotSet { var: String },

    /// No package list given on the command line
    #[error("Invalid arguments. Missing input file")]
    MissingInput,

    /// Package list could not be read
    #[error("Failed to read package list '{path}': {error}")]
    InputUnreadable { path: PathBuf, error: String },

    /// Package list could not be parsed
    #[error("Failed to parse package list '{path}': {error}")]
    InputParse { path: PathBuf, error: String },

    /// Package name is not usable as a directory name
    #[error("Invalid package name '{name}': must be a single directory name")]
    InvalidPackageName { name: String },

    /// Scratch area could not be prepared
    #[error("Failed to prepare workspace: {0}")]
    Workspace(#[from] FilesystemError),
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Every attempt failed
    #[error("Download failed after {attempts} attempts: {error}")]
    MaxRetriesExceeded {
        url: String,
        attempts: u32,
        error: String,
    },
}

/// Fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Retries exhausted
    #[error("Failed to download package from {uri} with error: {error}")]
    Download { uri: String, error: DownloadError },
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Archive suffix not recognized
    #[error("Unknown file compression type: {archive}")]
    UnsupportedFormat { archive: String },

    /// Archive is unreadable or corrupt
    #[error("Failed to extract '{archive}': {error}")]
    Corrupt { archive: PathBuf, error: String },

    /// Archive entry would escape the target directory
    #[error("Archive '{archive}' contains unsafe entry '{entry}'")]
    UnsafeEntry { archive: PathBuf, entry: String },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Patch errors
#[derive(Error, Debug)]
pub enum PatchError {
    /// Referenced patch file does not exist
    #[error("Patch file missing: {name} (looked in '{}')", path.display())]
    MissingPatch { name: String, path: PathBuf },

    /// Patch tool could not be started
    #[error("Failed to run patch tool: {0}")]
    Tool(ProcessError),
}

/// Build errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build method tag not recognized
    #[error("Unknown configuration method: {method}")]
    UnknownMethod { method: String },

    /// A configure/build/install subprocess failed
    #[error("{step} step failed: {error}")]
    StepFailed { step: BuildStep, error: ProcessError },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl BuildError {
    /// The sub-step that failed, if the failure came from a subprocess
    pub fn step(&self) -> Option<BuildStep> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            Self::UnknownMethod { .. } | Self::Filesystem(_) => None,
        }
    }
}

/// External process errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Command line was empty after expansion
    #[error("Empty command")]
    EmptyCommand,

    /// Process could not be spawned
    #[error("Failed to start command '{command}': {error}")]
    Spawn { command: String, error: String },

    /// Process exited unsuccessfully
    #[error("Failed to process command '{command}' ({}) with error: {stderr}", code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to remove file
    #[error("Failed to remove file '{path}': {error}")]
    RemoveFile { path: PathBuf, error: String },
}
