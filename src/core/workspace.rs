//! Workspace layout
//!
//! Owns the workspace root and the well-known paths under it:
//!
//! ```text
//! <root>/external/<name><ext>   fetched archive
//! <root>/external/<name>/       unpacked and built source tree
//! <root>/patches/<file>         patch files
//! <root>/<prefix>/              shared install prefix
//! ```

use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::error::{ConfigurationError, FilesystemError};
use crate::infra::filesystem;

/// Resolved workspace root and its subpaths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    prefix_name: String,
}

impl Workspace {
    /// Create a workspace rooted at `root` with the default prefix name
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix_name: defaults::INSTALL_PREFIX_DIR.to_string(),
        }
    }

    /// Resolve the workspace from an externally supplied root
    ///
    /// Fails without touching the filesystem when the root is absent or empty.
    /// Relative roots are made absolute against the current directory.
    pub fn resolve(root: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        let root = root
            .filter(|r| !r.as_os_str().is_empty())
            .ok_or_else(|| ConfigurationError::RootNotSet {
                var: defaults::ROOT_ENV_VAR.to_string(),
            })?;

        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };

        Ok(Self::new(root))
    }

    /// Use a different install prefix directory name
    #[must_use]
    pub fn with_prefix_name(mut self, name: impl Into<String>) -> Self {
        self.prefix_name = name.into();
        self
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch area where archives are fetched and unpacked
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(defaults::SCRATCH_DIR)
    }

    /// Shared install prefix
    pub fn install_prefix(&self) -> PathBuf {
        self.root.join(&self.prefix_name)
    }

    /// Directory holding patch files
    pub fn patches_dir(&self) -> PathBuf {
        self.root.join(defaults::PATCHES_DIR)
    }

    /// Path of a fetched archive
    pub fn archive_path(&self, archive_name: &str) -> PathBuf {
        self.scratch_dir().join(archive_name)
    }

    /// Unpacked source tree of a package
    pub fn source_dir(&self, package_name: &str) -> PathBuf {
        self.scratch_dir().join(package_name)
    }

    /// Whether an archive was already fetched
    pub fn archive_exists(&self, archive_name: &str) -> bool {
        self.archive_path(archive_name).is_file()
    }

    /// Whether a package's source tree already exists
    pub fn target_dir_exists(&self, package_name: &str) -> bool {
        self.source_dir(package_name).is_dir()
    }

    /// Create the scratch area; an existing one is left alone
    pub fn ensure(&self) -> Result<(), FilesystemError> {
        filesystem::create_dir_all(&self.scratch_dir())
    }

    /// Remove the scratch area and everything in it
    pub fn reset(&self) -> Result<(), FilesystemError> {
        tracing::info!("Removing {}", self.scratch_dir().display());
        filesystem::remove_dir_all(&self.scratch_dir())
    }
}
