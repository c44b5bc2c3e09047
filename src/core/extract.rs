//! Archive unpacking
//!
//! Detects the archive kind from its name and unpacks it into the package's
//! source directory. Whatever the archive's top-level folder is called, its
//! contents end up directly under the target directory.

use std::fmt;
use std::path::Path;

use crate::error::ExtractError;
use crate::infra::archive::{self, TarCompression};
use crate::infra::filesystem;

/// Supported archive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// gzip-compressed tarball (`.gz`, `.tgz`)
    GzipTar,
    /// bzip2-compressed tarball (`.bz2`)
    Bzip2Tar,
    /// zip archive (`.zip`)
    Zip,
}

impl ArchiveKind {
    /// Detect the kind from a file name suffix
    pub fn detect(archive_name: &str) -> Result<Self, ExtractError> {
        if archive_name.ends_with(".gz") || archive_name.ends_with(".tgz") {
            Ok(Self::GzipTar)
        } else if archive_name.ends_with(".bz2") {
            Ok(Self::Bzip2Tar)
        } else if archive_name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(ExtractError::UnsupportedFormat {
                archive: archive_name.to_string(),
            })
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GzipTar => write!(f, "gzip tarball"),
            Self::Bzip2Tar => write!(f, "bzip2 tarball"),
            Self::Zip => write!(f, "zip archive"),
        }
    }
}

/// Unpack `archive_path` into `target_dir`
///
/// Tarballs are extracted over an existing target directory. Zip archives
/// replace it: any existing target is removed first.
pub fn unpack(archive_path: &Path, target_dir: &Path) -> Result<ArchiveKind, ExtractError> {
    let archive_name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = ArchiveKind::detect(&archive_name)?;

    tracing::info!("Unpacking {archive_name}");

    match kind {
        ArchiveKind::GzipTar | ArchiveKind::Bzip2Tar => {
            let compression = if kind == ArchiveKind::GzipTar {
                TarCompression::Gzip
            } else {
                TarCompression::Bzip2
            };
            filesystem::create_dir_all(target_dir)?;
            archive::unpack_tar(archive_path, target_dir, compression)?;
        }
        ArchiveKind::Zip => {
            filesystem::remove_dir_all(target_dir)?;
            archive::unpack_zip(archive_path, target_dir)?;
        }
    }

    tracing::debug!("Unpacked {kind} into {}", target_dir.display());
    Ok(kind)
}
