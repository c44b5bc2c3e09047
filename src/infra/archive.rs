//! Archive extraction
//!
//! Unpacks tar (gzip/bzip2) and zip archives while discarding the first path
//! component of every entry, so a `zlib-1.2.11/` wrapper folder never shows
//! up under the destination.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

use crate::error::ExtractError;
use crate::infra::filesystem;

/// Tar stream compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    /// gzip (`.gz`, `.tgz`)
    Gzip,
    /// bzip2 (`.bz2`)
    Bzip2,
}

/// Drop the first component of an entry path
///
/// Returns `None` for the wrapper entry itself and for paths that would
/// escape the destination.
fn strip_first_component(path: &Path) -> Option<PathBuf> {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));
    components.next()?;

    let mut stripped = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => stripped.push(part),
            _ => return None,
        }
    }

    if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(stripped)
    }
}

fn corrupt(archive: &Path, e: impl ToString) -> ExtractError {
    ExtractError::Corrupt {
        archive: archive.to_path_buf(),
        error: e.to_string(),
    }
}

fn is_unsafe(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

/// Extract a compressed tarball into `dest`, stripping one leading component
pub fn unpack_tar(
    archive_path: &Path,
    dest: &Path,
    compression: TarCompression,
) -> Result<(), ExtractError> {
    let file = File::open(archive_path).map_err(|e| corrupt(archive_path, e))?;
    let reader = BufReader::new(file);
    let decoder: Box<dyn Read> = match compression {
        TarCompression::Gzip => Box::new(GzDecoder::new(reader)),
        TarCompression::Bzip2 => Box::new(BzDecoder::new(reader)),
    };

    unpack_tar_stream(archive_path, decoder, dest)
}

fn unpack_tar_stream<R: Read>(
    archive_path: &Path,
    reader: R,
    dest: &Path,
) -> Result<(), ExtractError> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry in archive.entries().map_err(|e| corrupt(archive_path, e))? {
        let mut entry = entry.map_err(|e| corrupt(archive_path, e))?;
        let path = entry.path().map_err(|e| corrupt(archive_path, e))?.into_owned();

        if is_unsafe(&path) {
            return Err(ExtractError::UnsafeEntry {
                archive: archive_path.to_path_buf(),
                entry: path.display().to_string(),
            });
        }

        let Some(stripped) = strip_first_component(&path) else {
            continue;
        };
        let dest_path = dest.join(&stripped);

        if let Some(parent) = dest_path.parent() {
            filesystem::create_dir_all(parent)?;
        }

        // Hard link targets are archive paths and need the same stripping
        if entry.header().entry_type() == EntryType::Link {
            let link = entry
                .link_name()
                .map_err(|e| corrupt(archive_path, e))?
                .and_then(|target| strip_first_component(&target));

            if let Some(target) = link {
                filesystem::remove_file(&dest_path)?;
                fs::hard_link(dest.join(target), &dest_path)
                    .map_err(|e| corrupt(archive_path, e))?;
            }
            continue;
        }

        entry
            .unpack(&dest_path)
            .map_err(|e| corrupt(archive_path, e))?;
    }

    Ok(())
}

/// Extract a zip archive into `dest`, stripping one leading component
pub fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path).map_err(|e| corrupt(archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(archive_path, e))?;

    filesystem::create_dir_all(dest)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| corrupt(archive_path, e))?;

        let Some(path) = entry.enclosed_name() else {
            return Err(ExtractError::UnsafeEntry {
                archive: archive_path.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };

        let Some(stripped) = strip_first_component(&path) else {
            continue;
        };
        let dest_path = dest.join(&stripped);

        if entry.is_dir() {
            filesystem::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            filesystem::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&dest_path).map_err(|e| corrupt(archive_path, e))?;
        std::io::copy(&mut entry, &mut outfile).map_err(|e| corrupt(archive_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))
                    .map_err(|e| corrupt(archive_path, e))?;
            }
        }
    }

    Ok(())
}
