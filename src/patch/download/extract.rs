//! Unpacking the patch archive into the staging folder
//!
//! Only entries below the archive's top-level staging folder (`patch/` by
//! default) are part of the overlay; anything else in the archive is skipped.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use zip::ZipArchive;

use crate::patch::error::PatchError;

/// What ended up in the staging folder
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub files: usize,
    pub skipped: usize,
}

/// Extract `archive` into `<install_dir>/<staging_name>`.
///
/// A staging folder left over from an interrupted run is removed first.
/// `cancel` is checked before each entry; once set, extraction stops with
/// [`PatchError::Cancelled`] and keeps what was already written.
/// Blocking; call from `spawn_blocking` in async code.
pub fn extract_staging(
    archive: &Path,
    install_dir: &Path,
    staging_name: &str,
    cancel: &AtomicBool,
) -> Result<ExtractReport, PatchError> {
    let zip_file = fs::File::open(archive).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PatchError::archive(archive, "archive file is missing"),
        _ => PatchError::from_io(archive, e),
    })?;
    let mut zip = ZipArchive::new(zip_file)
        .map_err(|e| PatchError::archive(archive, format!("failed to read ZIP archive: {e}")))?;

    let staging = install_dir.join(staging_name);
    if staging.exists() {
        info!("Removing stale staging folder {}", staging.display());
        fs::remove_dir_all(&staging).map_err(|e| PatchError::from_io(&staging, e))?;
    }

    let mut report = ExtractReport::default();

    for i in 0..zip.len() {
        if cancel.load(Ordering::Relaxed) {
            info!("Extraction stopped after {} files", report.files);
            return Err(PatchError::Cancelled);
        }

        let mut entry = zip.by_index(i).map_err(|e| {
            PatchError::archive(archive, format!("failed to read ZIP entry at index {i}: {e}"))
        })?;

        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry {}", entry.name());
            report.skipped += 1;
            continue;
        };
        let Some(relative) = strip_staging_prefix(&name, staging_name) else {
            debug!("Skipping {} (outside {staging_name}/)", name.display());
            report.skipped += 1;
            continue;
        };

        let target = staging.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| PatchError::from_io(&target, e))?;
            continue;
        }
        if relative.as_os_str().is_empty() {
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| PatchError::from_io(parent, e))?;
        }
        let mut out = fs::File::create(&target).map_err(|e| PatchError::from_io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| match e.kind() {
            // decompression and CRC failures surface as InvalidData
            io::ErrorKind::InvalidData => {
                PatchError::archive(archive, format!("corrupt entry {}: {e}", name.display()))
            }
            _ => PatchError::from_io(&target, e),
        })?;
        report.files += 1;
    }

    if report.files == 0 {
        return Err(PatchError::archive(
            archive,
            format!("no files below {staging_name}/ in the archive"),
        ));
    }

    info!(
        "Extracted {} files to {} ({} entries skipped)",
        report.files,
        staging.display(),
        report.skipped
    );
    Ok(report)
}

/// `patch/Data/x.bin` → `Data/x.bin`; `None` for entries outside `patch/`.
/// The folder name is matched case-insensitively.
fn strip_staging_prefix(name: &Path, staging_name: &str) -> Option<PathBuf> {
    let mut components = name.components();
    match components.next() {
        Some(Component::Normal(first))
            if first.to_string_lossy().eq_ignore_ascii_case(staging_name) =>
        {
            Some(components.as_path().to_path_buf())
        }
        _ => None,
    }
}
