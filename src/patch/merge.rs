//! Overlaying the staging tree onto the installation
//!
//! Every file in the staging tree ends up at the same relative path under the
//! destination, replacing whatever was there. Destination files the patch
//! does not mention are left alone. Files are moved, so the staging tree is
//! consumed; the cleaner removes the empty folders afterwards.
//!
//! There is no rollback: the first filesystem error aborts the merge and
//! leaves the destination partially patched. Running the patcher again
//! finishes the job.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use walkdir::WalkDir;

use super::error::PatchError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub dirs_created: usize,
    pub files_added: usize,
    pub files_replaced: usize,
    /// Source and destination were the same file on disk
    pub files_skipped: usize,
}

/// Move every file below `staging` to the mirrored path below `destination`.
///
/// `cancel` is checked before each entry; once set, the merge stops with
/// [`PatchError::Cancelled`] and files already moved stay in place.
/// Blocking; call from `spawn_blocking` in async code.
pub fn merge_tree(
    staging: &Path,
    destination: &Path,
    cancel: &AtomicBool,
) -> Result<MergeReport, PatchError> {
    if !staging.is_dir() {
        return Err(PatchError::MissingSource {
            path: staging.to_path_buf(),
        });
    }

    // Walk the whole tree before touching it so moving files out does not
    // disturb directory iteration.
    let entries = WalkDir::new(staging)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| staging.to_path_buf());
            PatchError::from_io(path, io::Error::from(e))
        })?;

    let mut report = MergeReport::default();

    for entry in entries {
        if cancel.load(Ordering::Relaxed) {
            info!(
                "Merge stopped after {} added, {} replaced",
                report.files_added, report.files_replaced
            );
            return Err(PatchError::Cancelled);
        }

        let source = entry.path();
        let target = mirrored_path(staging, source, destination)?;

        if entry.file_type().is_dir() {
            if !target.is_dir() {
                fs::create_dir_all(&target).map_err(|e| PatchError::from_io(&target, e))?;
                debug!("Created {}", target.display());
                report.dirs_created += 1;
            }
            continue;
        }

        match fs::symlink_metadata(&target) {
            Ok(_) => {
                match same_file::is_same_file(source, &target) {
                    Ok(true) => {
                        debug!("Skipping {}: already the installed file", target.display());
                        report.files_skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    // dangling link: nothing to compare, replace it
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(PatchError::from_io(&target, e)),
                }
                fs::remove_file(&target).map_err(|e| PatchError::from_io(&target, e))?;
                move_file(source, &target)?;
                debug!("Replaced {}", target.display());
                report.files_replaced += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| PatchError::from_io(parent, e))?;
                }
                move_file(source, &target)?;
                debug!("Added {}", target.display());
                report.files_added += 1;
            }
            Err(e) => return Err(PatchError::from_io(&target, e)),
        }
    }

    info!(
        "Merged {} into {}: {} added, {} replaced, {} unchanged",
        staging.display(),
        destination.display(),
        report.files_added,
        report.files_replaced,
        report.files_skipped
    );
    Ok(report)
}

fn mirrored_path(staging: &Path, source: &Path, destination: &Path) -> Result<PathBuf, PatchError> {
    let relative = source.strip_prefix(staging).map_err(|_| PatchError::Filesystem {
        path: source.to_path_buf(),
        source: io::Error::other("path escaped the staging folder"),
    })?;
    Ok(destination.join(relative))
}

/// Rename, falling back to copy + delete when the rename is refused
/// (e.g. across volumes).
pub(crate) fn move_file(source: &Path, target: &Path) -> Result<(), PatchError> {
    if let Err(e) = fs::rename(source, target) {
        debug!(
            "Rename {} -> {} failed ({e}), copying instead",
            source.display(),
            target.display()
        );
        fs::copy(source, target).map_err(|e| PatchError::from_io(target, e))?;
        fs::remove_file(source).map_err(|e| PatchError::from_io(source, e))?;
    }
    Ok(())
}
