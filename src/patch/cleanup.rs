//! Removing the downloaded archive, the staging folder and the readme
//!
//! Each removal is attempted on its own; a failure is recorded and the next
//! one still runs. Nothing here can fail the run.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info, warn};

use super::PatchLayout;
use super::error::PatchError;

#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Paths that were deleted
    pub removed: usize,
    pub failures: Vec<PatchError>,
}

/// Delete the staging tree, then the archive, then the readme unless it was
/// already moved elsewhere.
pub fn cleanup(layout: &PatchLayout, readme_relocated: bool) -> CleanupReport {
    let mut report = CleanupReport::default();

    record(&mut report, &layout.staging, fs::remove_dir_all(&layout.staging), true);
    record(&mut report, &layout.archive, fs::remove_file(&layout.archive), true);
    if !readme_relocated {
        // the readme only exists when the patch shipped one
        record(&mut report, &layout.readme, fs::remove_file(&layout.readme), false);
    }

    info!(
        "Cleanup removed {} item(s), {} failure(s)",
        report.removed,
        report.failures.len()
    );
    report
}

fn record(report: &mut CleanupReport, path: &Path, result: io::Result<()>, expected: bool) {
    match result {
        Ok(()) => {
            debug!("Removed {}", path.display());
            report.removed += 1;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound && !expected => {
            debug!("{} was not there, nothing to remove", path.display());
        }
        Err(e) => {
            warn!("Could not remove {}: {e}", path.display());
            report.failures.push(PatchError::from_io(path, e));
        }
    }
}
