//! Patch notes placement

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::info;

use super::error::PatchError;
use super::merge::move_file;

/// What to do with the patch notes once the game is patched
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReadmeChoice {
    /// Move the readme to the user's desktop
    Desktop,
    /// Delete it along with the other temporary files
    Discard,
}

/// The user's desktop, when the platform has one
pub fn desktop_dir() -> Result<PathBuf, PatchError> {
    dirs::desktop_dir().ok_or_else(|| PatchError::MissingSource {
        path: PathBuf::from("Desktop"),
    })
}

/// Move `readme` into `target_dir`, replacing a file of the same name there.
///
/// Returns the new location.
pub fn place_readme(readme: &Path, target_dir: &Path) -> Result<PathBuf, PatchError> {
    let name = readme.file_name().ok_or_else(|| PatchError::MissingSource {
        path: readme.to_path_buf(),
    })?;
    if !readme.is_file() {
        return Err(PatchError::MissingSource {
            path: readme.to_path_buf(),
        });
    }

    fs::create_dir_all(target_dir).map_err(|e| PatchError::from_io(target_dir, e))?;
    let target = target_dir.join(name);

    match fs::remove_file(&target) {
        Ok(()) => info!("Replacing existing {}", target.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(PatchError::from_io(&target, e)),
    }

    move_file(readme, &target)?;
    info!("Readme placed at {}", target.display());
    Ok(target)
}
