//! Applying the accessibility patch to a Hearthstone installation
//!
//! ## Module Organization
//!
//! - `resolve` - Finding (and remembering) the game folder
//! - `download` - Fetching the patch archive and unpacking it
//! - `merge` - Overlaying the unpacked tree onto the game folder
//! - `readme` - Moving the patch notes somewhere the user will see them
//! - `cleanup` - Removing the archive and staging folder
//! - `report` - Status output and the fatal/warning decision
//! - `orchestration` - The step-by-step pipeline
//! - `wizard` - Interactive prompts
//! - `runners` - Entry points for each command

pub mod cleanup;
pub mod download;
pub mod error;
pub mod merge;
pub mod orchestration;
pub mod progress;
pub mod readme;
pub mod report;
pub mod resolve;
pub mod runners;
pub mod wizard;

use std::path::{Path, PathBuf};

use crate::config::PatcherConfig;

pub use error::{PatchError, Severity};

/// Fixed paths inside the game folder used during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchLayout {
    pub install_dir: PathBuf,
    /// Downloaded archive
    pub archive: PathBuf,
    /// Unpacked patch contents
    pub staging: PathBuf,
    /// Patch notes, present after the merge
    pub readme: PathBuf,
}

impl PatchLayout {
    pub fn new(install_dir: &Path, config: &PatcherConfig) -> Self {
        Self {
            install_dir: install_dir.to_path_buf(),
            archive: install_dir.join(&config.archive_name),
            staging: install_dir.join(&config.staging_dir),
            readme: install_dir.join(&config.readme_name),
        }
    }
}
