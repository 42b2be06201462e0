//! Installation folder resolution
//!
//! First match wins:
//! 1. the stock install location,
//! 2. the remembered folder from an earlier run,
//! 3. asking the user until they name a folder containing the marker, which is
//!    then remembered for next time.
//!
//! Failing to read or write the remembered value never aborts resolution; it
//! is handed back as a warning.

mod prompt;
mod store;

pub use prompt::{NoPrompt, PathPrompt, TerminalPrompt};
pub use store::{FileStore, SettingStore, platform_store};

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::error::PatchError;

/// Where the resolved folder came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Default,
    Remembered,
    Prompted,
    /// Given on the command line
    Explicit,
}

/// Outcome of a successful resolution
#[derive(Debug)]
pub struct Resolution {
    pub dir: PathBuf,
    pub origin: Origin,
    /// Non-fatal problems with the remembered value
    pub warnings: Vec<PatchError>,
}

/// `true` when `dir` contains the marker executable
pub fn is_installation_dir(dir: &Path, marker: &str) -> bool {
    !dir.as_os_str().is_empty() && dir.join(marker).is_file()
}

pub struct DirectoryResolver<S, P> {
    default_dir: PathBuf,
    marker: String,
    key: String,
    store: S,
    prompt: P,
}

impl<S: SettingStore, P: PathPrompt> DirectoryResolver<S, P> {
    pub fn new(
        default_dir: impl Into<PathBuf>,
        marker: impl Into<String>,
        key: impl Into<String>,
        store: S,
        prompt: P,
    ) -> Self {
        Self {
            default_dir: default_dir.into(),
            marker: marker.into(),
            key: key.into(),
            store,
            prompt,
        }
    }

    pub fn resolve(&mut self) -> Result<Resolution, PatchError> {
        let mut warnings = Vec::new();

        if is_installation_dir(&self.default_dir, &self.marker) {
            info!("Found installation at default location {}", self.default_dir.display());
            return Ok(Resolution {
                dir: self.default_dir.clone(),
                origin: Origin::Default,
                warnings,
            });
        }
        debug!("No {} under {}", self.marker, self.default_dir.display());

        match self.store.get(&self.key) {
            Ok(Some(value)) if !value.trim().is_empty() => {
                let remembered = PathBuf::from(value.trim());
                if is_installation_dir(&remembered, &self.marker) {
                    info!("Using remembered installation {}", remembered.display());
                    return Ok(Resolution {
                        dir: remembered,
                        origin: Origin::Remembered,
                        warnings,
                    });
                }
                warn!(
                    "Remembered folder {} no longer contains {}",
                    remembered.display(),
                    self.marker
                );
            }
            Ok(_) => debug!("{} is not set", self.key),
            Err(e) => {
                warn!("Could not read {}: {e}", self.key);
                warnings.push(e);
            }
        }

        let dir = self.prompt_until_valid()?;

        match self.store.set(&self.key, &dir.to_string_lossy()) {
            Ok(()) => info!("Remembered {} as {}", dir.display(), self.key),
            Err(e) => {
                warn!("Could not remember {}: {e}", dir.display());
                warnings.push(e);
            }
        }

        Ok(Resolution {
            dir,
            origin: Origin::Prompted,
            warnings,
        })
    }

    /// Blocks on the prompt until a valid folder is given
    fn prompt_until_valid(&mut self) -> Result<PathBuf, PatchError> {
        let mut attempt = 1;
        loop {
            let candidate = self.prompt.ask(attempt)?;
            if is_installation_dir(&candidate, &self.marker) {
                return Ok(candidate);
            }
            debug!("Rejected {}: no {}", candidate.display(), self.marker);
            attempt += 1;
        }
    }
}

/// Validate a folder given on the command line
pub fn resolve_explicit(dir: &Path, marker: &str) -> Result<Resolution, PatchError> {
    if is_installation_dir(dir, marker) {
        Ok(Resolution {
            dir: dir.to_path_buf(),
            origin: Origin::Explicit,
            warnings: Vec::new(),
        })
    } else {
        Err(PatchError::NotFound {
            marker: format!("{} (in {})", marker, dir.display()),
        })
    }
}
