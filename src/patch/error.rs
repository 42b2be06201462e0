//! Error taxonomy for the patch pipeline
//!
//! Every stage reports one of these kinds. The reporter decides from
//! [`PatchError::severity`] whether the run stops or carries on with a warning.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Whether a failure ends the run or is only surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the run with a non-zero exit status
    Fatal,
    /// Log, tell the user, and keep going
    Warn,
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("could not find a Hearthstone installation containing {marker}")]
    NotFound { marker: String },

    #[error("network error while downloading {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("download of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not write the downloaded patch to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("patch archive {} is unusable: {reason}", path.display())]
    Archive { path: PathBuf, reason: String },

    #[error("patch contents are missing at {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("permission denied for {}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not remember the installation folder under {key}: {reason}")]
    Persistence { key: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation cancelled by user")]
    Cancelled,
}

impl PatchError {
    /// Classify an I/O failure at `path` into the filesystem kinds.
    ///
    /// `NotFound` becomes [`PatchError::MissingSource`] and
    /// `PermissionDenied` keeps its own variant; anything else is generic.
    pub fn from_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => PatchError::MissingSource { path },
            io::ErrorKind::PermissionDenied => PatchError::PermissionDenied { path, source },
            _ => PatchError::Filesystem { path, source },
        }
    }

    pub fn transport(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        PatchError::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn archive(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        PatchError::Archive {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Failures that only cost convenience or leave temporary files behind are
    /// warnings; everything that prevents the patch from being applied is fatal.
    pub fn severity(&self) -> Severity {
        match self {
            PatchError::Persistence { .. } => Severity::Warn,
            _ => Severity::Fatal,
        }
    }

    /// Short guidance shown under the error message
    pub fn hint(&self) -> &'static str {
        match self {
            PatchError::NotFound { .. } => {
                "Pass the game folder with --dir, or run the patcher interactively to choose it."
            }
            PatchError::Transport { .. } => {
                "Check your internet connection and firewall, then run the patcher again."
            }
            PatchError::Status { .. } => {
                "The patch server did not provide the file. Try again later or pick another channel."
            }
            PatchError::Write { .. } | PatchError::PermissionDenied { .. } => {
                "Check the folder permissions, or try running the patcher as administrator."
            }
            PatchError::Archive { .. } => {
                "The download looks damaged. Run the patcher again to fetch a fresh copy."
            }
            PatchError::MissingSource { .. } | PatchError::Filesystem { .. } => {
                "Close Hearthstone and the Battle.net launcher, then run the patcher again."
            }
            PatchError::Persistence { .. } => {
                "The patcher will ask for the game folder again next time."
            }
            PatchError::Config(_) => "Fix or delete the configuration file and run the patcher again.",
            PatchError::Cancelled => "Work already done was kept. Run the patcher again to finish an interrupted patch.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified_by_kind() {
        let missing = PatchError::from_io("a", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(missing, PatchError::MissingSource { .. }));

        let denied = PatchError::from_io("a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(denied, PatchError::PermissionDenied { .. }));

        let other = PatchError::from_io("a", io::Error::other("disk on fire"));
        assert!(matches!(other, PatchError::Filesystem { .. }));
    }

    #[test]
    fn only_persistence_is_a_warning() {
        let persist = PatchError::Persistence {
            key: "HEARTHSTONE_HOME".into(),
            reason: "registry unavailable".into(),
        };
        assert_eq!(persist.severity(), Severity::Warn);
        assert_eq!(
            PatchError::Status { url: "u".into(), status: 404 }.severity(),
            Severity::Fatal
        );
        assert_eq!(PatchError::archive("p.zip", "bad").severity(), Severity::Fatal);
    }
}
