//! Interactive source of candidate installation folders

use std::path::PathBuf;

use inquire::{InquireError, Text};

use crate::patch::error::PatchError;

/// Asks the user where the game is installed
pub trait PathPrompt {
    /// Return the next candidate folder. `attempt` starts at 1.
    fn ask(&mut self, attempt: u32) -> Result<PathBuf, PatchError>;
}

impl<T: PathPrompt + ?Sized> PathPrompt for &mut T {
    fn ask(&mut self, attempt: u32) -> Result<PathBuf, PatchError> {
        (**self).ask(attempt)
    }
}

impl<T: PathPrompt + ?Sized> PathPrompt for Box<T> {
    fn ask(&mut self, attempt: u32) -> Result<PathBuf, PatchError> {
        (**self).ask(attempt)
    }
}

/// Terminal prompt backed by `inquire`
pub struct TerminalPrompt {
    marker: String,
}

impl TerminalPrompt {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl PathPrompt for TerminalPrompt {
    fn ask(&mut self, attempt: u32) -> Result<PathBuf, PatchError> {
        if attempt == 1 {
            println!("The patcher couldn't find your Hearthstone installation folder.");
        } else {
            println!("That folder does not contain {}. Please try again.", self.marker);
        }

        let help = format!("The folder that contains {}", self.marker);
        let answer = Text::new("Please enter the path where you have the game installed:")
            .with_help_message(&help)
            .prompt()
            .map_err(|e| match e {
                InquireError::OperationCanceled | InquireError::OperationInterrupted => {
                    PatchError::Cancelled
                }
                _ => PatchError::NotFound {
                    marker: self.marker.clone(),
                },
            })?;

        Ok(clean_path_input(&answer))
    }
}

/// Prompt used with `--no-interaction`: gives up immediately
pub struct NoPrompt {
    marker: String,
}

impl NoPrompt {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl PathPrompt for NoPrompt {
    fn ask(&mut self, _attempt: u32) -> Result<PathBuf, PatchError> {
        Err(PatchError::NotFound {
            marker: self.marker.clone(),
        })
    }
}

/// Strip whitespace and the quotes Explorer adds on "Copy as path"
pub(crate) fn clean_path_input(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(unquoted.trim())
}
