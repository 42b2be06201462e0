//! Hearthstone Access patcher
//!
//! Finds the Hearthstone installation, downloads the accessibility patch,
//! overlays it onto the game folder and removes the temporary files.
//!
//! ## Module Organization
//!
//! - `cli` - Command-line arguments
//! - `config` - On-disk configuration with built-in defaults
//! - `logging` - Timestamped diagnostic log
//! - `patch` - Everything involved in applying the patch

pub mod cli;
pub mod config;
pub mod logging;
pub mod patch;
