//! Patch download and archive extraction
//!
//! ## Module Organization
//!
//! - `source` - Release channels and how each kind of source is opened
//! - `drive` - Confirmation handshake for the document-sharing provider
//! - `core` - Streaming the response body to disk with progress tracking
//! - `extract` - Unpacking the archive into the staging folder

mod core;
mod drive;
mod extract;
mod source;

// Re-export public API
pub use core::ArtifactFetcher;
pub use extract::{ExtractReport, extract_staging};
pub use source::{Channel, DRIVE_ENDPOINT, Source};

