//! Pipeline steps and download progress events

use std::fmt;

/// Pipeline step, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Configure,
    Channel,
    Resolve,
    Remember,
    Download,
    Extract,
    Merge,
    Readme,
    Cleanup,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Configure => "reading the configuration",
            Step::Channel => "choosing a patch channel",
            Step::Resolve => "locating the game",
            Step::Remember => "remembering the game folder",
            Step::Download => "downloading the patch",
            Step::Extract => "unpacking the patch",
            Step::Merge => "patching the game",
            Step::Readme => "placing the readme",
            Step::Cleanup => "removing temporary files",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchProgress {
    /// Bytes written so far; `total` comes from Content-Length when present
    Downloaded { bytes: u64, total: Option<u64> },
    /// Download body fully written
    DownloadFinished { bytes: u64 },
}

const UNKNOWN_LENGTH_STRIDE: u64 = 64 * 1024;

/// Throttles download events: one per whole percent when the length is
/// known, one per 64 KiB otherwise.
#[derive(Debug)]
pub struct DownloadMeter {
    total: Option<u64>,
    bytes: u64,
    last_percent: Option<u64>,
    last_reported: u64,
}

impl DownloadMeter {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            bytes: 0,
            last_percent: None,
            last_reported: 0,
        }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Record `n` more bytes; returns an event when one is due
    pub fn advance(&mut self, n: u64) -> Option<PatchProgress> {
        self.bytes += n;

        let due = match self.total {
            Some(total) => {
                let percent = (self.bytes.min(total) * 100) / total;
                if self.last_percent == Some(percent) {
                    false
                } else {
                    self.last_percent = Some(percent);
                    true
                }
            }
            None => {
                if self.bytes - self.last_reported > UNKNOWN_LENGTH_STRIDE {
                    self.last_reported = self.bytes;
                    true
                } else {
                    false
                }
            }
        };

        due.then_some(PatchProgress::Downloaded {
            bytes: self.bytes,
            total: self.total,
        })
    }
}
