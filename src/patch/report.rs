//! User-facing status lines and the fatal/warning decision
//!
//! Every pipeline step runs through the [`Reporter`]. A failure in a step
//! that the patch depends on (locating the game, downloading, unpacking,
//! merging) ends the run. A failure in a step that only costs convenience
//! (remembering the folder, placing the readme, deleting temporary files)
//! becomes a warning and the run carries on.

use std::path::PathBuf;

use log::{error, info, warn};
use termcolor::{Color, ColorSpec, WriteColor};
use thiserror::Error;

use super::error::{PatchError, Severity};
use super::merge::MergeReport;
use super::progress::Step;

impl Step {
    pub fn severity(self) -> Severity {
        match self {
            Step::Remember | Step::Readme | Step::Cleanup => Severity::Warn,
            Step::Configure
            | Step::Channel
            | Step::Resolve
            | Step::Download
            | Step::Extract
            | Step::Merge => Severity::Fatal,
        }
    }
}

/// Severity of `error` raised while running `step`.
///
/// The run only stops when both the step and the error kind say so.
/// Cancelling a step that only costs convenience is a warning like any
/// other failure there.
pub fn classify(step: Step, error: &PatchError) -> Severity {
    match (step.severity(), error.severity()) {
        (Severity::Fatal, Severity::Fatal) => Severity::Fatal,
        _ => Severity::Warn,
    }
}

/// A failure that ended the run
#[derive(Debug, Error)]
#[error("{step} failed: {error}")]
pub struct Failure {
    pub step: Step,
    #[source]
    pub error: PatchError,
}

/// A recovered failure
#[derive(Debug)]
pub struct Warning {
    pub step: Step,
    pub error: PatchError,
}

/// What a successful run did
#[derive(Debug)]
pub struct RunSummary {
    pub install_dir: PathBuf,
    pub channel: String,
    pub downloaded_bytes: u64,
    pub merge: MergeReport,
    /// Where the readme ended up, if it was kept
    pub readme: Option<PathBuf>,
}

pub struct Reporter<W> {
    out: W,
    warnings: Vec<Warning>,
    log_path: Option<PathBuf>,
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            warnings: Vec::new(),
            log_path: None,
        }
    }

    /// Point the user at this file when something goes wrong
    pub fn with_log_path(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn begin(&mut self, step: Step) {
        info!("Step: {step}");
        let _ = self.out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = writeln!(self.out, "→ {}...", capitalize(&step.to_string()));
        let _ = self.out.reset();
    }

    pub fn success(&mut self, message: &str) {
        info!("{message}");
        let _ = self.out.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = writeln!(self.out, "✓ {message}");
        let _ = self.out.reset();
    }

    /// Any error from `step` ends the run
    pub fn require<T>(&mut self, step: Step, result: Result<T, PatchError>) -> Result<T, Failure> {
        result.map_err(|error| Failure { step, error })
    }

    /// Pass a step's result through: successes come back as `Some`,
    /// recoverable failures are reported and come back as `None`, and
    /// fatal ones become the [`Failure`] that ends the run.
    pub fn check<T>(&mut self, step: Step, result: Result<T, PatchError>) -> Result<Option<T>, Failure> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(error) => match classify(step, &error) {
                Severity::Warn => {
                    self.warn(step, error);
                    Ok(None)
                }
                Severity::Fatal => Err(Failure { step, error }),
            },
        }
    }

    /// Record a recovered failure and tell the user about it
    pub fn warn(&mut self, step: Step, error: PatchError) {
        warn!("{step}: {error}");
        let _ = self.out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(self.out, "⚠ Problem while {step}: {error}");
        let _ = self.out.reset();
        let _ = writeln!(self.out, "  {}", error.hint());
        self.warnings.push(Warning { step, error });
    }

    /// Print the closing message and return the process exit status.
    pub fn finish(&mut self, outcome: &Result<RunSummary, Failure>) -> i32 {
        match outcome {
            Ok(summary) => {
                info!(
                    "Patched {} from channel {} ({} bytes, {} files added, {} replaced, {} warnings)",
                    summary.install_dir.display(),
                    summary.channel,
                    summary.downloaded_bytes,
                    summary.merge.files_added,
                    summary.merge.files_replaced,
                    self.warnings.len()
                );
                let _ = self
                    .out
                    .set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
                let _ = writeln!(self.out, "\n✅ Hearthstone has been patched successfully!");
                let _ = self.out.reset();
                let _ = writeln!(self.out, "   Game folder: {}", summary.install_dir.display());
                if let Some(readme) = &summary.readme {
                    let _ = writeln!(self.out, "   Patch notes: {}", readme.display());
                }
                if !self.warnings.is_empty() {
                    let _ = self.out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
                    let _ = writeln!(
                        self.out,
                        "   {} minor problem(s) occurred, see above.",
                        self.warnings.len()
                    );
                    let _ = self.out.reset();
                }
                0
            }
            Err(failure) => self.fail(failure),
        }
    }

    /// Explain a fatal failure; returns the exit status
    pub fn fail(&mut self, failure: &Failure) -> i32 {
        error!("{failure}");
        let _ = self
            .out
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
        let _ = writeln!(self.out, "\n❌ Patching failed while {}", failure.step);
        let _ = self.out.reset();
        let _ = self.out.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
        let _ = writeln!(self.out, "   Error: {}", failure.error);
        let _ = self.out.reset();
        let _ = writeln!(self.out, "   {}", failure.error.hint());
        self.log_pointer();
        1
    }

    fn log_pointer(&mut self) {
        if let Some(path) = &self.log_path {
            let _ = writeln!(self.out, "   Details were written to {}", path.display());
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
