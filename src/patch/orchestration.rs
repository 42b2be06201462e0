//! The patch pipeline
//!
//! Locate → download → unpack → merge → readme → cleanup, strictly one after
//! the other. Each step reports through the [`Reporter`], which decides
//! whether a failure stops the run. Ctrl-C stops the step in progress and
//! leaves whatever it already wrote on disk.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use termcolor::WriteColor;
use tokio::signal;
use tokio::sync::mpsc;

use super::PatchLayout;
use super::cleanup::cleanup;
use super::download::{ArtifactFetcher, Channel, extract_staging};
use super::error::PatchError;
use super::merge::merge_tree;
use super::progress::{PatchProgress, Step};
use super::readme::place_readme;
use super::report::{Failure, Reporter, RunSummary};
use super::resolve::{DirectoryResolver, PathPrompt, Resolution, SettingStore};
use crate::config::PatcherConfig;

/// One patch run against an already located game folder
pub struct PatchJob<'a> {
    pub config: &'a PatcherConfig,
    pub channel: &'a Channel,
    pub install_dir: PathBuf,
    /// Draw a progress bar for the download
    pub show_progress: bool,
}

/// Run the resolver and report where the game was found.
///
/// Problems with the remembered value are reported as warnings.
pub fn locate_game<W, S, P>(
    reporter: &mut Reporter<W>,
    mut resolver: DirectoryResolver<S, P>,
) -> Result<PathBuf, Failure>
where
    W: WriteColor,
    S: SettingStore,
    P: PathPrompt,
{
    reporter.begin(Step::Resolve);
    let resolution = reporter.require(Step::Resolve, resolver.resolve())?;
    Ok(accept_resolution(reporter, resolution))
}

pub(crate) fn accept_resolution<W: WriteColor>(
    reporter: &mut Reporter<W>,
    resolution: Resolution,
) -> PathBuf {
    for warning in resolution.warnings {
        reporter.warn(Step::Remember, warning);
    }
    reporter.success(&format!("Found Hearthstone in {}", resolution.dir.display()));
    resolution.dir
}

/// Download, unpack and merge the patch, then tidy up.
///
/// `readme_target` is asked once the game is patched and the patch shipped
/// notes: `Some(dir)` moves them there, `None` deletes them with the other
/// temporary files.
pub async fn apply_patch<W, F>(
    job: PatchJob<'_>,
    reporter: &mut Reporter<W>,
    readme_target: F,
) -> Result<RunSummary, Failure>
where
    W: WriteColor,
    F: FnOnce() -> Result<Option<PathBuf>, PatchError>,
{
    let layout = PatchLayout::new(&job.install_dir, job.config);
    info!("Patching {} from channel {}", layout.install_dir.display(), job.channel.name);

    // Download
    reporter.begin(Step::Download);
    let downloaded_bytes = reporter.require(
        Step::Download,
        download(&job, &layout.archive).await,
    )?;
    reporter.success(&format!("Downloaded {}", human_bytes(downloaded_bytes)));

    // Extract
    reporter.begin(Step::Extract);
    let extracted = {
        let archive = layout.archive.clone();
        let install_dir = layout.install_dir.clone();
        let staging_name = job.config.staging_dir.clone();
        blocking(&layout.staging, move |cancel| {
            extract_staging(&archive, &install_dir, &staging_name, cancel)
        })
        .await
    };
    let extracted = reporter.require(Step::Extract, extracted)?;
    reporter.success(&format!("Unpacked {} files", extracted.files));

    // Merge
    reporter.begin(Step::Merge);
    let merged = {
        let staging = layout.staging.clone();
        let install_dir = layout.install_dir.clone();
        blocking(&layout.staging, move |cancel| merge_tree(&staging, &install_dir, cancel)).await
    };
    let merge = reporter.require(Step::Merge, merged)?;
    reporter.success(&format!(
        "Patched {} files ({} new, {} replaced)",
        merge.files_added + merge.files_replaced,
        merge.files_added,
        merge.files_replaced
    ));

    // Readme
    let mut readme = None;
    if layout.readme.is_file() {
        reporter.begin(Step::Readme);
        let placed = readme_target().and_then(|target| match target {
            Some(dir) => place_readme(&layout.readme, &dir).map(Some),
            None => {
                debug!("Readme will be discarded");
                Ok(None)
            }
        });
        if let Some(Some(path)) = reporter.check(Step::Readme, placed)? {
            reporter.success(&format!("Readme placed at {}", path.display()));
            readme = Some(path);
        }
    } else {
        debug!("Patch did not include {}", layout.readme.display());
    }

    // Cleanup
    reporter.begin(Step::Cleanup);
    let cleaned = cleanup(&layout, readme.is_some());
    if cleaned.failures.is_empty() {
        reporter.success("Temporary files removed");
    }
    for failure in cleaned.failures {
        reporter.warn(Step::Cleanup, failure);
    }

    Ok(RunSummary {
        install_dir: layout.install_dir,
        channel: job.channel.name.clone(),
        downloaded_bytes,
        merge,
        readme,
    })
}

async fn download(job: &PatchJob<'_>, archive: &Path) -> Result<u64, PatchError> {
    let (tx, mut rx) = mpsc::channel::<PatchProgress>(100);
    let fetcher = ArtifactFetcher::new(job.config.connect_timeout(), job.config.inactivity_timeout())?
        .with_progress(tx);

    let bar = if job.show_progress {
        download_bar()
    } else {
        ProgressBar::hidden()
    };

    // Spawn progress consumer before the download starts
    let bar_clone = bar.clone();
    let progress_task = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            match progress {
                PatchProgress::Downloaded { bytes, total } => {
                    if let Some(total) = total {
                        bar_clone.set_length(total);
                    }
                    bar_clone.set_position(bytes);
                }
                PatchProgress::DownloadFinished { bytes } => {
                    bar_clone.set_position(bytes);
                }
            }
        }
    });

    let result = cancellable(fetcher.fetch(&job.channel.source, archive)).await;

    // Dropping the fetcher closes the channel so the consumer can finish
    drop(fetcher);
    progress_task.await.ok();
    bar.finish_and_clear();

    result
}

fn download_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    match ProgressStyle::default_bar().template("[{bar:50.cyan/blue}] {percent:>3}%  {bytes}/{total_bytes}") {
        Ok(style) => bar.set_style(style.progress_chars("█▓░")),
        Err(e) => warn!("Invalid progress bar template: {e}"),
    }
    bar
}

/// Run blocking filesystem work off the async runtime.
///
/// Ctrl-C raises the flag handed to `work`, then waits for it to stop so
/// nothing is still moving files once the step has returned.
async fn blocking<T, F>(path: &Path, work: F) -> Result<T, PatchError>
where
    T: Send + 'static,
    F: FnOnce(&AtomicBool) -> Result<T, PatchError> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let mut task = tokio::task::spawn_blocking(move || work(&flag));

    let joined = tokio::select! {
        joined = &mut task => joined,
        Ok(()) = signal::ctrl_c() => {
            warn!("Interrupted by user, stopping after the current file");
            cancel.store(true, Ordering::Relaxed);
            if let Ok(Err(e)) = task.await
                && !matches!(e, PatchError::Cancelled)
            {
                warn!("Interrupted step also failed: {e}");
            }
            return Err(PatchError::Cancelled);
        }
    };

    joined.map_err(|e| PatchError::Filesystem {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?
}

/// Abort `stage` when the user presses Ctrl-C
async fn cancellable<T>(stage: impl Future<Output = Result<T, PatchError>>) -> Result<T, PatchError> {
    tokio::select! {
        result = stage => result,
        Ok(()) = signal::ctrl_c() => {
            warn!("Interrupted by user, leaving files as they are");
            Err(PatchError::Cancelled)
        }
    }
}

fn human_bytes(bytes: u64) -> String {
    const MIB: f64 = 1_048_576.0;
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
