//! Streaming the patch archive to disk

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::source::Source;
use crate::patch::error::PatchError;
use crate::patch::progress::{DownloadMeter, PatchProgress};

const USER_AGENT: &str = concat!("hsa-patcher/", env!("CARGO_PKG_VERSION"));

pub struct ArtifactFetcher {
    client: reqwest::Client,
    inactivity_timeout: Duration,
    progress_tx: Option<mpsc::Sender<PatchProgress>>,
    /// Set once the receiver is gone
    progress_disabled: AtomicBool,
}

impl ArtifactFetcher {
    pub fn new(connect_timeout: Duration, inactivity_timeout: Duration) -> Result<Self, PatchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| PatchError::transport("", e))?;

        Ok(Self {
            client,
            inactivity_timeout,
            progress_tx: None,
            progress_disabled: AtomicBool::new(false),
        })
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<PatchProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Download `source` to `destination`, returning the number of bytes written.
    ///
    /// The body is streamed into a temporary file in the destination folder
    /// and renamed into place once complete, so `destination` only ever holds
    /// a whole archive. On failure nothing is left behind.
    pub async fn fetch(&self, source: &Source, destination: &Path) -> Result<u64, PatchError> {
        info!("Downloading {source} to {}", destination.display());

        let response = source.open(&self.client).await?;
        let url = response.url().to_string();
        let mut meter = DownloadMeter::new(response.content_length());

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let write_error = |source: std::io::Error| PatchError::Write {
            path: destination.to_path_buf(),
            source,
        };

        let partial = tempfile::Builder::new()
            .prefix(".hsa-download-")
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(write_error)?;
        // TempPath deletes the partial file on drop unless it is persisted
        let (file, partial_path) = partial.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut stream = response.bytes_stream();
        loop {
            let chunk = match timeout(self.inactivity_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => return Err(PatchError::transport(url, e)),
                Ok(None) => break,
                Err(_) => {
                    return Err(PatchError::transport(
                        url,
                        format!(
                            "no data received for {} seconds after {} bytes",
                            self.inactivity_timeout.as_secs(),
                            meter.bytes()
                        ),
                    ));
                }
            };

            file.write_all(&chunk).await.map_err(write_error)?;

            if let Some(event) = meter.advance(chunk.len() as u64) {
                self.send_best_effort(event);
            }
        }

        file.flush().await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);

        partial_path
            .persist(destination)
            .map_err(|e| write_error(e.error))?;

        let bytes = meter.bytes();
        self.send_best_effort(PatchProgress::DownloadFinished { bytes });
        debug!("Wrote {bytes} bytes to {}", destination.display());
        Ok(bytes)
    }

    fn send_best_effort(&self, progress: PatchProgress) {
        if self.progress_disabled.load(Ordering::Relaxed) {
            return;
        }

        // a full channel only drops this update
        if let Some(tx) = &self.progress_tx
            && let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(progress)
        {
            warn!("Progress channel closed, continuing download without updates");
            self.progress_disabled.store(true, Ordering::Relaxed);
        }
    }
}
