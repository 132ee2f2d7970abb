//! Drives one magnet from submission to a list of direct links.
//!
//! `Submitted -> Selecting -> Polling -> Succeeded | Failed`. Selection
//! failures only warn, since the service may auto-select. Polling is bounded
//! by an attempt count, never a wall-clock deadline, and call errors inside
//! the loop are retried on the next tick. Once the torrent is downloaded each
//! hoster link is unrestricted in order; a link that fails is skipped.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollerConfig;
use crate::debrid::{DebridApi, DirectLink, MagnetLink};
use crate::error::{Error, Result};
use crate::progress::{PipelineProgress, ProgressSender};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    pub unrestrict_pause: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollerConfig::default())
    }
}

impl From<&PollerConfig> for PollSettings {
    fn from(config: &PollerConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts.max(1),
            unrestrict_pause: config.unrestrict_pause(),
        }
    }
}

#[derive(Clone)]
pub struct CompletionPoller {
    api: Arc<dyn DebridApi>,
    settings: PollSettings,
    progress: ProgressSender,
    cancel: CancellationToken,
}

impl CompletionPoller {
    pub fn new(api: Arc<dyn DebridApi>, settings: PollSettings) -> Self {
        Self {
            api,
            settings,
            progress: ProgressSender::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Run the whole machine for one magnet.
    ///
    /// The result may be shorter than the torrent's link list when some
    /// unrestrict calls fail, and empty when all of them do.
    pub async fn process(&self, magnet: &MagnetLink) -> Result<Vec<DirectLink>> {
        let id = self.submit(magnet).await?;
        let links = self.wait_for_links(&id).await?;
        self.unrestrict_all(&id, &links).await
    }

    /// Add the magnet and ask for every file to be selected.
    pub async fn submit(&self, magnet: &MagnetLink) -> Result<String> {
        self.ensure_active()?;
        let added = self.api.add_magnet(magnet).await?;
        info!(torrent_id = %added.id, magnet = %magnet.label(), "Magnet submitted");
        self.progress.emit(PipelineProgress::Added {
            torrent_id: added.id.clone(),
        });

        if let Err(e) = self.api.select_all_files(&added.id).await {
            warn!(torrent_id = %added.id, error = %e, "File selection failed, continuing");
            self.progress.emit(PipelineProgress::SelectWarning {
                torrent_id: added.id.clone(),
                error: e.to_string(),
            });
        }

        Ok(added.id)
    }

    /// Poll until the torrent reaches a terminal status or attempts run out.
    /// Returns the hoster links of a downloaded torrent.
    pub async fn wait_for_links(&self, id: &str) -> Result<Vec<String>> {
        let max_attempts = self.settings.max_attempts;

        for attempt in 1..=max_attempts {
            self.ensure_active()?;

            match self.api.get_info(id).await {
                Ok(torrent) => {
                    debug!(
                        torrent_id = %id,
                        attempt,
                        status = %torrent.status,
                        progress = torrent.progress,
                        "Polled torrent"
                    );
                    self.progress.emit(PipelineProgress::Status {
                        torrent_id: id.to_string(),
                        attempt,
                        max_attempts,
                        status: torrent.status,
                        progress: torrent.progress,
                    });

                    if torrent.status.is_success() {
                        info!(torrent_id = %id, links = torrent.links.len(), "Torrent downloaded");
                        return Ok(torrent.links);
                    }
                    if torrent.status.is_failure() {
                        warn!(torrent_id = %id, status = %torrent.status, "Torrent failed");
                        return Err(Error::TorrentFailed {
                            id: id.to_string(),
                            status: torrent.status.to_string(),
                        });
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(torrent_id = %id, attempt, error = %e, "Polling error, will retry");
                    self.progress.emit(PipelineProgress::PollRetry {
                        torrent_id: id.to_string(),
                        attempt,
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                self.pause(self.settings.interval).await?;
            }
        }

        Err(Error::Timeout {
            id: id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Unrestrict each link in order, skipping the ones that fail.
    pub async fn unrestrict_all(&self, id: &str, links: &[String]) -> Result<Vec<DirectLink>> {
        self.progress.emit(PipelineProgress::Unrestricting {
            torrent_id: id.to_string(),
            total: links.len(),
        });

        let mut direct = Vec::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            if i > 0 {
                self.pause(self.settings.unrestrict_pause).await?;
            }
            self.ensure_active()?;

            match self.api.unrestrict(link).await {
                Ok(unrestricted) => direct.push(unrestricted),
                Err(e) => {
                    warn!(torrent_id = %id, link = %link, error = %e, "Failed to unrestrict link");
                    self.progress.emit(PipelineProgress::UnrestrictFailed {
                        torrent_id: id.to_string(),
                        link: link.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(torrent_id = %id, ok = direct.len(), total = links.len(), "Unrestrict finished");
        Ok(direct)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
