//! Fans a list of magnets through the poller and hands the union of direct
//! links to the download manager.
//!
//! One item failing, at any stage, is recorded against its index and the run
//! moves on. The only errors `run` returns are cancellation of the run as a
//! whole and a failed dispatch once aggregation is done.

use futures_util::{StreamExt, stream};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::config::{BatchConfig, MAX_BATCH_CONCURRENCY};
use crate::debrid::{DirectLink, MagnetLink};
use crate::dispatcher::LinkDispatcher;
use crate::error::{Error, Result};
use crate::poller::CompletionPoller;
use crate::progress::{PipelineProgress, ProgressSender};

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub pacing: Duration,
    pub max_concurrent: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchSettings {
    fn from(config: &BatchConfig) -> Self {
        Self {
            pacing: config.pacing(),
            max_concurrent: config.max_concurrent.clamp(1, MAX_BATCH_CONCURRENCY),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemSuccess {
    pub index: usize,
    pub magnet: MagnetLink,
    pub torrent_id: String,
    pub links: Vec<DirectLink>,
}

#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub index: usize,
    pub magnet: MagnetLink,
    pub error: String,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link {}: {}", self.index + 1, self.error)
    }
}

/// Outcome of one batch run. Both lists are ordered by input index and
/// together hold exactly one entry per input item.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub successes: Vec<ItemSuccess>,
    pub failures: Vec<ItemFailure>,
}

impl BatchResult {
    /// Every direct link obtained, in input order.
    pub fn links(&self) -> Vec<DirectLink> {
        self.successes
            .iter()
            .flat_map(|s| s.links.iter().cloned())
            .collect()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{} succeeded, {} link(s), {} error(s)",
            self.successes.len(),
            self.total,
            self.successes.iter().map(|s| s.links.len()).sum::<usize>(),
            self.failures.len()
        )
    }
}

pub struct BatchOrchestrator {
    poller: CompletionPoller,
    dispatcher: Arc<dyn LinkDispatcher>,
    settings: BatchSettings,
    progress: ProgressSender,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(
        poller: CompletionPoller,
        dispatcher: Arc<dyn LinkDispatcher>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            poller,
            dispatcher,
            settings,
            progress: ProgressSender::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.poller = self.poller.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Process every magnet, then dispatch the aggregated links once.
    pub async fn run(&self, magnets: &[MagnetLink]) -> Result<BatchResult> {
        if magnets.is_empty() {
            info!("Empty batch, nothing to do");
            return Ok(BatchResult::default());
        }

        let result = self.collect(magnets).await;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let links = result.links();
        if !links.is_empty() {
            self.progress
                .emit(PipelineProgress::Dispatching { links: links.len() });
            self.dispatcher.send(&links).await?;
        }

        Ok(result)
    }

    /// Process every magnet without dispatching.
    pub async fn collect(&self, magnets: &[MagnetLink]) -> BatchResult {
        let total = magnets.len();
        let window = self.settings.max_concurrent.max(1);
        let span = info_span!("batch", run = %Uuid::new_v4(), total);

        let outcomes: Vec<(usize, Result<(String, Vec<DirectLink>)>)> = async {
            info!(concurrency = window, "Starting batch");
            stream::iter(magnets.iter().enumerate())
                .map(|(index, magnet)| async move {
                    let delay = if index == 0 {
                        Duration::ZERO
                    } else if index < window {
                        self.settings.pacing * index as u32
                    } else {
                        self.settings.pacing
                    };
                    let outcome = match self.pace(delay).await {
                        Ok(()) => self.process_item(index, total, magnet).await,
                        Err(e) => Err(e),
                    };
                    (index, outcome)
                })
                .buffered(window)
                .collect()
                .await
        }
        .instrument(span.clone())
        .await;

        let mut result = BatchResult {
            total,
            ..Default::default()
        };
        for (index, outcome) in outcomes {
            let magnet = magnets[index].clone();
            match outcome {
                Ok((torrent_id, links)) => result.successes.push(ItemSuccess {
                    index,
                    magnet,
                    torrent_id,
                    links,
                }),
                Err(e) => result.failures.push(ItemFailure {
                    index,
                    magnet,
                    error: e.to_string(),
                }),
            }
        }

        span.in_scope(|| info!(summary = %result.summary(), "Batch finished"));
        result
    }

    /// Single-item flow: failures surface directly to the caller.
    pub async fn run_one(&self, magnet: &MagnetLink, dispatch: bool) -> Result<Vec<DirectLink>> {
        let (_, links) = self.fetch(magnet).await?;
        if dispatch {
            self.progress
                .emit(PipelineProgress::Dispatching { links: links.len() });
            self.dispatcher.send(&links).await?;
        }
        Ok(links)
    }

    async fn process_item(
        &self,
        index: usize,
        total: usize,
        magnet: &MagnetLink,
    ) -> Result<(String, Vec<DirectLink>)> {
        self.progress.emit(PipelineProgress::ItemStarted {
            index,
            total,
            label: magnet.label(),
        });

        match self.fetch(magnet).await {
            Ok((torrent_id, links)) => {
                info!(index, torrent_id = %torrent_id, links = links.len(), "Item done");
                self.progress.emit(PipelineProgress::ItemSucceeded {
                    index,
                    links: links.len(),
                });
                Ok((torrent_id, links))
            }
            Err(e) => {
                error!(index, magnet = %magnet.label(), error = %e, "Item failed");
                self.progress.emit(PipelineProgress::ItemFailed {
                    index,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn fetch(&self, magnet: &MagnetLink) -> Result<(String, Vec<DirectLink>)> {
        let id = self.poller.submit(magnet).await?;
        let remote_links = self.poller.wait_for_links(&id).await?;
        let links = self.poller.unrestrict_all(&id, &remote_links).await?;
        if links.is_empty() {
            return Err(Error::NoLinks { id });
        }
        Ok((id, links))
    }

    async fn pace(&self, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debrid::TorrentStatus;
    use crate::debrid::fake::{FakeDebrid, InfoStep};
    use crate::poller::PollSettings;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<Vec<DirectLink>>>,
        fail: bool,
    }

    #[async_trait]
    impl LinkDispatcher for RecordingDispatcher {
        async fn send(&self, links: &[DirectLink]) -> Result<()> {
            if self.fail {
                return Err(Error::Dispatch("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(links.to_vec());
            Ok(())
        }
    }

    fn magnet(n: usize) -> MagnetLink {
        MagnetLink::parse(&format!("magnet:?xt=urn:btih:{:040x}&dn=ep{}", n, n)).unwrap()
    }

    fn orchestrator(
        fake: Arc<FakeDebrid>,
        dispatcher: Arc<RecordingDispatcher>,
        max_concurrent: usize,
    ) -> BatchOrchestrator {
        let poller = CompletionPoller::new(
            fake,
            PollSettings {
                interval: Duration::from_millis(3000),
                max_attempts: 5,
                unrestrict_pause: Duration::from_millis(200),
            },
        );
        BatchOrchestrator::new(
            poller,
            dispatcher,
            BatchSettings {
                pacing: Duration::from_millis(500),
                max_concurrent,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_middle_add_failure_does_not_stop_batch() {
        let magnets = vec![magnet(1), magnet(2), magnet(3)];
        // Item 2 never gets an id, so item 3 becomes T2.
        let fake = Arc::new(
            FakeDebrid::new()
                .fail_add(magnets[1].as_str())
                .script("T1", vec![InfoStep::Done(vec!["A1".into()])])
                .script("T2", vec![InfoStep::Done(vec!["C1".into(), "C2".into()])]),
        );
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let result = orchestrator(fake, dispatcher.clone(), 1)
            .run(&magnets)
            .await
            .unwrap();

        assert_eq!(result.successes.len() + result.failures.len(), magnets.len());
        assert_eq!(
            result.successes.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert!(result.failures[0].to_string().starts_with("Link 2:"));

        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], result.links());
        assert_eq!(sent[0].len(), 3);
        assert!(sent[0][0].url.contains("A1"));
        assert!(sent[0][2].url.contains("C2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_skips_dispatch() {
        let fake = Arc::new(FakeDebrid::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let result = orchestrator(fake.clone(), dispatcher.clone(), 1)
            .run(&[])
            .await
            .unwrap();

        assert_eq!(result.total, 0);
        assert!(result.successes.is_empty());
        assert!(result.failures.is_empty());
        assert!(dispatcher.sent.lock().unwrap().is_empty());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_item_is_accounted_for() {
        let magnets: Vec<_> = (1..=6).map(magnet).collect();
        let fake = Arc::new(
            FakeDebrid::new()
                .fail_add(magnets[0].as_str())
                .script("T1", vec![InfoStep::Status(TorrentStatus::Virus)])
                .script("T2", vec![InfoStep::Status(TorrentStatus::Downloading)])
                .script("T3", vec![InfoStep::Done(vec!["X".into()])])
                .script("T4", vec![InfoStep::Done(vec![])])
                .fail_unrestrict("Y")
                .script("T5", vec![InfoStep::Done(vec!["Y".into()])]),
        );
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let result = orchestrator(fake, dispatcher.clone(), 1)
            .run(&magnets)
            .await
            .unwrap();

        assert_eq!(result.successes.len() + result.failures.len(), 6);
        assert_eq!(result.successes.len(), 1);
        assert_eq!(result.successes[0].index, 3);
        assert!(result.failures[1].error.contains("virus"));
        assert!(result.failures[2].error.contains("did not complete"));
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed_does_not_dispatch() {
        let magnets = vec![magnet(1)];
        let fake = Arc::new(FakeDebrid::new().script("T1", vec![InfoStep::Status(TorrentStatus::Dead)]));
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let result = orchestrator(fake, dispatcher.clone(), 1)
            .run(&magnets)
            .await
            .unwrap();

        assert_eq!(result.failures.len(), 1);
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_failure_is_raised() {
        let magnets = vec![magnet(1)];
        let fake = Arc::new(FakeDebrid::new().script("T1", vec![InfoStep::Done(vec!["A".into()])]));
        let dispatcher = Arc::new(RecordingDispatcher {
            fail: true,
            ..Default::default()
        });

        let err = orchestrator(fake, dispatcher, 1)
            .run(&magnets)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_concurrency_keeps_order() {
        let magnets: Vec<_> = (1..=4).map(magnet).collect();
        let mut fake = FakeDebrid::new();
        for i in 1..=4 {
            fake = fake.script(
                &format!("T{}", i),
                vec![
                    InfoStep::Status(TorrentStatus::Downloading),
                    InfoStep::Done(vec![format!("L{}", i)]),
                ],
            );
        }
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let result = orchestrator(Arc::new(fake), dispatcher.clone(), 2)
            .run(&magnets)
            .await
            .unwrap();

        assert_eq!(result.successes.len(), 4);
        let indexes: Vec<_> = result.successes.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_one_surfaces_errors() {
        let fake = Arc::new(FakeDebrid::new().script("T1", vec![InfoStep::Done(vec![])]));
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let err = orchestrator(fake, dispatcher.clone(), 1)
            .run_one(&magnet(1), true)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoLinks { .. }));
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_returns_cancelled() {
        let magnets: Vec<_> = (1..=3).map(magnet).collect();
        let fake = Arc::new(FakeDebrid::new().script("T1", vec![InfoStep::Status(TorrentStatus::Queued)]));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let cancel = CancellationToken::new();
        let batch = orchestrator(fake, dispatcher.clone(), 1).with_cancellation(cancel.clone());

        cancel.cancel();
        let collected = batch.collect(&magnets).await;
        assert_eq!(collected.failures.len(), 3);
        assert!(collected.failures.iter().all(|f| f.error.contains("cancelled")));

        let err = batch.run(&magnets).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }
}
