use tokio::sync::mpsc;

use crate::debrid::TorrentStatus;

#[derive(Debug, Clone)]
pub enum PipelineProgress {
    ItemStarted {
        index: usize,
        total: usize,
        label: String,
    },
    Added {
        torrent_id: String,
    },
    SelectWarning {
        torrent_id: String,
        error: String,
    },
    Status {
        torrent_id: String,
        attempt: u32,
        max_attempts: u32,
        status: TorrentStatus,
        progress: f64,
    },
    PollRetry {
        torrent_id: String,
        attempt: u32,
        error: String,
    },
    Unrestricting {
        torrent_id: String,
        total: usize,
    },
    UnrestrictFailed {
        torrent_id: String,
        link: String,
        error: String,
    },
    ItemSucceeded {
        index: usize,
        links: usize,
    },
    ItemFailed {
        index: usize,
        error: String,
    },
    Dispatching {
        links: usize,
    },
}

/// Optional progress channel; sending never fails the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender(Option<mpsc::UnboundedSender<PipelineProgress>>);

impl ProgressSender {
    pub fn new(sender: mpsc::UnboundedSender<PipelineProgress>) -> Self {
        Self(Some(sender))
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: PipelineProgress) {
        if let Some(sender) = &self.0 {
            let _ = sender.send(event);
        }
    }
}

/// One-line rendering used by the CLI spinner.
pub fn describe(event: &PipelineProgress) -> String {
    match event {
        PipelineProgress::ItemStarted {
            index,
            total,
            label,
        } => format!("({}/{}) {}", index + 1, total, label),
        PipelineProgress::Added { torrent_id } => {
            format!("Added (ID: {}). Selecting files...", torrent_id)
        }
        PipelineProgress::SelectWarning { torrent_id, error } => format!(
            "File selection warning for {}: {}. Checking status...",
            torrent_id, error
        ),
        PipelineProgress::Status {
            torrent_id,
            attempt,
            max_attempts,
            status,
            progress,
        } => format!(
            "RD Status (ID: {}): {} ({:.0}%) [{}/{}]",
            torrent_id, status, progress, attempt, max_attempts
        ),
        PipelineProgress::PollRetry {
            torrent_id,
            attempt,
            error,
        } => format!("Polling error for {} (attempt {}): {}", torrent_id, attempt, error),
        PipelineProgress::Unrestricting { torrent_id, total } => {
            format!("Torrent {} ready. Unrestricting {} link(s)...", torrent_id, total)
        }
        PipelineProgress::UnrestrictFailed { link, error, .. } => {
            format!("Failed to unrestrict {}: {}", link, error)
        }
        PipelineProgress::ItemSucceeded { index, links } => {
            format!("Item {}: {} link(s)", index + 1, links)
        }
        PipelineProgress::ItemFailed { index, error } => format!("Item {}: {}", index + 1, error),
        PipelineProgress::Dispatching { links } => {
            format!("Sending {} link(s) to JDownloader...", links)
        }
    }
}
