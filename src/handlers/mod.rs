pub mod add;
pub mod auth;
pub mod batch;
pub mod config;
pub mod fetch;
pub mod list;
pub mod resolve;
pub mod scan;
pub mod season;

use crate::cli::{Commands, ConfigAction};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rdjd::batch::BatchSettings;
use rdjd::config::{Config, MAX_BATCH_CONCURRENCY};
use rdjd::progress::{PipelineProgress, describe};
use rdjd::{
    BatchOrchestrator, ClickNLoadDispatcher, CompletionPoller, CredentialStore, PollSettings,
    ProgressSender, RealDebridClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// Re-export all handlers
pub use add::handle_add;
pub use auth::handle_auth;
pub use batch::handle_batch;
pub use config::handle_config;
pub use fetch::handle_fetch;
pub use list::handle_list;
pub use resolve::handle_resolve;
pub use scan::handle_scan;
pub use season::handle_season;

/// Check if config validation should be skipped for certain commands
pub fn should_skip_config_validation(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Config {
            action: ConfigAction::Validate | ConfigAction::Sample | ConfigAction::Path
        }
    )
}

pub(crate) fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")?);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Drive a spinner from pipeline events until every sender is dropped.
/// Warnings and per-item outcomes are printed above the spinner line.
pub(crate) fn follow_progress(
    spinner: ProgressBar,
    mut events: UnboundedReceiver<PipelineProgress>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match &event {
                PipelineProgress::SelectWarning { .. }
                | PipelineProgress::PollRetry { .. }
                | PipelineProgress::UnrestrictFailed { .. } => {
                    spinner.println(format!("⚠️  {}", describe(&event)));
                }
                PipelineProgress::ItemSucceeded { .. } => {
                    spinner.println(format!("✅ {}", describe(&event)));
                }
                PipelineProgress::ItemFailed { .. } => {
                    spinner.println(format!("❌ {}", describe(&event)));
                }
                _ => spinner.set_message(describe(&event)),
            }
        }
        spinner.finish_and_clear();
    })
}

/// Token cancelled on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

pub(crate) fn ensure_token(credentials: &CredentialStore) -> Result<()> {
    if !credentials.is_set() {
        anyhow::bail!(
            "No Real-Debrid API token configured. Run 'rdjd auth set' or set RDJD_TOKEN"
        );
    }
    Ok(())
}

/// Wire client, poller, dispatcher and orchestrator from config.
pub(crate) fn build_orchestrator(
    config: &Config,
    credentials: Arc<CredentialStore>,
    concurrency: Option<usize>,
    progress: ProgressSender,
    cancel: CancellationToken,
) -> Result<BatchOrchestrator> {
    let client = RealDebridClient::new(&config.debrid, credentials)?;
    let poller = CompletionPoller::new(Arc::new(client), PollSettings::from(&config.poller));
    let dispatcher = ClickNLoadDispatcher::new(&config.dispatcher)?;

    let mut settings = BatchSettings::from(&config.batch);
    if let Some(n) = concurrency {
        settings.max_concurrent = n.clamp(1, MAX_BATCH_CONCURRENCY);
    }

    Ok(
        BatchOrchestrator::new(poller, Arc::new(dispatcher), settings)
            .with_progress(progress)
            .with_cancellation(cancel),
    )
}
