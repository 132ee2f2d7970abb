use super::{ensure_token, spinner};
use anyhow::Result;
use console::{Term, style};
use rdjd::config::ConfigManager;
use rdjd::{CompletionPoller, CredentialStore, MagnetLink, PollSettings, RealDebridClient};
use std::sync::Arc;

/// Submit a magnet and select its files, without waiting for the download.
pub async fn handle_add(
    config_manager: &ConfigManager,
    credentials: Arc<CredentialStore>,
    magnet: String,
) -> Result<()> {
    let term = Term::stdout();
    ensure_token(&credentials)?;

    let magnet = MagnetLink::parse(&magnet)?;
    let config = config_manager.config();
    let client = RealDebridClient::new(&config.debrid, credentials)?;
    let poller = CompletionPoller::new(Arc::new(client), PollSettings::from(&config.poller));

    let spinner = spinner(format!("Adding {}...", magnet.label()))?;
    let result = poller.submit(&magnet).await;
    spinner.finish_and_clear();

    let torrent_id = result?;
    term.write_line(&format!(
        "{} Added to Real-Debrid (ID: {})",
        style("✅").green(),
        style(&torrent_id).cyan()
    ))?;
    term.write_line(&format!(
        "{} Check progress with 'rdjd list'",
        style("💡").yellow()
    ))?;

    Ok(())
}
