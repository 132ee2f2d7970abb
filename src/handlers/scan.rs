use super::batch::run_batch;
use super::spinner;
use anyhow::Result;
use console::{Term, style};
use rdjd::config::ConfigManager;
use rdjd::{CredentialStore, EpisodeResolver};
use std::sync::Arc;

pub async fn handle_scan(
    config_manager: &ConfigManager,
    credentials: Arc<CredentialStore>,
    url: String,
    send: bool,
) -> Result<()> {
    let term = Term::stdout();
    let resolver = EpisodeResolver::new(&config_manager.config().resolver)?;

    let spinner = spinner(format!("Scanning {}...", url))?;
    let result = resolver.scan_page(&url).await;
    spinner.finish_and_clear();
    let magnets = result?;

    if magnets.is_empty() {
        term.write_line(&format!("{} No magnet links found", style("❌").red()))?;
        return Ok(());
    }

    term.write_line(&format!(
        "{} Found {} magnet link(s):",
        style("🧲").cyan(),
        magnets.len()
    ))?;
    for (i, magnet) in magnets.iter().enumerate() {
        term.write_line(&format!(
            "  {}. {}",
            style(i + 1).dim(),
            style(magnet.label()).bold()
        ))?;
    }

    if send {
        term.write_line("")?;
        run_batch(config_manager, credentials, magnets, true, None).await?;
    }

    Ok(())
}
