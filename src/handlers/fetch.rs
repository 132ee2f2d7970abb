use super::{build_orchestrator, cancel_on_ctrl_c, ensure_token, follow_progress, spinner};
use anyhow::Result;
use console::{Term, style};
use rdjd::config::ConfigManager;
use rdjd::{CredentialStore, MagnetLink, ProgressSender};
use std::sync::Arc;

/// One magnet from submission to JDownloader. Errors surface directly.
pub async fn handle_fetch(
    config_manager: &ConfigManager,
    credentials: Arc<CredentialStore>,
    magnet: String,
    no_dispatch: bool,
) -> Result<()> {
    let term = Term::stdout();
    ensure_token(&credentials)?;

    let magnet = MagnetLink::parse(&magnet)?;
    let (progress, events) = ProgressSender::channel();
    let orchestrator = build_orchestrator(
        config_manager.config(),
        credentials,
        None,
        progress,
        cancel_on_ctrl_c(),
    )?;

    let follower = follow_progress(spinner(format!("Adding {}...", magnet.label()))?, events);
    let result = orchestrator.run_one(&magnet, !no_dispatch).await;
    drop(orchestrator);
    follower.await?;

    let links = result?;
    if no_dispatch {
        for link in &links {
            term.write_line(&link.url)?;
        }
        term.write_line(&format!(
            "{} {} direct link(s) ready",
            style("✅").green(),
            links.len()
        ))?;
    } else {
        term.write_line(&format!(
            "{} Sent {} link(s) to JDownloader",
            style("✅").green(),
            links.len()
        ))?;
    }

    Ok(())
}
