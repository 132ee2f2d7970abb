use super::{ensure_token, spinner};
use anyhow::Result;
use console::{Term, style};
use rdjd::config::ConfigManager;
use rdjd::{CredentialStore, DebridApi, RealDebridClient, RemoteTorrent, TorrentStatus};
use std::sync::Arc;

pub async fn handle_list(
    config_manager: &ConfigManager,
    credentials: Arc<CredentialStore>,
) -> Result<()> {
    let term = Term::stdout();
    ensure_token(&credentials)?;

    let client = RealDebridClient::new(&config_manager.config().debrid, credentials)?;

    let spinner = spinner("Fetching torrents...")?;
    let result = client.list_torrents().await;
    spinner.finish_and_clear();
    let torrents = result?;

    if torrents.is_empty() {
        term.write_line(&format!(
            "{} No torrents on this account",
            style("ℹ️").blue()
        ))?;
        return Ok(());
    }

    term.write_line(&format!(
        "{} {} torrent(s):",
        style("📦").cyan(),
        torrents.len()
    ))?;
    term.write_line("")?;

    for torrent in &torrents {
        term.write_line(&format_row(torrent))?;
    }

    Ok(())
}

fn format_row(torrent: &RemoteTorrent) -> String {
    let status = match torrent.status {
        s if s.is_success() => style(s.as_str()).green(),
        s if s.is_failure() => style(s.as_str()).red(),
        s => style(s.as_str()).yellow(),
    };
    let added = torrent
        .added
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let progress = if torrent.status == TorrentStatus::Downloaded {
        String::new()
    } else {
        format!(" {:.0}%", torrent.progress)
    };

    format!(
        "  {:<14} {:<22}{} {} {}",
        style(&torrent.id).dim(),
        status,
        progress,
        style(added).dim(),
        torrent.filename.as_deref().unwrap_or("-")
    )
}
