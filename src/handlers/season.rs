use super::batch::run_batch;
use super::cancel_on_ctrl_c;
use anyhow::Result;
use console::{Term, style};
use rdjd::config::ConfigManager;
use rdjd::resolver::EpisodeResult;
use rdjd::{CredentialStore, EpisodeResolver, MagnetLink};
use std::sync::Arc;

/// Search episodes 1..=`episodes` and optionally send every hit as a batch.
pub async fn handle_season(
    config_manager: &ConfigManager,
    credentials: Arc<CredentialStore>,
    series: String,
    episodes: u32,
    season: Option<u32>,
    send: bool,
) -> Result<()> {
    let term = Term::stdout();
    let config = &config_manager.config().resolver;
    let season = season.unwrap_or(config.season);
    let resolver = EpisodeResolver::new(config)?
        .with_season(season)
        .with_cancellation(cancel_on_ctrl_c());

    term.write_line(&format!(
        "{} Searching {} episode(s) of {} (season {})...",
        style("🔍").cyan(),
        episodes,
        style(&series).bold(),
        season
    ))?;

    let mut write_error = None;
    let outcomes = resolver
        .resolve_season(&series, episodes, |outcome| {
            let icon = match &outcome.result {
                EpisodeResult::Found(_) => style("✅").green(),
                EpisodeResult::NotFound => style("❌").red(),
                EpisodeResult::Failed(_) => style("⚠️").yellow(),
            };
            if let Err(e) = term.write_line(&format!(
                "{} Ep {}: {}",
                icon, outcome.episode, outcome.result
            )) {
                write_error.get_or_insert(e);
            }
        })
        .await?;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    let magnets: Vec<MagnetLink> = outcomes
        .iter()
        .filter_map(|o| o.magnet().cloned())
        .collect();

    term.write_line("")?;
    term.write_line(&format!(
        "{} {}/{} episode(s) found",
        style("📋").cyan(),
        magnets.len(),
        episodes
    ))?;

    if !send {
        for magnet in &magnets {
            term.write_line(magnet.as_str())?;
        }
        return Ok(());
    }

    run_batch(config_manager, credentials, magnets, true, None).await
}
