use super::{build_orchestrator, cancel_on_ctrl_c, ensure_token, follow_progress, spinner};
use anyhow::{Context, Result};
use console::{Term, style};
use rdjd::config::ConfigManager;
use rdjd::{BatchResult, CredentialStore, MagnetLink, ProgressSender};
use std::sync::Arc;
use tracing::warn;

pub async fn handle_batch(
    config_manager: &ConfigManager,
    credentials: Arc<CredentialStore>,
    magnets: Vec<String>,
    file: Option<String>,
    no_dispatch: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let mut raw = magnets;
    if let Some(path) = file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read magnet file: {}", path))?;
        raw.extend(read_magnet_lines(&content));
    }

    let magnets = parse_magnets(&raw);
    run_batch(
        config_manager,
        credentials,
        magnets,
        !no_dispatch,
        concurrency,
    )
    .await
}

/// Run a batch with a spinner and print the per-item report.
pub(crate) async fn run_batch(
    config_manager: &ConfigManager,
    credentials: Arc<CredentialStore>,
    magnets: Vec<MagnetLink>,
    dispatch: bool,
    concurrency: Option<usize>,
) -> Result<()> {
    let term = Term::stdout();
    ensure_token(&credentials)?;

    if magnets.is_empty() {
        term.write_line(&format!("{} No magnet links to process", style("ℹ️").blue()))?;
        return Ok(());
    }

    term.write_line(&format!(
        "{} Processing {} magnet link(s)...",
        style("🚀").cyan(),
        magnets.len()
    ))?;

    let (progress, events) = ProgressSender::channel();
    let orchestrator = build_orchestrator(
        config_manager.config(),
        credentials,
        concurrency,
        progress,
        cancel_on_ctrl_c(),
    )?;

    let follower = follow_progress(spinner("Starting batch...")?, events);
    let result = if dispatch {
        orchestrator.run(&magnets).await
    } else {
        Ok(orchestrator.collect(&magnets).await)
    };
    drop(orchestrator);
    follower.await?;

    let result = result?;
    print_report(&term, &result, dispatch)?;
    Ok(())
}

fn print_report(term: &Term, result: &BatchResult, dispatched: bool) -> Result<()> {
    let links = result.links();

    term.write_line("")?;
    if !dispatched {
        for link in &links {
            term.write_line(&link.url)?;
        }
    } else if !links.is_empty() {
        term.write_line(&format!(
            "{} Sent {} link(s) to JDownloader",
            style("📤").green(),
            links.len()
        ))?;
    }

    let icon = if result.is_complete_success() {
        style("✅").green()
    } else if result.successes.is_empty() {
        style("❌").red()
    } else {
        style("⚠️").yellow()
    };
    term.write_line(&format!("{} {}", icon, result.summary()))?;

    if !result.failures.is_empty() {
        term.write_line(&format!("{} Errors:", style("📋").dim()))?;
        for failure in &result.failures {
            term.write_line(&format!("   • {}", failure))?;
        }
    }

    Ok(())
}

/// Non-empty lines that are not `#` comments.
fn read_magnet_lines(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

/// Parse every entry, warning about and skipping anything that is not a magnet.
fn parse_magnets(raw: &[String]) -> Vec<MagnetLink> {
    raw.iter()
        .filter_map(|entry| match MagnetLink::parse(entry) {
            Ok(magnet) => Some(magnet),
            Err(e) => {
                warn!(entry = %entry, error = %e, "Skipping entry");
                None
            }
        })
        .collect()
}
