use super::spinner;
use anyhow::Result;
use console::{Term, style};
use rdjd::config::ConfigManager;
use rdjd::resolver::episode_tag;
use rdjd::{EpisodeResolver, Resolution};

pub async fn handle_resolve(
    config_manager: &ConfigManager,
    series: String,
    episode: u32,
    season: Option<u32>,
) -> Result<()> {
    let term = Term::stdout();
    let config = &config_manager.config().resolver;
    let season = season.unwrap_or(config.season);
    let resolver = EpisodeResolver::new(config)?.with_season(season);

    let spinner = spinner(format!(
        "Searching {} {}...",
        series,
        episode_tag(season, episode)
    ))?;
    let result = resolver.resolve(&series, episode).await;
    spinner.finish_and_clear();

    match result? {
        Resolution::Found(magnet) => {
            term.write_line(&format!(
                "{} Ep {}: {}",
                style("✅").green(),
                episode,
                style(magnet.label()).bold()
            ))?;
            term.write_line(magnet.as_str())?;
        }
        Resolution::NotFound => {
            term.write_line(&format!("{} Ep {}: Not Found", style("❌").red(), episode))?;
        }
    }

    Ok(())
}
