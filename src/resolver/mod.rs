pub mod pacing;
pub mod page;

pub use pacing::AdaptivePacer;
pub use page::{extract_magnet_links, first_result_magnet};

use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::debrid::MagnetLink;
use crate::error::{Error, Result};

/// Outcome of a single episode lookup. Absence is expected, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(MagnetLink),
    NotFound,
}

#[derive(Debug, Clone)]
pub enum EpisodeResult {
    Found(MagnetLink),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub episode: u32,
    pub result: EpisodeResult,
    /// Delay applied before this episode's request.
    pub delay: Duration,
}

impl EpisodeOutcome {
    pub fn magnet(&self) -> Option<&MagnetLink> {
        match &self.result {
            EpisodeResult::Found(magnet) => Some(magnet),
            _ => None,
        }
    }
}

impl fmt::Display for EpisodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeResult::Found(_) => write!(f, "Found"),
            EpisodeResult::NotFound => write!(f, "Not Found"),
            EpisodeResult::Failed(reason) => write!(f, "Fetch Error: {}", reason),
        }
    }
}

/// `S01E05` style tag, zero padded to two digits.
pub fn episode_tag(season: u32, episode: u32) -> String {
    format!("S{:02}E{:02}", season, episode)
}

pub fn search_query(series: &str, season: u32, episode: u32) -> String {
    let series = series.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{} {}", series, episode_tag(season, episode))
}

pub struct EpisodeResolver {
    client: Client,
    search_url: String,
    season: u32,
    pacer: AdaptivePacer,
    cancel: CancellationToken,
}

impl EpisodeResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            season: config.season.max(1),
            pacer: AdaptivePacer::from(config),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_season(mut self, season: u32) -> Self {
        self.season = season.max(1);
        self
    }

    /// Fetch a page and return its body. Non-2xx is an error.
    pub async fn fetch_document(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// Top-ranked magnet for one episode of `series`.
    pub async fn resolve(&self, series: &str, episode: u32) -> Result<Resolution> {
        let query = search_query(series, self.season, episode);
        debug!(episode, query = %query, "Searching episode");

        let html = self
            .fetch_document(
                &self.search_url,
                &[
                    ("f", "0".to_string()),
                    ("c", "0_0".to_string()),
                    ("q", query),
                    ("s", "seeders".to_string()),
                    ("o", "desc".to_string()),
                ],
            )
            .await?;

        match first_result_magnet(&html)? {
            Some(magnet) => {
                info!(episode, magnet = %magnet.label(), "Found magnet");
                Ok(Resolution::Found(magnet))
            }
            None => {
                debug!(episode, "No result");
                Ok(Resolution::NotFound)
            }
        }
    }

    /// Resolve episodes `1..=episodes` one at a time. Each miss (or failed
    /// fetch) lengthens the delay before the next request, each hit resets it.
    pub async fn resolve_season<F>(
        &self,
        series: &str,
        episodes: u32,
        mut on_episode: F,
    ) -> Result<Vec<EpisodeOutcome>>
    where
        F: FnMut(&EpisodeOutcome),
    {
        let mut pacer = self.pacer.clone();
        let mut outcomes = Vec::new();

        for episode in 1..=episodes {
            let delay = if episode == 1 {
                Duration::ZERO
            } else {
                pacer.current()
            };
            if !delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let result = match self.resolve(series, episode).await {
                Ok(Resolution::Found(magnet)) => {
                    pacer.record_hit();
                    EpisodeResult::Found(magnet)
                }
                Ok(Resolution::NotFound) => {
                    pacer.record_miss();
                    EpisodeResult::NotFound
                }
                Err(e) => {
                    warn!(episode, error = %e, "Episode search failed");
                    pacer.record_miss();
                    EpisodeResult::Failed(e.to_string())
                }
            };

            let outcome = EpisodeOutcome {
                episode,
                result,
                delay,
            };
            on_episode(&outcome);
            outcomes.push(outcome);
        }

        let found = outcomes.iter().filter(|o| o.magnet().is_some()).count();
        info!(series, found, total = episodes, "Season search complete");
        Ok(outcomes)
    }

    /// Every magnet anchor on an arbitrary page.
    pub async fn scan_page(&self, url: &str) -> Result<Vec<MagnetLink>> {
        let html = self.fetch_document(url, &[]).await?;
        let links = extract_magnet_links(&html)?;
        info!(url, count = links.len(), "Scanned page for magnets");
        Ok(links)
    }
}
