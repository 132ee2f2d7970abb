//! Click'n'Load hand-off to a local download manager.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DispatcherConfig;
use crate::debrid::DirectLink;
use crate::error::{Error, Result};

/// Receives the final set of direct links.
#[async_trait]
pub trait LinkDispatcher: Send + Sync {
    async fn send(&self, links: &[DirectLink]) -> Result<()>;
}

/// Posts links to JDownloader's `/flash/add` listener.
pub struct ClickNLoadDispatcher {
    client: Client,
    endpoint: String,
}

impl ClickNLoadDispatcher {
    pub fn new(config: &DispatcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Body of the `urls` field: one link per line.
pub fn join_links(links: &[DirectLink]) -> String {
    links
        .iter()
        .map(|link| link.url.as_str())
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[async_trait]
impl LinkDispatcher for ClickNLoadDispatcher {
    async fn send(&self, links: &[DirectLink]) -> Result<()> {
        if links.is_empty() {
            debug!("No links to dispatch");
            return Ok(());
        }

        let urls = join_links(links);
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("urls", urls.as_str())])
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("JDownloader connection failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Dispatch(format!(
                "JDownloader connection failed. Status: {}",
                status
            )));
        }

        info!(count = links.len(), endpoint = %self.endpoint, "Links sent to download manager");
        Ok(())
    }
}
