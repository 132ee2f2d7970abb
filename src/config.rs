use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debrid: DebridConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebridConfig {
    #[serde(default = "default_debrid_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_unrestrict_pause_ms")]
    pub unrestrict_pause_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_dispatcher_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_dispatcher_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_season")]
    pub season: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_delay_step_ms")]
    pub delay_step_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

// Default value functions
fn default_debrid_base_url() -> String {
    "https://api.real-debrid.com/rest/1.0".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_list_limit() -> u32 {
    100
}
fn default_interval_ms() -> u64 {
    3000
}
fn default_max_attempts() -> u32 {
    20
}
fn default_unrestrict_pause_ms() -> u64 {
    200
}
fn default_pacing_ms() -> u64 {
    500
}
fn default_max_concurrent() -> usize {
    1
}
fn default_dispatcher_endpoint() -> String {
    "http://127.0.0.1:9666/flash/add".to_string()
}
fn default_dispatcher_timeout_secs() -> u64 {
    10
}
fn default_search_url() -> String {
    "https://nyaa.si/".to_string()
}
fn default_season() -> u32 {
    1
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_delay_step_ms() -> u64 {
    50
}
fn default_max_delay_ms() -> u64 {
    500
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0"
        .to_string()
}

impl Default for DebridConfig {
    fn default() -> Self {
        Self {
            base_url: default_debrid_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            list_limit: default_list_limit(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            unrestrict_pause_ms: default_unrestrict_pause_ms(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn unrestrict_pause(&self) -> Duration {
        Duration::from_millis(self.unrestrict_pause_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl BatchConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_dispatcher_endpoint(),
            request_timeout_secs: default_dispatcher_timeout_secs(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            season: default_season(),
            base_delay_ms: default_base_delay_ms(),
            delay_step_ms: default_delay_step_ms(),
            max_delay_ms: default_max_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

/// Upper bound on in-flight batch items, the debrid API rate limits hard.
pub const MAX_BATCH_CONCURRENCY: usize = 5;

pub struct ConfigManager {
    config_dir: PathBuf,
    config_file: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new ConfigManager and load existing config or create default
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("", "", "rdjd").context("Failed to determine config directory")?;

        Self::load_from(project_dirs.config_dir().join("config.toml"))
    }

    /// Load (or create) the config at an explicit path
    pub fn load_from(config_file: impl Into<PathBuf>) -> Result<Self> {
        let config_file = config_file.into();
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
        }

        let config = if config_file.exists() {
            Self::load_config(&config_file)?
        } else {
            let default_config = Config::default();
            Self::save_config(&config_file, &default_config)?;
            default_config
        };

        Ok(Self {
            config_dir,
            config_file,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Save the current config to disk
    pub fn save(&self) -> Result<()> {
        Self::save_config(&self.config_file, &self.config)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Path of the credential slot that lives next to the config file
    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    fn load_config(config_file: &Path) -> Result<Config> {
        let content = fs::read_to_string(config_file)
            .with_context(|| format!("Failed to read config file: {:?}", config_file))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_file))?;

        Ok(config)
    }

    fn save_config(config_file: &Path, config: &Config) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(config_file, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

        Ok(())
    }

    /// Create a sample config file for user reference
    pub fn create_sample_config(&self) -> Result<PathBuf> {
        let sample_file = self.config_dir.join("config.sample.toml");
        Self::save_config(&sample_file, &Config::default())?;
        Ok(sample_file)
    }

    /// Validate the current configuration
    pub fn validate(&self) -> Result<()> {
        let config = &self.config;

        if config.debrid.base_url.trim().is_empty() {
            anyhow::bail!("debrid.base_url cannot be empty");
        }
        if config.debrid.request_timeout_secs == 0 {
            anyhow::bail!("debrid.request_timeout_secs must be greater than 0");
        }

        if config.poller.max_attempts == 0 {
            anyhow::bail!("poller.max_attempts must be greater than 0");
        }
        if config.poller.interval_ms == 0 {
            anyhow::bail!("poller.interval_ms must be greater than 0");
        }

        if config.batch.max_concurrent == 0 || config.batch.max_concurrent > MAX_BATCH_CONCURRENCY
        {
            anyhow::bail!(
                "batch.max_concurrent must be between 1 and {}",
                MAX_BATCH_CONCURRENCY
            );
        }

        if config.dispatcher.endpoint.trim().is_empty() {
            anyhow::bail!("dispatcher.endpoint cannot be empty");
        }

        if config.resolver.search_url.trim().is_empty() {
            anyhow::bail!("resolver.search_url cannot be empty");
        }
        if config.resolver.delay_step_ms == 0 {
            anyhow::bail!("resolver.delay_step_ms must be greater than 0");
        }
        if config.resolver.base_delay_ms > config.resolver.max_delay_ms {
            anyhow::bail!("resolver.base_delay_ms cannot exceed resolver.max_delay_ms");
        }

        Ok(())
    }
}
