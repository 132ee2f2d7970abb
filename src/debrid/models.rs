use chrono::{DateTime, Utc};
use reqwest::Url;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

static INFO_HASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{40}|[A-Za-z2-7]{32})$").expect("valid info hash regex")
});

/// A `magnet:?` URI, the unit of work fed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MagnetLink(String);

impl MagnetLink {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.get(..8) {
            Some(scheme) if scheme.eq_ignore_ascii_case("magnet:?") => Ok(Self(raw.to_string())),
            _ => Err(Error::InvalidMagnet(truncate(raw, 60))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `urn:btih:` hash, when the link carries a well-formed one.
    pub fn info_hash(&self) -> Option<String> {
        self.query_value("xt")
            .into_iter()
            .filter_map(|xt| {
                xt.strip_prefix("urn:btih:")
                    .or_else(|| xt.strip_prefix("urn:BTIH:"))
                    .map(str::to_string)
            })
            .find(|hash| INFO_HASH.is_match(hash))
            .map(|hash| hash.to_lowercase())
    }

    /// The `dn` parameter, decoded.
    pub fn display_name(&self) -> Option<String> {
        self.query_value("dn").into_iter().next()
    }

    /// Short human label: the display name, else the hash, else a prefix.
    pub fn label(&self) -> String {
        self.display_name()
            .or_else(|| self.info_hash())
            .unwrap_or_else(|| truncate(&self.0, 40))
    }

    fn query_value(&self, key: &str) -> Vec<String> {
        match Url::parse(&self.0) {
            Ok(url) => url
                .query_pairs()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl TryFrom<String> for MagnetLink {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MagnetLink> for String {
    fn from(value: MagnetLink) -> Self {
        value.0
    }
}

impl fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time-limited direct download URL produced by unrestricting one hoster link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectLink {
    pub url: String,
    pub filename: Option<String>,
    pub filesize: Option<u64>,
}

impl fmt::Display for DirectLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    MagnetConversion,
    WaitingFilesSelection,
    Queued,
    Downloading,
    Compressing,
    Uploading,
    Downloaded,
    MagnetError,
    Error,
    Virus,
    Dead,
    #[serde(other)]
    Unknown,
}

impl TorrentStatus {
    pub fn is_success(self) -> bool {
        self == TorrentStatus::Downloaded
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            TorrentStatus::MagnetError
                | TorrentStatus::Error
                | TorrentStatus::Virus
                | TorrentStatus::Dead
        )
    }

    pub fn is_terminal(self) -> bool {
        self.is_success() || self.is_failure()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TorrentStatus::MagnetConversion => "magnet_conversion",
            TorrentStatus::WaitingFilesSelection => "waiting_files_selection",
            TorrentStatus::Queued => "queued",
            TorrentStatus::Downloading => "downloading",
            TorrentStatus::Compressing => "compressing",
            TorrentStatus::Uploading => "uploading",
            TorrentStatus::Downloaded => "downloaded",
            TorrentStatus::MagnetError => "magnet_error",
            TorrentStatus::Error => "error",
            TorrentStatus::Virus => "virus",
            TorrentStatus::Dead => "dead",
            TorrentStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TorrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The service's view of one submitted magnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTorrent {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    pub status: TorrentStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub added: Option<DateTime<Utc>>,
    /// Hoster links, only meaningful once `status` is `downloaded`.
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedTorrent {
    pub id: String,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UnrestrictResponse {
    pub download: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
}

/// Error payload the API returns, sometimes alongside HTTP 200.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}
