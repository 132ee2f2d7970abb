use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Real-Debrid API token not set. Run 'rdjd auth set' first")]
    Unauthenticated,

    #[error("Real-Debrid error ({code}): {message}")]
    Remote { code: u16, message: String },

    #[error("Torrent {id} failed on Real-Debrid. Status: {status}")]
    TorrentFailed { id: String, status: String },

    #[error("Torrent {id} did not complete processing within {attempts} attempts")]
    Timeout { id: String, attempts: u32 },

    #[error("Torrent {id} finished but no download link could be unrestricted")]
    NoLinks { id: String },

    #[error("Download manager error: {0}")]
    Dispatch(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("HTML parse error: {0}")]
    Parse(String),

    #[error("Invalid magnet link: {0}")]
    InvalidMagnet(String),

    #[error("Credential store error: {0}")]
    Credential(String),
}

impl Error {
    /// Errors the poller may retry on the next interval.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Decode(_) | Error::Remote { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
