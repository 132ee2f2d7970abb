pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod models;

pub use client::RealDebridClient;
pub use models::{AddedTorrent, DirectLink, MagnetLink, RemoteTorrent, TorrentStatus};

use async_trait::async_trait;

use crate::error::Result;

/// The five debrid operations the pipeline is built on.
///
/// Every call fails with [`Error::Unauthenticated`](crate::Error::Unauthenticated)
/// when no token is available and with [`Error::Remote`](crate::Error::Remote)
/// when the service rejects the request, including HTTP 200 responses that
/// carry an `error` field.
#[async_trait]
pub trait DebridApi: Send + Sync {
    /// Submit a magnet. The returned id keys every later call.
    async fn add_magnet(&self, magnet: &MagnetLink) -> Result<AddedTorrent>;

    /// Select every file of the torrent. `204 No Content` counts as success.
    async fn select_all_files(&self, id: &str) -> Result<()>;

    async fn get_info(&self, id: &str) -> Result<RemoteTorrent>;

    /// Turn one hoster link into a direct URL. Two calls on the same link may
    /// legitimately return different URLs.
    async fn unrestrict(&self, link: &str) -> Result<DirectLink>;

    async fn list_torrents(&self) -> Result<Vec<RemoteTorrent>>;
}
