pub mod batch;
pub mod config;
pub mod credentials;
pub mod debrid;
pub mod dispatcher;
pub mod error;
pub mod poller;
pub mod progress;
pub mod resolver;

// Re-export commonly used types for easier access in tests
pub use batch::{BatchOrchestrator, BatchResult, BatchSettings, ItemFailure, ItemSuccess};
pub use config::{Config, ConfigManager};
pub use credentials::CredentialStore;
pub use debrid::{
    DebridApi, DirectLink, MagnetLink, RealDebridClient, RemoteTorrent, TorrentStatus,
};
pub use dispatcher::{ClickNLoadDispatcher, LinkDispatcher};
pub use error::{Error, Result};
pub use poller::{CompletionPoller, PollSettings};
pub use progress::{PipelineProgress, ProgressSender};
pub use resolver::{EpisodeResolver, Resolution};
