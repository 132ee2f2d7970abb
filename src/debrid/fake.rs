use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{AddedTorrent, DebridApi, DirectLink, MagnetLink, RemoteTorrent, TorrentStatus};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum InfoStep {
    Status(TorrentStatus),
    Done(Vec<String>),
    CallError,
}

/// Scripted in-memory debrid service. Ids are handed out as `T1`, `T2`, ...
/// in `add_magnet` order; each id replays its script, repeating the last step.
#[derive(Default)]
pub struct FakeDebrid {
    next_id: AtomicUsize,
    unrestrict_counter: AtomicUsize,
    select_fails: AtomicBool,
    failing_magnets: Mutex<HashSet<String>>,
    failing_links: Mutex<HashSet<String>>,
    scripts: Mutex<HashMap<String, VecDeque<InfoStep>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeDebrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, id: &str, steps: Vec<InfoStep>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into());
        self
    }

    pub fn fail_add(self, magnet: &str) -> Self {
        self.failing_magnets
            .lock()
            .unwrap()
            .insert(magnet.to_string());
        self
    }

    pub fn fail_unrestrict(self, link: &str) -> Self {
        self.failing_links.lock().unwrap().insert(link.to_string());
        self
    }

    pub fn fail_select(self) -> Self {
        self.select_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn remote(message: &str) -> Error {
        Error::Remote {
            code: 503,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl DebridApi for FakeDebrid {
    async fn add_magnet(&self, magnet: &MagnetLink) -> Result<AddedTorrent> {
        self.record(format!("add:{}", magnet));
        if self.failing_magnets.lock().unwrap().contains(magnet.as_str()) {
            return Err(Error::Remote {
                code: 400,
                message: "infringing_file".to_string(),
            });
        }
        let id = format!("T{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        Ok(AddedTorrent { id, uri: None })
    }

    async fn select_all_files(&self, id: &str) -> Result<()> {
        self.record(format!("select:{}", id));
        if self.select_fails.load(Ordering::SeqCst) {
            return Err(Self::remote("action_already_done"));
        }
        Ok(())
    }

    async fn get_info(&self, id: &str) -> Result<RemoteTorrent> {
        self.record(format!("info:{}", id));
        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.entry(id.to_string()).or_default();
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        let (status, links) = match step {
            Some(InfoStep::Status(status)) => (status, Vec::new()),
            Some(InfoStep::Done(links)) => (TorrentStatus::Downloaded, links),
            Some(InfoStep::CallError) => return Err(Self::remote("service_unavailable")),
            None => (TorrentStatus::Queued, Vec::new()),
        };

        Ok(RemoteTorrent {
            id: id.to_string(),
            filename: None,
            hash: None,
            status,
            progress: if status.is_success() { 100.0 } else { 0.0 },
            bytes: None,
            added: None,
            links,
        })
    }

    async fn unrestrict(&self, link: &str) -> Result<DirectLink> {
        self.record(format!("unrestrict:{}", link));
        if self.failing_links.lock().unwrap().contains(link) {
            return Err(Self::remote("hoster_unavailable"));
        }
        let n = self.unrestrict_counter.fetch_add(1, Ordering::SeqCst);
        Ok(DirectLink {
            url: format!("https://dl.example/{}?n={}", link, n),
            filename: None,
            filesize: None,
        })
    }

    async fn list_torrents(&self) -> Result<Vec<RemoteTorrent>> {
        self.record("list".to_string());
        Ok(Vec::new())
    }
}
