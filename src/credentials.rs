//! Persistent slot for the Real-Debrid bearer token.
//!
//! The token lives in a small TOML file next to the config. The in-memory copy
//! is held by a `watch` channel so that every consumer holding a receiver sees
//! updates as soon as `set` returns, without re-reading the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    current: watch::Sender<Option<String>>,
}

impl CredentialStore {
    /// Open the store at `path`, loading the persisted token if one exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = Self::read_file(&path)?;

        if token.is_some() {
            debug!(path = %path.display(), "Loaded API token");
        } else {
            debug!(path = %path.display(), "No API token stored");
        }

        let (current, _) = watch::channel(token);
        Ok(Self { path, current })
    }

    /// Last token set, if any.
    pub fn get(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    pub fn is_set(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Persist `token` and publish it to every subscriber.
    pub fn set(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Credential("API token cannot be empty".to_string()));
        }

        Self::write_file(
            &self.path,
            &CredentialFile {
                token: Some(token.to_string()),
            },
        )?;
        self.current.send_replace(Some(token.to_string()));
        info!("API token updated");
        Ok(())
    }

    /// Use `token` for this process only, leaving the file untouched.
    pub fn set_ephemeral(&self, token: &str) {
        let token = token.trim();
        if !token.is_empty() {
            self.current.send_replace(Some(token.to_string()));
        }
    }

    /// Remove the persisted token.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                Error::Credential(format!("Failed to remove {:?}: {}", self.path, e))
            })?;
        }
        self.current.send_replace(None);
        info!("API token cleared");
        Ok(())
    }

    /// Receiver that observes every later `set`/`clear`.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.current.subscribe()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Credential(format!("Failed to read {:?}: {}", path, e)))?;
        let file: CredentialFile = toml::from_str(&content)
            .map_err(|e| Error::Credential(format!("Failed to parse {:?}: {}", path, e)))?;

        Ok(file.token.filter(|t| !t.trim().is_empty()))
    }

    fn write_file(path: &Path, file: &CredentialFile) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Credential(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let content = toml::to_string(file)
            .map_err(|e| Error::Credential(format!("Failed to serialize token: {}", e)))?;

        // Write to a sibling and rename so a reader never sees half a token.
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content)
            .map_err(|e| Error::Credential(format!("Failed to write {:?}: {}", tmp, e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)) {
                warn!(
                    path = %tmp.display(),
                    error = %e,
                    "Could not restrict token file permissions"
                );
            }
        }

        fs::rename(&tmp, path)
            .map_err(|e| Error::Credential(format!("Failed to write {:?}: {}", path, e)))?;
        Ok(())
    }
}

/// Show only the edges of a token.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}
