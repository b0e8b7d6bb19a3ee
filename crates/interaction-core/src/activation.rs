use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("writing state file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Per-conversation on/off switch backed by a small JSON file.
///
/// Only deactivated conversations are stored (as `false`); a missing entry
/// means active. The whole file is rewritten after every change.
#[derive(Debug)]
pub struct ActivationStore {
    path: PathBuf,
    disabled: RwLock<BTreeMap<String, bool>>,
}

impl ActivationStore {
    /// Load the snapshot at `path`. A missing or unreadable file yields an
    /// empty store, so every conversation starts active.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let disabled = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, bool>>(&raw) {
                Ok(map) => {
                    let map: BTreeMap<_, _> = map.into_iter().filter(|(_, on)| !on).collect();
                    info!(file = %path.display(), disabled = map.len(), "Loaded conversation states");
                    map
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "State file is corrupt; starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(file = %path.display(), "No state file yet; starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to read state file; starting empty");
                BTreeMap::new()
            }
        };
        Self {
            path,
            disabled: RwLock::new(disabled),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_active(&self, conversation: &str) -> bool {
        !self.disabled.read().await.contains_key(conversation)
    }

    /// Switch a conversation on (entry removed) or off (entry set to `false`)
    /// and flush. A failed flush is logged and returned, but the in-memory
    /// state keeps the change.
    pub async fn set_active(&self, conversation: &str, active: bool) -> Result<(), StateError> {
        let snapshot = {
            let mut guard = self.disabled.write().await;
            if active {
                guard.remove(conversation);
            } else {
                guard.insert(conversation.to_owned(), false);
            }
            guard.clone()
        };
        let result = self.flush(&snapshot).await;
        match &result {
            Ok(()) => info!(conversation, active, file = %self.path.display(), "Saved conversation states"),
            Err(e) => warn!(conversation, active, error = %e, "Failed to save conversation states"),
        }
        result
    }

    async fn flush(&self, snapshot: &BTreeMap<String, bool>) -> Result<(), StateError> {
        let data = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|source| StateError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
