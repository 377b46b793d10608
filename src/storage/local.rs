// src/storage/local.rs

//! Local filesystem state store.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//! ├── state.json        # per-feed item snapshots + last-updated markers
//! ├── message_ids.json  # per-feed published message handles
//! └── news_state.json   # per-item news publish state (composite keys)
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{FeedState, MessageHandles, NewsRecord};
use crate::storage::StateStore;

const STATE_FILE: &str = "state.json";
const HANDLES_FILE: &str = "message_ids.json";
const NEWS_STATE_FILE: &str = "news_state.json";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStateStore {
    root_dir: PathBuf,
}

impl LocalStateStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read a JSON document, treating a corrupt file as absent.
    ///
    /// Losing the snapshot means one noisier run; aborting every run
    /// on a half-written file would be worse.
    async fn read_json_lenient<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Ok(Some(value)),
                Err(error) => {
                    log::warn!("Ignoring corrupt {key}: {error}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load_states(&self) -> Result<HashMap<String, FeedState>> {
        Ok(self.read_json_lenient(STATE_FILE).await?.unwrap_or_default())
    }

    async fn save_states(&self, states: &HashMap<String, FeedState>) -> Result<()> {
        self.write_json(STATE_FILE, states).await
    }

    async fn load_handles(&self) -> Result<HashMap<String, MessageHandles>> {
        Ok(self
            .read_json_lenient(HANDLES_FILE)
            .await?
            .unwrap_or_default())
    }

    async fn save_handles(&self, handles: &HashMap<String, MessageHandles>) -> Result<()> {
        self.write_json(HANDLES_FILE, handles).await
    }

    async fn load_news_state(&self) -> Result<HashMap<String, NewsRecord>> {
        Ok(self
            .read_json_lenient(NEWS_STATE_FILE)
            .await?
            .unwrap_or_default())
    }

    async fn save_news_state(&self, state: &HashMap<String, NewsRecord>) -> Result<()> {
        self.write_json(NEWS_STATE_FILE, state).await
    }
}
