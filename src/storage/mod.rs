// src/storage/mod.rs

//! Persistent state for feed snapshots and published message handles.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FeedState, MessageHandles, NewsRecord};

mod local;

pub use local::LocalStateStore;

/// Storage backend for run-to-run state.
///
/// Three documents are tracked: the per-feed item snapshot (with the
/// site's last-updated marker), the per-feed published message handles
/// used for edit-in-place, and the per-item news publish state keyed
/// by `platform:game:id`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load all feed snapshots. A missing or corrupt file yields an
    /// empty map so a run can proceed as a cold start.
    async fn load_states(&self) -> Result<HashMap<String, FeedState>>;

    async fn save_states(&self, states: &HashMap<String, FeedState>) -> Result<()>;

    /// Load the published message handles per feed key.
    async fn load_handles(&self) -> Result<HashMap<String, MessageHandles>>;

    async fn save_handles(&self, handles: &HashMap<String, MessageHandles>) -> Result<()>;

    /// Load the per-item news publish state.
    async fn load_news_state(&self) -> Result<HashMap<String, NewsRecord>>;

    async fn save_news_state(&self, state: &HashMap<String, NewsRecord>) -> Result<()>;
}
