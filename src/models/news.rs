// src/models/news.rs

//! News post model and per-item publish state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One news item discovered from a platform API.
///
/// Unlike event-page items, news identity is the
/// `platform:game:id` composite, not the display label: APIs hand us
/// stable post identifiers, and titles get edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsPost {
    /// Source platform ("hoyolab", "gryphline")
    pub platform: String,
    /// Game key within the platform
    pub game: String,
    /// Platform-assigned post identifier
    pub id: String,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    /// Plain-text body, already converted from the platform's markup
    pub content: String,
    /// Platform category ("notices", "events", "info", ...)
    pub category: String,
    /// RFC 3339 publication timestamp, when the platform provides one
    pub published: Option<String>,
    /// RFC 3339 last-modification timestamp
    pub updated: Option<String>,
    /// Cover/thumbnail image URL
    pub image: Option<String>,
    /// Unix timestamp used for new/updated comparisons
    pub effective_ts: i64,
}

impl NewsPost {
    /// Composite identity key: `platform:game:id`.
    pub fn identity_key(&self) -> String {
        composite_key(&self.platform, &self.game, &self.id)
    }

    /// Content hash over the publish-relevant fields.
    ///
    /// A post is re-published only when this hash differs from the one
    /// recorded at the last successful send.
    pub fn content_hash(&self) -> String {
        let payload = format!(
            "{}|{}|{}|{}",
            self.title,
            self.url,
            self.content,
            self.updated.as_deref().unwrap_or("")
        );
        let digest = Sha256::digest(payload.as_bytes());
        hex::encode(digest)
    }
}

/// Build the composite identity key for a news item.
pub fn composite_key(platform: &str, game: &str, id: &str) -> String {
    format!("{platform}:{game}:{id}")
}

/// Persisted state for one news item.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NewsRecord {
    /// Effective timestamp at the last state update
    #[serde(default)]
    pub last_modified: i64,

    /// Content hash at the last successful send; empty when the item
    /// was only baselined and never published
    #[serde(default)]
    pub last_sent_hash: String,
}

impl NewsRecord {
    /// Baseline entry for an item seen but not yet published.
    pub fn baseline(last_modified: i64) -> Self {
        Self {
            last_modified,
            last_sent_hash: String::new(),
        }
    }

    /// Entry recorded after a successful send.
    pub fn sent(last_modified: i64, hash: String) -> Self {
        Self {
            last_modified,
            last_sent_hash: hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, updated: Option<&str>) -> NewsPost {
        NewsPost {
            platform: "hoyolab".to_string(),
            game: "genshin".to_string(),
            id: "12345".to_string(),
            url: "https://www.hoyolab.com/article/12345".to_string(),
            title: title.to_string(),
            author: None,
            content: "Version 5.4 is live.".to_string(),
            category: "notices".to_string(),
            published: None,
            updated: updated.map(str::to_string),
            image: None,
            effective_ts: 1_700_000_000,
        }
    }

    #[test]
    fn identity_key_is_platform_game_id() {
        assert_eq!(
            post("Update Notice", None).identity_key(),
            "hoyolab:genshin:12345"
        );
    }

    #[test]
    fn content_hash_is_stable_for_identical_posts() {
        assert_eq!(
            post("Update Notice", None).content_hash(),
            post("Update Notice", None).content_hash()
        );
    }

    #[test]
    fn content_hash_changes_with_title_or_updated() {
        let base = post("Update Notice", None);
        assert_ne!(base.content_hash(), post("Edited Notice", None).content_hash());
        assert_ne!(
            base.content_hash(),
            post("Update Notice", Some("2026-08-29T00:00:00+00:00")).content_hash()
        );
    }

    #[test]
    fn baseline_record_has_empty_hash() {
        let record = NewsRecord::baseline(42);
        assert_eq!(record.last_modified, 42);
        assert!(record.last_sent_hash.is_empty());
    }
}
