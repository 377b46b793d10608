// src/models/summary.rs

//! Per-feed run results and the aggregate run summary.

use serde::{Deserialize, Serialize};

/// Terminal status of one feed's pipeline within a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    /// Pipeline completed and the feed was published
    Ok,
    /// Feed had no configured webhook; nothing was fetched
    Skipped,
    /// Pipeline failed after retries; other feeds continue
    Failed,
}

/// What the publisher did with the feed's remote messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishAction {
    Created,
    Edited,
    None,
}

impl PublishAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Edited => "edited",
            Self::None => "none",
        }
    }
}

/// Outcome of one feed's pipeline, used only to build the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub key: String,
    pub title: String,
    pub url: String,
    pub webhook_env: String,
    pub status: FeedStatus,
    pub action: PublishAction,
    /// Number of outbound messages now representing the feed
    pub messages: usize,
    /// Number of items in the rendered snapshot
    pub items: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub has_changes: bool,
    /// Site-reported last-updated marker, or "n/a"
    pub last_updated: String,
    /// Human-readable delta line for the summary embed
    pub delta_summary: String,
    /// Role mention string for changed-feed pings, if configured
    pub role_mention: Option<String>,
}

impl RunResult {
    /// Build the placeholder result for a feed with no configured webhook.
    pub fn skipped(key: &str, title: &str, url: &str, webhook_env: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            webhook_env: webhook_env.to_string(),
            status: FeedStatus::Skipped,
            action: PublishAction::None,
            messages: 0,
            items: 0,
            added: 0,
            removed: 0,
            modified: 0,
            has_changes: false,
            last_updated: "n/a".to_string(),
            delta_summary: "n/a".to_string(),
            role_mention: None,
        }
    }

    /// Build the result for a feed whose pipeline failed.
    pub fn failed(key: &str, title: &str, url: &str, webhook_env: &str, error: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            webhook_env: webhook_env.to_string(),
            status: FeedStatus::Failed,
            action: PublishAction::None,
            messages: 0,
            items: 0,
            added: 0,
            removed: 0,
            modified: 0,
            has_changes: false,
            last_updated: "n/a".to_string(),
            delta_summary: format!("Failed: {error}"),
            role_mention: None,
        }
    }
}

/// Aggregate counts for one full run across all feeds.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub ok: usize,
    pub created: usize,
    pub edited: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Tally results into aggregate counts.
    pub fn from_results(results: &[RunResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                FeedStatus::Ok => summary.ok += 1,
                FeedStatus::Skipped => summary.skipped += 1,
                FeedStatus::Failed => summary.failed += 1,
            }
            match result.action {
                PublishAction::Created => summary.created += 1,
                PublishAction::Edited => summary.edited += 1,
                PublishAction::None => {}
            }
        }
        summary
    }
}
