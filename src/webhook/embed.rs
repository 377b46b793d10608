// src/webhook/embed.rs

//! Embed construction: the aggregate run summary and per-post news embeds.

use chrono::Utc;
use serde::Serialize;

use crate::models::{FeedStatus, NewsPost, RunResult, RunSummary};

/// Embed field limit imposed by the webhook API.
const MAX_FIELDS: usize = 25;
/// Title character limit imposed by the webhook API.
const MAX_TITLE: usize = 256;
/// Description character limit imposed by the webhook API.
const MAX_DESCRIPTION: usize = 4096;

const COLOR_OK: u32 = 0x2ECC71;
const COLOR_IDLE: u32 = 0xE67E22;

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

fn field_value(result: &RunResult) -> String {
    match result.status {
        FeedStatus::Skipped => {
            format!("⚠️ Skipped (missing secret `{}`)", result.webhook_env)
        }
        FeedStatus::Failed => result.delta_summary.clone(),
        FeedStatus::Ok => format!(
            "Action: **{}** · Messages: **{}** · Items: **{}**\nLast updated: {}\n{}\n[Source](<{}>)",
            result.action.as_str(),
            result.messages,
            result.items,
            result.last_updated,
            result.delta_summary,
            result.url,
        ),
    }
}

fn status_emoji(status: FeedStatus) -> &'static str {
    match status {
        FeedStatus::Ok => "✅",
        FeedStatus::Skipped => "⏭️",
        FeedStatus::Failed => "❌",
    }
}

/// Truncate to a character count, never splitting a code point.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Fit post content into the description limit. Content that overflows
/// is cut and finished with a link back to the full post.
fn news_description(content: &str, url: &str) -> String {
    if content.chars().count() <= MAX_DESCRIPTION {
        return content.to_string();
    }
    let suffix = format!("\n\nRead more: {url}");
    let keep = MAX_DESCRIPTION.saturating_sub(suffix.chars().count());
    format!("{}{}", truncate_chars(content, keep).trim_end(), suffix)
}

/// Build the aggregate run embed from the per-feed results.
pub fn build_summary_embed(results: &[RunResult], summary: &RunSummary) -> Embed {
    let description = format!(
        "✅ OK: **{}** · 🆕 Created: **{}** · ✏️ Edited: **{}** · ⏭️ Skipped: **{}** · ❌ Failed: **{}** · Total: **{}**",
        summary.ok, summary.created, summary.edited, summary.skipped, summary.failed, summary.total,
    );

    let fields = results
        .iter()
        .take(MAX_FIELDS)
        .map(|result| EmbedField {
            name: format!("{} {}", status_emoji(result.status), result.title),
            value: field_value(result),
            inline: true,
        })
        .collect();

    Embed {
        title: "Gazette Updates".to_string(),
        description,
        url: None,
        color: if summary.ok > 0 { COLOR_OK } else { COLOR_IDLE },
        fields,
        author: None,
        thumbnail: None,
        footer: Some(EmbedFooter {
            text: "gazette run summary".to_string(),
        }),
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Build the embed for a single news post.
pub fn build_news_embed(post: &NewsPost, color: u32) -> Embed {
    Embed {
        title: truncate_chars(&post.title, MAX_TITLE).to_string(),
        description: news_description(&post.content, &post.url),
        url: Some(post.url.clone()),
        color,
        fields: Vec::new(),
        author: post
            .author
            .as_ref()
            .map(|name| EmbedAuthor { name: name.clone() }),
        thumbnail: post
            .image
            .as_ref()
            .map(|url| EmbedThumbnail { url: url.clone() }),
        footer: Some(EmbedFooter {
            text: format!("{} · {}", post.category, post.game),
        }),
        timestamp: post
            .published
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
    }
}

/// Role mentions for feeds that changed this run, deduplicated and sorted.
pub fn collect_mentions(results: &[RunResult]) -> Option<String> {
    let mut mentions: Vec<&str> = results
        .iter()
        .filter(|r| r.has_changes)
        .filter_map(|r| r.role_mention.as_deref())
        .collect();
    mentions.sort_unstable();
    mentions.dedup();
    if mentions.is_empty() {
        None
    } else {
        Some(mentions.join(" "))
    }
}
