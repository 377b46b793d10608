// src/services/news.rs

//! News source seam and shared post-body handling.
//!
//! A news source lists recent posts on its platform, decides which of
//! them are new or changed relative to the stored records, and returns
//! fully built posts for those. Listing everything (`discovered`) and
//! fetching details only for changes keeps polls cheap: unchanged
//! posts never cost a detail request.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use regex::Regex;
use scraper::{Html, Node};
use serde_json::Value;

use crate::error::Result;
use crate::models::{NewsConfig, NewsPost, NewsRecord};
use crate::utils::http::PageSource;

use super::{GryphlineSource, HoyolabSource};

/// What one poll of a source produced.
#[derive(Debug)]
pub struct NewsPoll {
    /// Every post listed, as (composite key, effective timestamp)
    pub discovered: Vec<(String, i64)>,
    /// Full posts for the new or changed subset
    pub items: Vec<NewsPost>,
}

/// One game's news feed on one platform.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn platform(&self) -> &str;

    fn game(&self) -> &str;

    /// Embed accent color for this game's posts.
    fn color(&self) -> u32;

    /// List recent posts and build the new or changed ones.
    async fn poll(
        &self,
        http: &dyn PageSource,
        known: &HashMap<String, NewsRecord>,
    ) -> Result<NewsPoll>;
}

/// Build one source per configured game.
///
/// Platforms are validated at config load, so an unknown platform here
/// is unreachable; it falls back to skipping the entry.
pub fn build_sources(news: &NewsConfig) -> Vec<Box<dyn NewsSource>> {
    news.games
        .iter()
        .filter_map(|game| match game.platform.as_str() {
            "hoyolab" => {
                Some(Box::new(HoyolabSource::new(game, news)) as Box<dyn NewsSource>)
            }
            "gryphline" => {
                Some(Box::new(GryphlineSource::new(game, news)) as Box<dyn NewsSource>)
            }
            other => {
                log::warn!("Unknown news platform '{other}' for '{}'", game.game);
                None
            }
        })
        .collect()
}

/// Read a field as a string, accepting JSON numbers. Platform APIs
/// serve identifiers as either without warning.
pub(crate) fn field_str(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Read a field as an integer, accepting stringified numbers.
pub(crate) fn field_i64(value: &Value, key: &str) -> i64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Unix seconds to an RFC 3339 timestamp.
pub(crate) fn ts_to_rfc3339(ts: i64) -> Option<String> {
    Utc.timestamp_opt(ts, 0).single().map(|dt| dt.to_rfc3339())
}

fn multi_newline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex is valid"))
}

fn multi_space() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]{2,}").expect("static regex is valid"))
}

fn descendant_text(node: ego_tree::NodeRef<'_, Node>) -> String {
    let mut text = String::new();
    for child in node.children() {
        match child.value() {
            Node::Text(t) => text.push_str(&t),
            Node::Element(_) => text.push_str(&descendant_text(child)),
            _ => {}
        }
    }
    text
}

fn render_node(node: ego_tree::NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&text),
        Node::Element(element) => match element.name() {
            "script" | "style" | "head" => {}
            "br" => out.push('\n'),
            "p" | "div" => {
                render_children(node, out);
                out.push_str("\n\n");
            }
            "li" => {
                out.push_str("• ");
                render_children(node, out);
                out.push('\n');
            }
            "a" => {
                let href = element.attr("href").unwrap_or("").trim();
                let label = descendant_text(node).trim().to_string();
                match (label.is_empty(), href.is_empty()) {
                    (false, false) => out.push_str(&format!("{label} ({href})")),
                    (false, true) => out.push_str(&label),
                    (true, false) => out.push_str(href),
                    (true, true) => {}
                }
            }
            "img" => {
                let src = element.attr("src").unwrap_or("").trim();
                match element.attr("alt").map(str::trim).filter(|a| !a.is_empty()) {
                    Some(alt) => out.push_str(&format!("[img: {alt} — {src}]")),
                    None => out.push_str(&format!("[img: {src}]")),
                }
            }
            _ => render_children(node, out),
        },
        _ => {}
    }
}

fn render_children(node: ego_tree::NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        render_node(child, out);
    }
}

/// Convert a post body from HTML to readable plain text.
///
/// Paragraphs become blank-line separated blocks, list items become
/// bullets, links keep their target as `label (href)`, and images are
/// kept as `[img: …]` placeholders so the reader knows one was there.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_children(fragment.tree.root(), &mut out);

    let text = out
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ");
    let text = multi_newline().replace_all(&text, "\n\n");
    let text = multi_space().replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsGameInfo;

    #[test]
    fn paragraphs_and_breaks_become_newlines() {
        let text = html_to_text("<p>First</p><p>Second<br>line</p>");
        assert_eq!(text, "First\n\nSecond\nline");
    }

    #[test]
    fn list_items_become_bullets() {
        let text = html_to_text("<ul><li>One</li><li>Two</li></ul>");
        assert_eq!(text, "• One\n• Two");
    }

    #[test]
    fn links_keep_their_target() {
        let text = html_to_text(r#"<p>See <a href="https://x.test/a">the notice</a>.</p>"#);
        assert_eq!(text, "See the notice (https://x.test/a).");
    }

    #[test]
    fn images_become_placeholders() {
        let text = html_to_text(r#"<img src="https://img.test/1.png" alt="Banner">"#);
        assert_eq!(text, "[img: Banner — https://img.test/1.png]");

        let text = html_to_text(r#"<img src="https://img.test/2.png">"#);
        assert_eq!(text, "[img: https://img.test/2.png]");
    }

    #[test]
    fn entities_are_decoded_and_whitespace_collapsed() {
        let text = html_to_text("<p>Fate&nbsp;&amp;   Fortune</p>\n\n\n<p>End</p>");
        assert_eq!(text, "Fate & Fortune\n\nEnd");
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("   "), "");
    }

    #[test]
    fn json_fields_accept_numbers_and_strings() {
        let value = serde_json::json!({"id": 42, "ts": "1700000000"});
        assert_eq!(field_str(&value, "id"), "42");
        assert_eq!(field_i64(&value, "ts"), 1_700_000_000);
        assert_eq!(field_i64(&value, "missing"), 0);
    }

    #[test]
    fn timestamps_render_with_utc_offset() {
        assert_eq!(
            ts_to_rfc3339(0).as_deref(),
            Some("1970-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn sources_are_built_per_configured_game() {
        let news = NewsConfig::default();
        let sources = build_sources(&news);
        assert_eq!(sources.len(), news.games.len());

        let platforms: Vec<&str> = sources.iter().map(|s| s.platform()).collect();
        assert!(platforms.contains(&"hoyolab"));
        assert!(platforms.contains(&"gryphline"));
    }

    #[test]
    fn unknown_platform_is_dropped() {
        let news = NewsConfig {
            games: vec![NewsGameInfo {
                game: "mystery".to_string(),
                platform: "mystery-net".to_string(),
                gids: 0,
                categories: Vec::new(),
                tabs: Vec::new(),
                color: 0,
            }],
            ..NewsConfig::default()
        };
        assert!(build_sources(&news).is_empty());
    }
}
