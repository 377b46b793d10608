// src/services/gryphline.rs

//! Gryphline news source.
//!
//! The Endfield site has no public API; its news pages are Next.js
//! pages that stream state through `self.__next_f.push([...])` script
//! calls. The bulletin list and each post's body are JSON objects
//! embedded in those payload strings, recovered by scanning for a key
//! and walking braces back out to a balanced object.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::models::{NewsConfig, NewsGameInfo, NewsPost, NewsRecord, composite_key};
use crate::utils::http::PageSource;

use super::news::{NewsPoll, NewsSource, field_i64, field_str, html_to_text, ts_to_rfc3339};

const SITE_BASE: &str = "https://endfield.gryphline.com";
const DEFAULT_AUTHOR: &str = "Arknights: Endfield";

fn push_payload() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"self\.__next_f\.push\((\[[^\n]+?\])\)").expect("static regex is valid")
    })
}

/// Balanced JSON object enclosing the first occurrence of `needle`.
///
/// Brace counting ignores braces inside string literals, which the
/// site's payloads do not produce around the objects we need.
fn find_json_object<'a>(text: &'a str, needle: &str) -> Option<&'a str> {
    let at = text.find(needle)?;
    let start = text[..at].rfind('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse every payload string containing `needle` into a JSON value.
fn extract_json_blocks(html: &str, needle: &str) -> Vec<Value> {
    let mut blocks = Vec::new();
    for caps in push_payload().captures_iter(html) {
        let Ok(payload) = serde_json::from_str::<Value>(&caps[1]) else {
            continue;
        };
        let Some(parts) = payload.as_array() else {
            continue;
        };
        for part in parts {
            let Some(text) = part.as_str() else {
                continue;
            };
            if !text.contains(needle) {
                continue;
            }
            if let Some(object) = find_json_object(text, needle) {
                if let Ok(value) = serde_json::from_str(object) {
                    blocks.push(value);
                }
            }
        }
    }
    blocks
}

pub struct GryphlineSource {
    game: String,
    tabs: Vec<String>,
    language: String,
    color: u32,
}

impl GryphlineSource {
    pub fn new(info: &NewsGameInfo, news: &NewsConfig) -> Self {
        Self {
            game: info.game.clone(),
            tabs: info.tabs.clone(),
            language: news.language.clone(),
            color: info.color,
        }
    }

    fn list_url(&self) -> String {
        format!("{SITE_BASE}/{}/news", self.language)
    }

    fn detail_url(&self, cid: &str) -> String {
        format!("{SITE_BASE}/{}/news/{cid}", self.language)
    }

    fn bulletins(&self, html: &str) -> Vec<Value> {
        for block in extract_json_blocks(html, "\"bulletins\"") {
            if let Some(list) = block.get("bulletins").and_then(Value::as_array) {
                return list.clone();
            }
        }
        Vec::new()
    }

    fn build_post(&self, cid: &str, detail: &Value, effective_ts: i64) -> NewsPost {
        let author = field_str(detail, "author");
        let tab = field_str(detail, "tab");
        let display = field_i64(detail, "displayTime");
        let image = detail
            .get("cover")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        NewsPost {
            platform: "gryphline".to_string(),
            game: self.game.clone(),
            id: cid.to_string(),
            url: self.detail_url(cid),
            title: field_str(detail, "title"),
            author: Some(if author.is_empty() {
                DEFAULT_AUTHOR.to_string()
            } else {
                author
            }),
            content: html_to_text(&field_str(detail, "data")),
            category: if tab.is_empty() {
                "news".to_string()
            } else {
                tab
            },
            published: ts_to_rfc3339(if display > 0 { display } else { effective_ts }),
            updated: None,
            image,
            effective_ts,
        }
    }
}

#[async_trait]
impl NewsSource for GryphlineSource {
    fn platform(&self) -> &str {
        "gryphline"
    }

    fn game(&self) -> &str {
        &self.game
    }

    fn color(&self) -> u32 {
        self.color
    }

    async fn poll(
        &self,
        http: &dyn PageSource,
        known: &HashMap<String, NewsRecord>,
    ) -> Result<NewsPoll> {
        let listing = http.fetch(&self.list_url()).await?;

        let mut discovered = Vec::new();
        let mut to_fetch = Vec::new();
        for bulletin in self.bulletins(&listing) {
            let tab = field_str(&bulletin, "tab");
            if !self.tabs.iter().any(|allowed| allowed == &tab) {
                continue;
            }
            let cid = field_str(&bulletin, "cid");
            if cid.is_empty() {
                continue;
            }
            let ts = field_i64(&bulletin, "displayTime");

            let key = composite_key("gryphline", &self.game, &cid);
            discovered.push((key.clone(), ts));

            let changed = known
                .get(&key)
                .is_none_or(|record| ts > record.last_modified);
            if changed {
                to_fetch.push((cid, ts));
            }
        }

        let mut items = Vec::new();
        for (cid, effective_ts) in to_fetch {
            let page = http.fetch(&self.detail_url(&cid)).await?;
            let detail = extract_json_blocks(&page, "\"data\"")
                .into_iter()
                .find(|block| field_str(block, "cid") == cid && block.get("data").is_some());
            match detail {
                Some(detail) => items.push(self.build_post(&cid, &detail, effective_ts)),
                None => {
                    log::warn!("Bulletin {cid} detail payload not found, skipping");
                }
            }
        }

        Ok(NewsPoll { discovered, items })
    }
}
