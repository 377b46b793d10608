// src/services/hoyolab.rs

//! HoYoLAB news source.
//!
//! Talks to the community API: `getNewsList` per category to discover
//! recent posts, `getPostFull` for the body of new or changed ones.
//! Every response wraps its payload in `{retcode, message, data}`;
//! a non-zero retcode is a hard failure. Post bodies sometimes carry
//! only a language code in `content`, in which case the real body
//! lives in `structured_content` as a list of editor operations.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{NewsConfig, NewsGameInfo, NewsPost, NewsRecord, composite_key};
use crate::utils::http::PageSource;

use super::news::{NewsPoll, NewsSource, field_i64, field_str, html_to_text, ts_to_rfc3339};

const API_BASE: &str = "https://bbs-api-os.hoyolab.com/community/post/wapi";
const ARTICLE_BASE: &str = "https://www.hoyolab.com/article";

/// Post bodies whose `content` is a bare language code defer to
/// `structured_content`.
fn language_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}-[a-z]{2}$").expect("static regex is valid"))
}

fn category_label(official_type: Option<i64>) -> &'static str {
    match official_type {
        Some(1) => "notices",
        Some(2) => "events",
        _ => "info",
    }
}

/// Expand editor operations into simple HTML for the text converter.
fn expand_structured(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    // Newlines inside operation text are literal; fold them to breaks
    // before parsing so they survive the round trip.
    let prepared = raw.replace("\\n", "<br>").replace('\n', "<br>");
    let Ok(ops) = serde_json::from_str::<Value>(&prepared) else {
        return String::new();
    };
    let Some(ops) = ops.as_array() else {
        return String::new();
    };

    let mut out = String::new();
    for op in ops {
        let attrs = op.get("attributes");
        match op.get("insert") {
            Some(Value::String(text)) => {
                if let Some(link) = attrs.and_then(|a| a.get("link")).and_then(Value::as_str) {
                    out.push_str(&format!("<p><a href=\"{link}\">{text}</a></p>"));
                } else if attrs.and_then(|a| a.get("bold")).is_some() {
                    out.push_str(&format!("<p><strong>{text}</strong></p>"));
                } else if attrs.and_then(|a| a.get("italic")).is_some() {
                    out.push_str(&format!("<p><em>{text}</em></p>"));
                } else {
                    out.push_str(&format!("<p>{text}</p>"));
                }
            }
            Some(Value::Object(insert)) => {
                if let Some(image) = insert.get("image").and_then(Value::as_str) {
                    out.push_str(&format!("<img src=\"{image}\">"));
                }
                if let Some(video) = insert.get("video").and_then(Value::as_str) {
                    out.push_str(&format!("<iframe src=\"{video}\"></iframe>"));
                }
            }
            _ => {}
        }
    }
    out
}

/// Resolve the HTML body of a post from its detail payload.
fn transform_content(inner: &Value, video: Option<&Value>) -> String {
    let mut content = field_str(inner, "content");
    if language_code().is_match(content.trim()) {
        content = expand_structured(&field_str(inner, "structured_content"));
    }

    // View type 5 is a video post; its content field is unusable.
    if field_i64(inner, "view_type") == 5 {
        if let Some(video) = video.filter(|v| !v.is_null()) {
            let url = video.get("url").and_then(Value::as_str).unwrap_or("");
            let cover = video.get("cover").and_then(Value::as_str).unwrap_or("");
            let desc = field_str(inner, "desc");
            content = format!(
                "<video src=\"{url}\" poster=\"{cover}\" controls playsinline>\
                 Watch the video here: {url}</video><p>{desc}</p>"
            );
        }
    }

    for prefix in ["<p></p>", "<p>&nbsp;</p>", "<p><br></p>"] {
        if content.starts_with(prefix) {
            if let Some((_, tail)) = content.split_once("</p>") {
                content = tail.to_string();
            }
            break;
        }
    }

    // Private upload hosts reject hotlinking; the public mirror serves
    // the same paths.
    content.replace("hoyolab-upload-private", "upload-os-bbs")
}

pub struct HoyolabSource {
    game: String,
    gids: u32,
    categories: Vec<u32>,
    language: String,
    page_size: u32,
    color: u32,
}

impl HoyolabSource {
    pub fn new(info: &NewsGameInfo, news: &NewsConfig) -> Self {
        Self {
            game: info.game.clone(),
            gids: info.gids,
            categories: info.categories.clone(),
            language: news.language.clone(),
            page_size: news.page_size,
            color: info.color,
        }
    }

    fn headers(&self) -> [(&str, &str); 2] {
        [
            ("Origin", "https://www.hoyolab.com"),
            ("X-Rpc-Language", self.language.as_str()),
        ]
    }

    /// Call an API endpoint and unwrap its `data` payload.
    async fn api_call(&self, http: &dyn PageSource, url: &str) -> Result<Value> {
        let body = http.fetch_with_headers(url, &self.headers()).await?;
        let value: Value = serde_json::from_str(&body)?;

        let retcode = value.get("retcode").and_then(Value::as_i64).unwrap_or(-1);
        if retcode != 0 {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(AppError::scrape(url, format!("retcode {retcode}: {message}")));
        }

        Ok(value.get("data").cloned().unwrap_or(Value::Null))
    }

    fn build_post(&self, outer: &Value, effective_ts: i64) -> Option<NewsPost> {
        let inner = outer.get("post")?;
        let id = field_str(inner, "post_id");
        if id.is_empty() {
            return None;
        }

        let author = outer
            .get("user")
            .and_then(|user| user.get("nickname"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let image = outer
            .get("cover_list")
            .and_then(Value::as_array)
            .and_then(|covers| covers.first())
            .and_then(|cover| cover.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let created = field_i64(inner, "created_at");
        let modified = field_i64(outer, "last_modify_time");
        let official_type = inner.get("official_type").and_then(Value::as_i64);
        let content = html_to_text(&transform_content(inner, outer.get("video")));

        Some(NewsPost {
            platform: "hoyolab".to_string(),
            game: self.game.clone(),
            url: format!("{ARTICLE_BASE}/{id}"),
            title: field_str(inner, "subject"),
            author,
            content,
            category: category_label(official_type).to_string(),
            published: ts_to_rfc3339(if created > 0 { created } else { effective_ts }),
            updated: (modified > 0).then(|| ts_to_rfc3339(modified)).flatten(),
            image,
            effective_ts,
            id,
        })
    }
}

#[async_trait]
impl NewsSource for HoyolabSource {
    fn platform(&self) -> &str {
        "hoyolab"
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
        let mut discovered = Vec::new();
        // Posts can appear in several categories; fetch each changed
        // post once, at its newest timestamp.
        let mut to_fetch: HashMap<String, i64> = HashMap::new();

        for category in &self.categories {
            let url = format!(
                "{API_BASE}/getNewsList?gids={}&type={}&page_size={}",
                self.gids, category, self.page_size
            );
            let data = self.api_call(http, &url).await?;
            let Some(list) = data.get("list").and_then(Value::as_array) else {
                continue;
            };

            for item in list {
                let Some(post) = item.get("post") else {
                    continue;
                };
                let post_id = field_str(post, "post_id");
                if post_id.is_empty() {
                    continue;
                }

                let created = field_i64(post, "created_at");
                let modified = field_i64(item, "last_modify_time");
                let effective_ts = created.max(modified);

                let key = composite_key("hoyolab", &self.game, &post_id);
                discovered.push((key.clone(), effective_ts));

                let changed = known
                    .get(&key)
                    .is_none_or(|record| effective_ts > record.last_modified);
                if changed {
                    let entry = to_fetch.entry(post_id).or_insert(effective_ts);
                    *entry = (*entry).max(effective_ts);
                }
            }
        }

        let mut items = Vec::new();
        for (post_id, effective_ts) in to_fetch {
            let url = format!("{API_BASE}/getPostFull?gids={}&post_id={post_id}", self.gids);
            let data = self.api_call(http, &url).await?;
            let Some(detail) = data.get("post") else {
                continue;
            };
            if let Some(post) = self.build_post(detail, effective_ts) {
                items.push(post);
            }
        }

        Ok(NewsPoll { discovered, items })
    }
}
