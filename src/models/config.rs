// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client behavior settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Message rendering settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Transport retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Environment variable holding the summary webhook URL
    #[serde(default = "defaults::summary_webhook_env")]
    pub summary_webhook_env: String,

    /// Feed definitions
    #[serde(default = "defaults::default_feeds")]
    pub feeds: Vec<FeedInfo>,

    /// News stream settings
    #[serde(default)]
    pub news: NewsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.render.message_limit < 100 {
            return Err(AppError::validation("render.message_limit must be >= 100"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.feeds.is_empty() {
            return Err(AppError::validation("No feeds defined"));
        }
        for feed in &self.feeds {
            if feed.key.trim().is_empty() {
                return Err(AppError::validation("Feed with empty key"));
            }
            if feed.url.trim().is_empty() {
                return Err(AppError::validation(format!("Feed {} has no url", feed.key)));
            }
            if feed.webhook_env.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Feed {} has no webhook_env",
                    feed.key
                )));
            }
        }
        for game in &self.news.games {
            if game.game.trim().is_empty() {
                return Err(AppError::validation("News game with empty name"));
            }
            match game.platform.as_str() {
                "hoyolab" => {
                    if game.gids == 0 {
                        return Err(AppError::validation(format!(
                            "News game {} needs a non-zero gids",
                            game.game
                        )));
                    }
                }
                "gryphline" => {}
                other => {
                    return Err(AppError::validation(format!(
                        "News game {} has unknown platform '{other}'",
                        game.game
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            render: RenderConfig::default(),
            retry: RetryConfig::default(),
            summary_webhook_env: defaults::summary_webhook_env(),
            feeds: defaults::default_feeds(),
            news: NewsConfig::default(),
        }
    }
}

/// News stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Environment variable holding the news webhook URL
    #[serde(default = "defaults::news_webhook_env")]
    pub webhook_env: String,

    /// Platform API language code
    #[serde(default = "defaults::news_language")]
    pub language: String,

    /// Posts requested per category from list endpoints
    #[serde(default = "defaults::news_page_size")]
    pub page_size: u32,

    /// Delay between news embed sends in milliseconds
    #[serde(default = "defaults::news_publish_delay")]
    pub publish_delay_ms: u64,

    /// Games to poll for news
    #[serde(default = "defaults::default_news_games")]
    pub games: Vec<NewsGameInfo>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            webhook_env: defaults::news_webhook_env(),
            language: defaults::news_language(),
            page_size: defaults::news_page_size(),
            publish_delay_ms: defaults::news_publish_delay(),
            games: defaults::default_news_games(),
        }
    }
}

/// One game's news source: which platform API to poll and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsGameInfo {
    /// Game key used in composite identity keys and `--only` filtering
    pub game: String,

    /// Platform API: "hoyolab" or "gryphline"
    pub platform: String,

    /// Platform game identifier (hoyolab only)
    #[serde(default)]
    pub gids: u32,

    /// Category numbers polled from the list endpoint (hoyolab only)
    #[serde(default)]
    pub categories: Vec<u32>,

    /// Bulletin tabs accepted from the news page (gryphline only)
    #[serde(default)]
    pub tabs: Vec<String>,

    /// Embed accent color
    #[serde(default = "defaults::news_color")]
    pub color: u32,
}

/// HTTP client behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between outbound publish calls in milliseconds
    #[serde(default = "defaults::publish_delay")]
    pub publish_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            publish_delay_ms: defaults::publish_delay(),
        }
    }
}

/// Message rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Maximum character count per outbound message
    #[serde(default = "defaults::message_limit")]
    pub message_limit: usize,

    /// Maximum items collected per section by the extractors
    #[serde(default = "defaults::max_items_per_section")]
    pub max_items_per_section: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            message_limit: defaults::message_limit(),
            max_items_per_section: defaults::max_items_per_section(),
        }
    }
}

/// Transport retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt ceiling for server-side error retries
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Base backoff in milliseconds (doubled per attempt)
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,

    /// Upper bound on a rate-limit wait in milliseconds
    #[serde(default = "defaults::rate_limit_cap")]
    pub rate_limit_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            backoff_base_ms: defaults::backoff_base(),
            rate_limit_cap_ms: defaults::rate_limit_cap(),
        }
    }
}

/// One logical feed: a page to scrape and where to publish it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedInfo {
    /// Stable feed key used in state and handle files
    pub key: String,

    /// Page URL to scrape
    pub url: String,

    /// Pretty title used as the message header
    pub title: String,

    /// Environment variable holding the feed's webhook URL
    pub webhook_env: String,

    /// Environment variable holding the role ID to mention on changes
    #[serde(default)]
    pub role_env: Option<String>,

    /// Extractor to use: "auto", "sections", "codes", or "generic"
    #[serde(default = "defaults::extractor")]
    pub extractor: String,
}

mod defaults {
    use super::{FeedInfo, NewsGameInfo};

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; gazette/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn publish_delay() -> u64 {
        500
    }

    // Render defaults
    pub fn message_limit() -> usize {
        2000
    }
    pub fn max_items_per_section() -> usize {
        10
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        4
    }
    pub fn backoff_base() -> u64 {
        500
    }
    pub fn rate_limit_cap() -> u64 {
        10_000
    }

    pub fn summary_webhook_env() -> String {
        "WEBHOOK_URL_SUMMARY".into()
    }

    // News defaults
    pub fn news_webhook_env() -> String {
        "WEBHOOK_URL_NEWS".into()
    }
    pub fn news_language() -> String {
        "en-us".into()
    }
    pub fn news_page_size() -> u32 {
        5
    }
    pub fn news_publish_delay() -> u64 {
        1500
    }
    pub fn news_color() -> u32 {
        0x888888
    }

    pub fn default_news_games() -> Vec<NewsGameInfo> {
        let hoyolab = |game: &str, gids: u32, color: u32| NewsGameInfo {
            game: game.to_string(),
            platform: "hoyolab".to_string(),
            gids,
            categories: vec![1, 2, 3],
            tabs: Vec::new(),
            color,
        };
        vec![
            hoyolab("genshin", 2, 0x00DCDC),
            hoyolab("starrail", 6, 0xDDA000),
            hoyolab("honkai3rd", 1, 0x00BFFF),
            hoyolab("zzz", 8, 0x00FF7F),
            NewsGameInfo {
                game: "endfield".to_string(),
                platform: "gryphline".to_string(),
                gids: 0,
                categories: Vec::new(),
                tabs: vec!["notices".to_string(), "news".to_string()],
                color: 0xFF6347,
            },
        ]
    }

    pub fn extractor() -> String {
        "auto".into()
    }

    // Feed defaults
    pub fn default_feeds() -> Vec<FeedInfo> {
        vec![
            FeedInfo {
                key: "wuthering-waves".to_string(),
                url: "https://game8.co/games/Wuthering-Waves/archives/453473".to_string(),
                title: "Wuthering Waves — Events & Schedule".to_string(),
                webhook_env: "WEBHOOK_URL_WUWA".to_string(),
                role_env: Some("ROLE_ID_WUWA".to_string()),
                extractor: extractor(),
            },
            FeedInfo {
                key: "honkai-star-rail".to_string(),
                url: "https://game8.co/games/Honkai-Star-Rail/archives/408749".to_string(),
                title: "Honkai: Star Rail — Events & Schedule".to_string(),
                webhook_env: "WEBHOOK_URL_HSR".to_string(),
                role_env: Some("ROLE_ID_HSR".to_string()),
                extractor: extractor(),
            },
            FeedInfo {
                key: "umamusume".to_string(),
                url: "https://game8.co/games/Umamusume-Pretty-Derby/archives/549992".to_string(),
                title: "Umamusume: Pretty Derby — Events & Choices".to_string(),
                webhook_env: "WEBHOOK_URL_UMA".to_string(),
                role_env: Some("ROLE_ID_UMA".to_string()),
                extractor: extractor(),
            },
            FeedInfo {
                key: "genshin-impact".to_string(),
                url: "https://game8.co/games/Genshin-Impact/archives/301601".to_string(),
                title: "Genshin Impact — Archives & Updates".to_string(),
                webhook_env: "WEBHOOK_URL_GI".to_string(),
                role_env: Some("ROLE_ID_GI".to_string()),
                extractor: "sections".to_string(),
            },
        ]
    }
}
