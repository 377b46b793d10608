// src/pipeline/news.rs

//! News stream orchestrator.
//!
//! Polls each configured news source, baselines posts never seen
//! before, and publishes one embed per new or changed post. The very
//! first poll for a game only records baselines so that a fresh state
//! file does not flood the channel with the site's whole backlog.
//! A post is "changed" when its content hash differs from the hash
//! stored at the last successful send.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, NewsRecord};
use crate::services::NewsSource;
use crate::storage::StateStore;
use crate::utils::http::PageSource;
use crate::webhook::{Embed, build_news_embed};

/// Outbound embed delivery seam, implemented by the webhook client.
#[async_trait]
pub trait EmbedSink: Send + Sync {
    async fn send_embed(
        &self,
        destination: &str,
        embed: &Embed,
        content: Option<&str>,
    ) -> Result<()>;
}

/// Per-run behavior switches for the news stream, mapped from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct NewsRunOptions {
    /// Poll only sources for this game
    pub only_game: Option<String>,
    /// Skip outbound sends and state persistence
    pub dry_run: bool,
}

/// Counters describing what a news run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NewsRunReport {
    /// Posts listed across all polled sources
    pub discovered: usize,
    /// Embeds delivered
    pub published: usize,
    /// Posts skipped because their stored hash matched
    pub skipped: usize,
    /// Posts recorded without sending (first poll for their game)
    pub baselined: usize,
    /// Sources whose poll failed
    pub failed_sources: usize,
}

/// Poll every source and publish new or changed posts.
///
/// Sources are fault isolated: one poll failing is logged and counted,
/// and the run continues. State is persisted once, after all sources
/// have been polled, unless this is a dry run.
pub async fn run_news(
    config: &Config,
    sources: &[Box<dyn NewsSource>],
    http: &dyn PageSource,
    store: &dyn StateStore,
    sink: &dyn EmbedSink,
    options: &NewsRunOptions,
) -> Result<NewsRunReport> {
    let destination = match std::env::var(&config.news.webhook_env) {
        Ok(url) if !url.trim().is_empty() => url,
        _ if options.dry_run => String::new(),
        _ => {
            log::warn!(
                "News skipped: {} is not set",
                config.news.webhook_env
            );
            return Ok(NewsRunReport::default());
        }
    };

    let mut state = store.load_news_state().await?;
    let mut report = NewsRunReport::default();
    let delay = Duration::from_millis(config.news.publish_delay_ms);

    for source in sources {
        if let Some(only) = &options.only_game {
            if source.game() != only.as_str() {
                continue;
            }
        }

        // No stored key for this game means this is its first poll.
        let game_marker = format!(":{}:", source.game());
        let first_poll = !state.keys().any(|key| key.contains(&game_marker));

        let poll = match source.poll(http, &state).await {
            Ok(poll) => poll,
            Err(error) => {
                log::error!(
                    "News source '{}/{}' failed: {error}",
                    source.platform(),
                    source.game()
                );
                report.failed_sources += 1;
                continue;
            }
        };

        report.discovered += poll.discovered.len();
        for (key, ts) in &poll.discovered {
            if !state.contains_key(key) {
                state.insert(key.clone(), NewsRecord::baseline(*ts));
                if first_poll {
                    report.baselined += 1;
                }
            }
        }

        if first_poll {
            log::info!(
                "First poll for '{}': baselined {} post(s) without publishing",
                source.game(),
                poll.discovered.len()
            );
            continue;
        }

        let mut posts = poll.items;
        posts.sort_by_key(|post| post.effective_ts);

        for post in posts {
            let key = post.identity_key();
            let hash = post.content_hash();
            if state
                .get(&key)
                .is_some_and(|record| record.last_sent_hash == hash)
            {
                report.skipped += 1;
                continue;
            }

            let embed = build_news_embed(&post, source.color());
            match sink.send_embed(&destination, &embed, None).await {
                Ok(()) => {
                    log::info!("Published '{}' ({key})", post.title);
                    state.insert(key, NewsRecord::sent(post.effective_ts, hash));
                    report.published += 1;
                    if !delay.is_zero() && !options.dry_run {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error) => {
                    // Left out of state so the next run retries the send.
                    log::error!("Publish of '{key}' failed: {error}");
                }
            }
        }
    }

    if options.dry_run {
        log::info!("[dry-run] News state not persisted");
    } else {
        store.save_news_state(&state).await?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedState, MessageHandles, NewsPost};
    use crate::services::NewsPoll;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct ScriptedSource {
        platform: &'static str,
        game: &'static str,
        posts: Vec<NewsPost>,
        fail: bool,
    }

    #[async_trait]
    impl NewsSource for ScriptedSource {
        fn platform(&self) -> &str {
            self.platform
        }

        fn game(&self) -> &str {
            self.game
        }

        fn color(&self) -> u32 {
            0x123456
        }

        async fn poll(
            &self,
            _http: &dyn PageSource,
            _known: &HashMap<String, NewsRecord>,
        ) -> Result<NewsPoll> {
            if self.fail {
                return Err(crate::error::AppError::scrape(self.game, "listing down"));
            }
            Ok(NewsPoll {
                discovered: self
                    .posts
                    .iter()
                    .map(|post| (post.identity_key(), post.effective_ts))
                    .collect(),
                items: self.posts.clone(),
            })
        }
    }

    #[derive(Default)]
    struct MemoryNewsStore {
        state: Mutex<HashMap<String, NewsRecord>>,
        saves: Mutex<usize>,
    }

    #[async_trait]
    impl StateStore for MemoryNewsStore {
        async fn load_states(&self) -> Result<HashMap<String, FeedState>> {
            Ok(HashMap::new())
        }

        async fn save_states(&self, _states: &HashMap<String, FeedState>) -> Result<()> {
            Ok(())
        }

        async fn load_handles(&self) -> Result<HashMap<String, MessageHandles>> {
            Ok(HashMap::new())
        }

        async fn save_handles(&self, _handles: &HashMap<String, MessageHandles>) -> Result<()> {
            Ok(())
        }

        async fn load_news_state(&self) -> Result<HashMap<String, NewsRecord>> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn save_news_state(&self, state: &HashMap<String, NewsRecord>) -> Result<()> {
            *self.state.lock().unwrap() = state.clone();
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbedSink for RecordingSink {
        async fn send_embed(
            &self,
            _destination: &str,
            embed: &Embed,
            _content: Option<&str>,
        ) -> Result<()> {
            self.sent.lock().unwrap().push(embed.title.clone());
            Ok(())
        }
    }

    struct NullPages;

    #[async_trait]
    impl PageSource for NullPages {
        async fn fetch(&self, url: &str) -> Result<String> {
            Err(crate::error::AppError::scrape(url, "no fixture"))
        }
    }

    fn post(game: &str, id: &str, title: &str, content: &str, ts: i64) -> NewsPost {
        NewsPost {
            platform: "hoyolab".to_string(),
            game: game.to_string(),
            id: id.to_string(),
            url: format!("https://www.hoyolab.com/article/{id}"),
            title: title.to_string(),
            author: None,
            content: content.to_string(),
            category: "Notices".to_string(),
            published: None,
            updated: None,
            image: None,
            effective_ts: ts,
        }
    }

    fn source(game: &'static str, posts: Vec<NewsPost>) -> Box<dyn NewsSource> {
        Box::new(ScriptedSource {
            platform: "hoyolab",
            game,
            posts,
            fail: false,
        })
    }

    fn config(webhook_env: &str) -> Config {
        let mut config = Config::default();
        config.news.webhook_env = webhook_env.to_string();
        config.news.publish_delay_ms = 0;
        config
    }

    #[tokio::test]
    async fn first_poll_baselines_without_publishing() {
        unsafe {
            std::env::set_var("GAZETTE_TEST_WH_NEWS_FIRST", "https://wh.test/n1");
        }

        let sources = vec![source(
            "genshin",
            vec![post("genshin", "1", "Old Post", "body", 100)],
        )];
        let store = MemoryNewsStore::default();
        let sink = RecordingSink::default();

        let report = run_news(
            &config("GAZETTE_TEST_WH_NEWS_FIRST"),
            &sources,
            &NullPages,
            &store,
            &sink,
            &NewsRunOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.baselined, 1);
        assert_eq!(report.published, 0);
        assert!(sink.sent.lock().unwrap().is_empty());

        // The baseline is stored with an empty sent hash.
        let state = store.state.lock().unwrap();
        assert!(state["hoyolab:genshin:1"].last_sent_hash.is_empty());
    }

    #[tokio::test]
    async fn new_post_after_baseline_is_published() {
        unsafe {
            std::env::set_var("GAZETTE_TEST_WH_NEWS_NEW", "https://wh.test/n2");
        }

        let store = MemoryNewsStore::default();
        store.state.lock().unwrap().insert(
            "hoyolab:genshin:1".to_string(),
            NewsRecord::baseline(100),
        );

        let sources = vec![source(
            "genshin",
            vec![
                post("genshin", "1", "Old Post", "body", 100),
                post("genshin", "2", "Fresh Post", "body", 200),
            ],
        )];
        let sink = RecordingSink::default();

        let report = run_news(
            &config("GAZETTE_TEST_WH_NEWS_NEW"),
            &sources,
            &NullPages,
            &store,
            &sink,
            &NewsRunOptions::default(),
        )
        .await
        .unwrap();

        // Post 1 was baselined with an empty hash, so it publishes too;
        // both are delivered oldest first.
        assert_eq!(report.published, 2);
        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec!["Old Post".to_string(), "Fresh Post".to_string()]
        );

        let state = store.state.lock().unwrap();
        assert!(!state["hoyolab:genshin:2"].last_sent_hash.is_empty());
    }

    #[tokio::test]
    async fn unchanged_post_is_skipped_and_changed_post_resent() {
        unsafe {
            std::env::set_var("GAZETTE_TEST_WH_NEWS_HASH", "https://wh.test/n3");
        }

        let unchanged = post("genshin", "1", "Stable", "same body", 100);
        let changed_before = post("genshin", "2", "Patch Notes", "v1 text", 150);
        let changed_after = post("genshin", "2", "Patch Notes", "v2 text", 250);

        let store = MemoryNewsStore::default();
        {
            let mut state = store.state.lock().unwrap();
            state.insert(
                unchanged.identity_key(),
                NewsRecord::sent(100, unchanged.content_hash()),
            );
            state.insert(
                changed_before.identity_key(),
                NewsRecord::sent(150, changed_before.content_hash()),
            );
        }

        let sources = vec![source("genshin", vec![unchanged, changed_after])];
        let sink = RecordingSink::default();

        let report = run_news(
            &config("GAZETTE_TEST_WH_NEWS_HASH"),
            &sources,
            &NullPages,
            &store,
            &sink,
            &NewsRunOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.published, 1);
        assert_eq!(*sink.sent.lock().unwrap(), vec!["Patch Notes".to_string()]);
    }

    #[tokio::test]
    async fn failed_source_does_not_stop_the_run() {
        unsafe {
            std::env::set_var("GAZETTE_TEST_WH_NEWS_FAULT", "https://wh.test/n4");
        }

        let store = MemoryNewsStore::default();
        store.state.lock().unwrap().insert(
            "hoyolab:starrail:9".to_string(),
            NewsRecord::baseline(50),
        );

        let sources: Vec<Box<dyn NewsSource>> = vec![
            Box::new(ScriptedSource {
                platform: "hoyolab",
                game: "genshin",
                posts: Vec::new(),
                fail: true,
            }),
            source(
                "starrail",
                vec![post("starrail", "9", "Warp Event", "body", 60)],
            ),
        ];
        let sink = RecordingSink::default();

        let report = run_news(
            &config("GAZETTE_TEST_WH_NEWS_FAULT"),
            &sources,
            &NullPages,
            &store,
            &sink,
            &NewsRunOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed_sources, 1);
        assert_eq!(report.published, 1);
    }

    #[tokio::test]
    async fn dry_run_does_not_persist_news_state() {
        let store = MemoryNewsStore::default();
        store.state.lock().unwrap().insert(
            "hoyolab:genshin:1".to_string(),
            NewsRecord::baseline(100),
        );

        let sources = vec![source(
            "genshin",
            vec![post("genshin", "2", "Fresh Post", "body", 200)],
        )];
        let sink = RecordingSink::default();

        let options = NewsRunOptions {
            dry_run: true,
            ..NewsRunOptions::default()
        };
        // No webhook env needed in dry-run mode.
        let report = run_news(
            &config("GAZETTE_TEST_WH_NEWS_UNSET_DRY"),
            &sources,
            &NullPages,
            &store,
            &sink,
            &options,
        )
        .await
        .unwrap();

        assert_eq!(report.published, 1);
        assert_eq!(*store.saves.lock().unwrap(), 0);
        assert!(!store.state.lock().unwrap().contains_key("hoyolab:genshin:2"));
    }

    #[tokio::test]
    async fn only_game_filter_limits_polled_sources() {
        unsafe {
            std::env::set_var("GAZETTE_TEST_WH_NEWS_ONLY", "https://wh.test/n5");
        }

        let store = MemoryNewsStore::default();
        {
            let mut state = store.state.lock().unwrap();
            state.insert("hoyolab:genshin:1".to_string(), NewsRecord::baseline(10));
            state.insert("hoyolab:starrail:1".to_string(), NewsRecord::baseline(10));
        }

        let sources = vec![
            source(
                "genshin",
                vec![post("genshin", "2", "Genshin Post", "body", 20)],
            ),
            source(
                "starrail",
                vec![post("starrail", "2", "Star Rail Post", "body", 20)],
            ),
        ];
        let sink = RecordingSink::default();

        let options = NewsRunOptions {
            only_game: Some("starrail".to_string()),
            ..NewsRunOptions::default()
        };
        let report = run_news(
            &config("GAZETTE_TEST_WH_NEWS_ONLY"),
            &sources,
            &NullPages,
            &store,
            &sink,
            &options,
        )
        .await
        .unwrap();

        assert_eq!(report.published, 1);
        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec!["Star Rail Post".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_webhook_secret_skips_the_run() {
        let sources = vec![source(
            "genshin",
            vec![post("genshin", "1", "Post", "body", 10)],
        )];
        let store = MemoryNewsStore::default();
        let sink = RecordingSink::default();

        let report = run_news(
            &config("GAZETTE_TEST_WH_NEWS_UNSET_SECRET"),
            &sources,
            &NullPages,
            &store,
            &sink,
            &NewsRunOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(report, NewsRunReport::default());
        assert!(sink.sent.lock().unwrap().is_empty());
    }
}
