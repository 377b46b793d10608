// src/pipeline/run.rs

//! Run orchestrator.
//!
//! Drives every configured feed through fetch → extract → normalize →
//! diff → render → publish. Feeds are fault isolated: one feed failing
//! records a failed result and the run continues. State and message
//! handles are persisted once, after all feeds have run.

use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::models::{
    Config, FeedInfo, FeedState, FeedStatus, MessageHandles, RunResult, RunSummary,
};
use crate::services::{ExtractorRouter, extract_last_updated};
use crate::storage::StateStore;
use crate::utils::http::PageSource;
use crate::webhook::{build_summary_embed, collect_mentions};

use super::{EmbedSink, MessageTransport, Publisher, build_messages, diff_records, format_delta,
    normalize_lines};

/// Per-run behavior switches, mapped from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run only the feed with this key
    pub only_key: Option<String>,
    /// Create fresh messages instead of editing in place
    pub force_new: bool,
    /// Skip outbound sends and state persistence
    pub dry_run: bool,
}

/// Synchronous page analysis, kept separate so the parsed document
/// never crosses an await point.
struct PageAnalysis {
    lines: Vec<String>,
    item_count: usize,
    last_updated: String,
}

fn analyze_page(feed: &FeedInfo, body: &str, max_items_per_section: usize) -> Result<PageAnalysis> {
    let base_url = Url::parse(&feed.url)?;
    let document = Html::parse_document(body);

    let router = ExtractorRouter::for_feed(feed, max_items_per_section);
    let extraction = router.extract(&document, &base_url);
    let last_updated = extract_last_updated(&document);

    Ok(PageAnalysis {
        lines: extraction.lines,
        item_count: extraction.item_count,
        last_updated,
    })
}

fn role_mention(feed: &FeedInfo) -> Option<String> {
    let env_name = feed.role_env.as_deref()?;
    match std::env::var(env_name) {
        Ok(id) if !id.trim().is_empty() => Some(format!("<@&{}>", id.trim())),
        _ => None,
    }
}

async fn run_feed(
    feed: &FeedInfo,
    config: &Config,
    webhook_url: &str,
    source: &dyn PageSource,
    transport: &dyn MessageTransport,
    previous: &FeedState,
    prior_handles: &[String],
    options: &RunOptions,
) -> Result<(FeedState, Vec<String>, RunResult)> {
    let body = source.fetch(&feed.url).await?;
    let analysis = analyze_page(feed, &body, config.render.max_items_per_section)?;

    let records = normalize_lines(&analysis.lines);
    let delta = diff_records(&previous.items, &records);
    let last_updated_changed =
        previous.last_updated.as_deref() != Some(analysis.last_updated.as_str());

    let messages = build_messages(
        &feed.title,
        &feed.url,
        &analysis.last_updated,
        &analysis.lines,
        config.render.message_limit,
    );

    let publisher = Publisher::new(transport);
    let (handles, action) = publisher
        .publish(webhook_url, prior_handles, &messages, options.force_new)
        .await?;

    log::info!(
        "Feed '{}': {} items, {} message(s), action={}",
        feed.key,
        analysis.item_count,
        handles.len(),
        action.as_str()
    );

    let result = RunResult {
        key: feed.key.clone(),
        title: feed.title.clone(),
        url: feed.url.clone(),
        webhook_env: feed.webhook_env.clone(),
        status: FeedStatus::Ok,
        action,
        messages: handles.len(),
        items: analysis.item_count,
        added: delta.added.len(),
        removed: delta.removed.len(),
        modified: delta.modified.len(),
        has_changes: delta.has_changes(),
        last_updated: analysis.last_updated.clone(),
        delta_summary: format_delta(&delta, last_updated_changed),
        role_mention: role_mention(feed),
    };

    let state = FeedState {
        last_updated: Some(analysis.last_updated),
        items: records,
    };

    Ok((state, handles, result))
}

/// Run the pipeline for all configured feeds.
///
/// Returns one result per processed feed. Feeds whose webhook secret
/// is absent are skipped without fetching; failures are recorded and
/// do not stop the other feeds.
pub async fn run_feeds(
    config: &Config,
    source: &dyn PageSource,
    store: &dyn StateStore,
    transport: &dyn MessageTransport,
    options: &RunOptions,
) -> Result<Vec<RunResult>> {
    let mut states = store.load_states().await?;
    let mut handles = store.load_handles().await?;
    let mut results = Vec::new();

    for feed in &config.feeds {
        if let Some(only) = &options.only_key {
            if &feed.key != only {
                continue;
            }
        }

        let webhook_url = match std::env::var(&feed.webhook_env) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                log::warn!(
                    "Feed '{}' skipped: {} is not set",
                    feed.key,
                    feed.webhook_env
                );
                results.push(RunResult::skipped(
                    &feed.key,
                    &feed.title,
                    &feed.url,
                    &feed.webhook_env,
                ));
                continue;
            }
        };

        let previous = states.get(&feed.key).cloned().unwrap_or_default();
        let prior_handles = handles
            .get(&feed.key)
            .map(MessageHandles::to_vec)
            .unwrap_or_default();

        match run_feed(
            feed,
            config,
            &webhook_url,
            source,
            transport,
            &previous,
            &prior_handles,
            options,
        )
        .await
        {
            Ok((state, new_handles, result)) => {
                states.insert(feed.key.clone(), state);
                if let Some(stored) = MessageHandles::from_vec(&new_handles) {
                    handles.insert(feed.key.clone(), stored);
                } else {
                    handles.remove(&feed.key);
                }
                results.push(result);
            }
            Err(error) => {
                log::error!("Feed '{}' failed: {error}", feed.key);
                results.push(RunResult::failed(
                    &feed.key,
                    &feed.title,
                    &feed.url,
                    &feed.webhook_env,
                    &error.to_string(),
                ));
            }
        }
    }

    if options.dry_run {
        log::info!("[dry-run] State and message handles not persisted");
    } else {
        store.save_states(&states).await?;
        store.save_handles(&handles).await?;
    }

    Ok(results)
}

/// Post the run summary embed to the summary webhook, if configured.
///
/// An unset summary secret is a warning, never a failure.
pub async fn send_run_summary(
    sink: &dyn EmbedSink,
    config: &Config,
    results: &[RunResult],
) -> Result<()> {
    let destination = match std::env::var(&config.summary_webhook_env) {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            log::warn!(
                "Summary skipped: {} is not set",
                config.summary_webhook_env
            );
            return Ok(());
        }
    };

    let summary = RunSummary::from_results(results);
    let embed = build_summary_embed(results, &summary);
    let mentions = collect_mentions(results);

    sink.send_embed(&destination, &embed, mentions.as_deref())
        .await
}
