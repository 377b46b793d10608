// src/services/extractor.rs

//! Extractor trait, router, and shared scraping helpers.
//!
//! Per-site heuristics live in their own modules; this module holds the
//! selection logic and the text/anchor utilities they all share.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::FeedInfo;
use crate::utils::resolve_url;

use super::{CodeTableExtractor, GenericExtractor, SectionExtractor};

/// Result of running one extractor over a page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Display-ready bullet lines, section headers included
    pub lines: Vec<String>,
    /// Number of actual items (section headers excluded)
    pub item_count: usize,
}

impl Extraction {
    pub fn new(lines: Vec<String>) -> Self {
        let item_count = lines.iter().filter(|l| !l.trim().starts_with("__")).count();
        Self { lines, item_count }
    }
}

/// A per-site extraction heuristic.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scan the page and produce bullet lines.
    fn extract(&self, document: &Html, base_url: &Url) -> Extraction;

    /// Minimum item count for this extraction to be trusted over a
    /// later candidate in the chain.
    fn min_items(&self) -> usize {
        1
    }
}

/// Ordered extractor chain for one feed.
///
/// Site-specific extractors come first; the result of the first one
/// that meets its own minimum item count wins, otherwise the
/// best-scoring candidate is used. This replaces the old
/// try-specific-then-catch-and-fall-back control flow with explicit
/// scoring.
pub struct ExtractorRouter {
    chain: Vec<Box<dyn Extractor>>,
}

impl ExtractorRouter {
    /// Build the chain for a feed from its configured extractor name,
    /// falling back to URL-pattern routing for "auto".
    pub fn for_feed(feed: &FeedInfo, max_items_per_section: usize) -> Self {
        let kind = match feed.extractor.as_str() {
            "auto" => {
                if feed.url.contains("/Genshin-Impact/") {
                    "sections"
                } else if feed.url.to_lowercase().contains("codes") {
                    "codes"
                } else {
                    "generic"
                }
            }
            other => other,
        };

        let chain: Vec<Box<dyn Extractor>> = match kind {
            "sections" => vec![
                Box::new(SectionExtractor::new(max_items_per_section)),
                Box::new(GenericExtractor::new(max_items_per_section)),
            ],
            "codes" => vec![
                Box::new(CodeTableExtractor::new()),
                Box::new(GenericExtractor::new(max_items_per_section)),
            ],
            _ => vec![Box::new(GenericExtractor::new(max_items_per_section))],
        };

        Self { chain }
    }

    /// Run the chain and return the winning extraction.
    pub fn extract(&self, document: &Html, base_url: &Url) -> Extraction {
        let mut best = Extraction::default();
        for extractor in &self.chain {
            let extraction = extractor.extract(document, base_url);
            if extraction.item_count >= extractor.min_items() {
                log::debug!(
                    "Extractor '{}' selected with {} items",
                    extractor.name(),
                    extraction.item_count
                );
                return extraction;
            }
            if extraction.item_count > best.item_count {
                best = extraction;
            }
        }
        best
    }
}

// --- Shared helpers used by the extractor implementations ---

fn selector(css: &'static str, slot: &'static OnceLock<Selector>) -> &'static Selector {
    slot.get_or_init(|| Selector::parse(css).expect("static selector is valid"))
}

pub(super) fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector("a[href]", &SEL)
}

pub(super) fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector("tr", &SEL)
}

pub(super) fn aside_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector("small, span, em", &SEL)
}

/// Collapse whitespace and strip markdown-significant markers so page
/// text cannot inject formatting into the outbound messages.
pub(super) fn clean_text(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace("**", "").replace("__", "").replace('`', "")
}

/// Joined, cleaned text content of an element.
pub(super) fn element_text(el: ElementRef) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4}\b").expect("year regex is valid"))
}

/// Heuristic: does this text look like a duration or date range?
pub(super) fn is_durationish(s: &str) -> bool {
    ["Duration", "Event Duration", "期間", "to ", "–", "—", "-"]
        .iter()
        .any(|k| s.contains(k))
        || year_re().is_match(s)
}

/// Filter out navigation/login/anchor-only hrefs.
pub(super) fn is_bad_href(href: &str) -> bool {
    if href.is_empty() {
        return true;
    }
    let lower = href.trim().to_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.ends_with('#') {
        return true;
    }
    ["/login", "/register", "/signup", "/account"]
        .iter()
        .any(|p| lower.contains(p))
}

/// Strip a case-insensitive label prefix from block text, char-safe.
pub(super) fn strip_label_prefix(text: &str, label: &str) -> String {
    let text_lower = text.to_lowercase();
    let label_lower = label.to_lowercase();
    if text_lower.starts_with(&label_lower) {
        text.chars().skip(label.chars().count()).collect()
    } else {
        text.to_string()
    }
}

/// Collect bullet items from list rows, table rows, and paragraphs that
/// follow a heading, stopping at the next h2/h3.
pub(super) fn collect_items_near_head(
    head: ElementRef,
    base_url: &Url,
    max_items: usize,
) -> Vec<String> {
    let mut items = Vec::new();
    let mut seen: Vec<(String, String)> = Vec::new();

    for sibling in head.next_siblings() {
        let Some(el) = ElementRef::wrap(sibling) else {
            continue;
        };
        let name = el.value().name();
        if name == "h2" || name == "h3" {
            break;
        }

        let mut blocks: Vec<ElementRef> = Vec::new();
        match name {
            "ul" | "ol" => {
                for child in el.children() {
                    if let Some(li) = ElementRef::wrap(child) {
                        if li.value().name() == "li" {
                            blocks.push(li);
                        }
                    }
                }
            }
            "table" => blocks.extend(el.select(row_selector())),
            "p" | "div" => blocks.push(el),
            _ => {}
        }

        for block in blocks {
            let Some(anchor) = block.select(anchor_selector()).next() else {
                continue;
            };
            let href = anchor.value().attr("href").unwrap_or("");
            if is_bad_href(href) {
                continue;
            }

            let label = element_text(anchor);
            if label.chars().count() < 2 {
                continue;
            }

            let abs_href = resolve_url(base_url, href);
            let key = (label.to_lowercase(), abs_href.clone());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);

            let mut info: Option<String> = None;
            let block_text = element_text(block);
            if !block_text.is_empty() && block_text.to_lowercase() != label.to_lowercase() {
                let stripped = strip_label_prefix(&block_text, &label);
                let trimmed = clean_text(
                    stripped.trim_matches(|c: char| ":-—– ".contains(c)),
                );
                if is_durationish(&trimmed) {
                    info = Some(trimmed);
                }
            }
            if info.is_none() {
                if let Some(aside) = block.select(aside_selector()).next() {
                    let aside_text = element_text(aside);
                    if is_durationish(&aside_text) {
                        info = Some(aside_text);
                    }
                }
            }

            let line = match &info {
                Some(detail) => format!("• [{label}]({abs_href}) — {detail}"),
                None => format!("• [{label}]({abs_href})"),
            };
            items.push(line);

            if items.len() >= max_items {
                return items;
            }
        }
    }

    items
}

fn last_updated_precise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Last updated on:\s*([A-Za-z]+\s+\d{1,2},\s*\d{4}\s+\d{1,2}:\d{2}\s*[AP]M)")
            .expect("last-updated regex is valid")
    })
}

fn last_updated_loose_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Last updated on:\s*([^|\n]+)").expect("last-updated fallback regex is valid")
    })
}

/// Extract the site's last-updated marker from page text.
///
/// The marker is treated as an opaque string for change detection only;
/// "unknown" when the page carries no recognizable marker.
pub fn extract_last_updated(document: &Html) -> String {
    let text = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");

    if let Some(caps) = last_updated_precise_re().captures(&text) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = last_updated_loose_re().captures(&text) {
        // The loose form may run into unrelated trailing text; cut at the
        // first large gap.
        let raw = caps[1].trim();
        return raw.split("  ").next().unwrap_or(raw).trim().to_string();
    }
    "unknown".to_string()
}
