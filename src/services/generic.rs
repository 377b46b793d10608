// src/services/generic.rs

//! Generic event extractor.
//!
//! Looks for key-phrase headings ("current events", "upcoming", ...)
//! and harvests linked items near them; when a page has no such
//! headings it falls back to scanning anchors with nearby duration-ish
//! text. Deliberately fuzzy and best-effort.

use std::sync::OnceLock;

use scraper::{Html, Selector};
use url::Url;

use crate::utils::resolve_url;

use super::Extraction;
use super::extractor::{
    Extractor, anchor_selector, clean_text, collect_items_near_head, element_text, is_bad_href,
    is_durationish,
};

/// Heading phrases that mark an event section.
const SECTION_KEY_PHRASES: &[&str] = &[
    "current events",
    "ongoing events",
    "events calendar",
    "upcoming",
    "featured events",
    "new archives",
    "upcoming archives",
];

/// Maximum total bullet lines emitted per page.
const MAX_TOTAL_LINES: usize = 40;

/// Maximum anchors harvested in the no-headings fallback.
const MAX_FALLBACK_ANCHORS: usize = 12;

/// Ancestor tags that may carry an item's duration text.
const PARENT_BLOCK_TAGS: &[&str] = &["li", "p", "div", "tr"];

fn heading_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("h2, h3, h4").expect("static selector is valid"))
}

pub struct GenericExtractor {
    max_items_per_section: usize,
}

impl GenericExtractor {
    pub fn new(max_items_per_section: usize) -> Self {
        Self {
            max_items_per_section,
        }
    }

    fn extract_from_headings(&self, document: &Html, base_url: &Url) -> Vec<String> {
        let mut bullets = Vec::new();

        for head in document.select(heading_selector()) {
            let heading_text = element_text(head);
            let lower = heading_text.to_lowercase();
            if !SECTION_KEY_PHRASES.iter().any(|p| lower.contains(p)) {
                continue;
            }
            bullets.push(format!("__{}__", clean_text(&heading_text)));
            bullets.extend(collect_items_near_head(
                head,
                base_url,
                self.max_items_per_section,
            ));
        }

        bullets
    }

    fn extract_from_anchors(&self, document: &Html, base_url: &Url) -> Vec<String> {
        let mut bullets = Vec::new();
        let mut seen: Vec<(String, String)> = Vec::new();

        for anchor in document.select(anchor_selector()) {
            let href = anchor.value().attr("href").unwrap_or("");
            if is_bad_href(href) {
                continue;
            }
            let label = element_text(anchor);
            if label.chars().count() < 3 {
                continue;
            }
            let abs_href = resolve_url(base_url, href);
            let key = (label.to_lowercase(), abs_href.clone());
            if seen.contains(&key) {
                continue;
            }

            // A short duration-ish parent block doubles as the info text.
            let mut info = None;
            let parent = anchor
                .ancestors()
                .filter_map(scraper::ElementRef::wrap)
                .find(|el| PARENT_BLOCK_TAGS.contains(&el.value().name()));
            if let Some(parent) = parent {
                let parent_text = element_text(parent);
                if is_durationish(&parent_text) && parent_text.chars().count() < 160 {
                    info = Some(parent_text);
                }
            }

            let line = match &info {
                Some(detail) => format!("• [{label}]({abs_href}) — {detail}"),
                None => format!("• [{label}]({abs_href})"),
            };
            bullets.push(line);
            seen.push(key);

            if bullets.len() >= MAX_FALLBACK_ANCHORS {
                break;
            }
        }

        bullets
    }
}

impl Extractor for GenericExtractor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn extract(&self, document: &Html, base_url: &Url) -> Extraction {
        let mut bullets = self.extract_from_headings(document, base_url);
        if bullets.is_empty() {
            bullets = self.extract_from_anchors(document, base_url);
        }

        // De-dup whole lines, preserve order, trim to the page cap.
        let mut final_lines = Vec::new();
        for line in bullets {
            if !final_lines.contains(&line) {
                final_lines.push(line);
            }
            if final_lines.len() >= MAX_TOTAL_LINES {
                break;
            }
        }

        Extraction::new(final_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Extraction {
        let doc = Html::parse_document(html);
        let base = Url::parse("https://site.example/page").unwrap();
        GenericExtractor::new(10).extract(&doc, &base)
    }

    #[test]
    fn harvests_sections_under_key_headings() {
        let extraction = extract(
            r#"
            <html><body>
            <h2>Current Events</h2>
            <ul>
                <li><a href="/events/a">Festival A</a> — runs 3/1 - 3/10</li>
                <li><a href="/events/b">Banner B</a></li>
            </ul>
            <h2>Unrelated Footer</h2>
            <ul><li><a href="/junk">Junk Link</a></li></ul>
            </body></html>
        "#,
        );

        assert_eq!(extraction.lines[0], "__Current Events__");
        assert_eq!(extraction.item_count, 2);
        assert!(!extraction.lines.iter().any(|l| l.contains("Junk Link")));
    }

    #[test]
    fn falls_back_to_anchor_scan_without_headings() {
        let extraction = extract(
            r#"
            <html><body>
            <p><a href="/events/one">Event One</a></p>
            <p><a href="/login">Log In</a></p>
            <p><a href="/events/two">Event Two</a></p>
            </body></html>
        "#,
        );

        assert_eq!(extraction.item_count, 2);
        assert!(extraction.lines.iter().all(|l| !l.contains("Log In")));
    }

    #[test]
    fn fallback_captures_durationish_parent_text() {
        let extraction = extract(
            r#"
            <html><body>
            <li><a href="/events/fest">Spring Fest</a> 4/1 - 4/14</li>
            </body></html>
        "#,
        );

        assert_eq!(extraction.item_count, 1);
        assert!(extraction.lines[0].contains("— Spring Fest 4/1 - 4/14"));
    }

    #[test]
    fn duplicate_lines_are_dropped() {
        let extraction = extract(
            r#"
            <html><body>
            <p><a href="/events/a">Same Event</a></p>
            <p><a href="/events/a">Same Event</a></p>
            </body></html>
        "#,
        );

        assert_eq!(extraction.item_count, 1);
    }

    #[test]
    fn empty_page_yields_zero_items() {
        let extraction = extract("<html><body><p>nothing</p></body></html>");
        assert_eq!(extraction.item_count, 0);
        assert!(extraction.lines.is_empty());
    }
}
