// src/services/sections.rs

//! Sectioned event-page extractor.
//!
//! For pages that group events as `h3` blocks under named section
//! headings ("List of Current Events" / "List of Upcoming Events"),
//! with the event's guide link and dates scattered in the elements that
//! follow each block. Much tighter filtering than the generic scanner:
//! junk chrome text, version headings, and off-site links are dropped.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::utils::resolve_url;

use super::Extraction;
use super::extractor::{Extractor, element_text};

/// Section headings that root the event list.
const SECTION_TITLES: &[&str] = &["list of current events", "list of upcoming events"];

/// Site-chrome text that must never become an event.
const JUNK_TEXT_PATTERNS: &[&str] = &[
    "create your free account",
    "save articles to your watchlist",
    "save your favorite games",
    "receive instant notifications",
    "convenient features in the comments",
    "site interface",
    "game tools",
];

/// Heading fragments that are navigation, not events.
const SKIP_HEADING_FRAGMENTS: &[&str] = &["events calendar", "new archives", "upcoming archives"];

/// URL fragments that mark account/tooling pages.
const BAD_URL_FRAGMENTS: &[&str] = &["/account", "/login", "/register", "/tools", "site-interface"];

/// Maximum bullet lines (section header included) per page.
const MAX_BULLETS: usize = 14;

fn h3_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("h3").expect("static selector is valid"))
}

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a[href]").expect("static selector is valid"))
}

fn date_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,2}/\d{1,2})\s*[-–—]\s*(\d{1,2}/\d{1,2})").expect("date range regex")
    })
}

fn date_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(event start|event end)[:\s]*((?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2},\s*\d{4})",
        )
        .expect("date line regex")
    })
}

fn is_junk_text(s: &str) -> bool {
    let lower = s.to_lowercase();
    JUNK_TEXT_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Derive the on-site path hint from a base URL shaped like
/// `/games/<Game-Name>/...`; links must contain it to count.
fn path_hint(base_url: &Url) -> Option<String> {
    let mut segments = base_url.path_segments()?;
    if segments.next()? == "games" {
        return segments.next().map(|s| s.to_lowercase());
    }
    None
}

fn is_good_url(url: &str, hint: Option<&str>) -> bool {
    let lower = url.to_lowercase();
    if let Some(hint) = hint {
        if !lower.contains(hint) {
            return false;
        }
    }
    !BAD_URL_FRAGMENTS.iter().any(|p| lower.contains(p))
}

pub struct SectionExtractor {
    max_items_per_section: usize,
}

impl SectionExtractor {
    pub fn new(max_items_per_section: usize) -> Self {
        Self {
            max_items_per_section,
        }
    }

    /// Find the section-root headings by exact (case-insensitive) title.
    fn find_section_roots<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        static HEADS: OnceLock<Selector> = OnceLock::new();
        let heads = HEADS.get_or_init(|| Selector::parse("h2, h3").expect("static selector"));

        document
            .select(heads)
            .filter(|h| {
                let text = element_text(*h).to_lowercase();
                SECTION_TITLES.contains(&text.as_str())
            })
            .collect()
    }

    /// Scan the elements after an event heading for a matching guide link.
    fn find_nearby_link(
        &self,
        head: ElementRef<'_>,
        base_url: &Url,
        hint: Option<&str>,
    ) -> Option<String> {
        let event_name = element_text(head).to_lowercase();
        let name_prefix = event_name.split('—').next().unwrap_or("").trim().to_string();

        for sibling in head.next_siblings() {
            let Some(el) = ElementRef::wrap(sibling) else {
                continue;
            };
            if el.value().name() == "h3" {
                break;
            }
            for anchor in el.select(anchor_selector()) {
                let label = element_text(anchor).to_lowercase();
                let href = anchor.value().attr("href").unwrap_or("");
                let abs_href = resolve_url(base_url, href);
                if !is_good_url(&abs_href, hint) {
                    continue;
                }
                if label.contains("guide") || (!name_prefix.is_empty() && label.contains(&name_prefix))
                {
                    return Some(abs_href);
                }
            }
        }
        None
    }

    /// Scan the elements after an event heading for its date range.
    fn collect_dates_after(&self, head: ElementRef<'_>) -> Option<String> {
        let mut start: Option<String> = None;
        let mut end: Option<String> = None;

        for sibling in head.next_siblings() {
            let Some(el) = ElementRef::wrap(sibling) else {
                continue;
            };
            if el.value().name() == "h3" {
                break;
            }
            let text = element_text(el);
            if text.is_empty() || is_junk_text(&text) {
                continue;
            }

            if let Some(caps) = date_range_re().captures(&text) {
                return Some(format!("{} - {}", &caps[1], &caps[2]));
            }

            for part in text.split(" / ") {
                if let Some(caps) = date_line_re().captures(part) {
                    let kind = caps[1].to_lowercase();
                    let date = caps[2].to_string();
                    if kind.contains("start") && start.is_none() {
                        start = Some(date);
                    } else if kind.contains("end") && end.is_none() {
                        end = Some(date);
                    }
                }
            }
            if start.is_some() && end.is_some() {
                break;
            }
        }

        match (start, end) {
            (Some(s), Some(e)) => Some(format!("{s} → {e}")),
            (Some(s), None) => Some(format!("Start {s}")),
            (None, Some(e)) => Some(format!("End {e}")),
            (None, None) => None,
        }
    }

    /// Turn one event heading into a bullet, if it passes the filters.
    fn event_bullet(
        &self,
        head: ElementRef<'_>,
        base_url: &Url,
        hint: Option<&str>,
        seen: &mut Vec<(String, String)>,
    ) -> Option<String> {
        let text = element_text(head);
        let lower = text.to_lowercase();

        if SKIP_HEADING_FRAGMENTS.iter().any(|f| lower.contains(f)) {
            return None;
        }
        if lower.contains("version") && lower.contains("event") {
            return None;
        }
        if is_junk_text(&lower) || text.split_whitespace().count() < 2 {
            return None;
        }

        let link = self
            .find_nearby_link(head, base_url, hint)
            .filter(|l| is_good_url(l, hint));
        let dates = self.collect_dates_after(head);

        let key = (lower, link.clone().unwrap_or_default());
        if seen.contains(&key) {
            return None;
        }
        seen.push(key);

        Some(match (&link, &dates) {
            (Some(l), Some(d)) => format!("• [{text}]({l}) — {d}"),
            (Some(l), None) => format!("• [{text}]({l})"),
            (None, Some(d)) => format!("• {text} — {d}"),
            (None, None) => format!("• {text}"),
        })
    }
}

impl Extractor for SectionExtractor {
    fn name(&self) -> &'static str {
        "sections"
    }

    fn min_items(&self) -> usize {
        2
    }

    fn extract(&self, document: &Html, base_url: &Url) -> Extraction {
        let roots = self.find_section_roots(document);
        if roots.is_empty() {
            return Extraction::default();
        }

        let hint = path_hint(base_url);
        let mut bullets = vec!["__List of Current/Upcoming Events__".to_string()];
        let mut seen: Vec<(String, String)> = Vec::new();

        'outer: for root in roots {
            let mut root_count = 0usize;
            for sibling in root.next_siblings() {
                let Some(el) = ElementRef::wrap(sibling) else {
                    continue;
                };
                let name = el.value().name();
                let text_lower = element_text(el).to_lowercase();

                // The next section title ends this root's region.
                if (name == "h2" || name == "h3")
                    && SECTION_TITLES.contains(&text_lower.as_str())
                {
                    break;
                }

                if name == "h3" {
                    if let Some(bullet) = self.event_bullet(el, base_url, hint.as_deref(), &mut seen)
                    {
                        bullets.push(bullet);
                        root_count += 1;
                        if bullets.len() >= MAX_BULLETS {
                            break 'outer;
                        }
                        if root_count >= self.max_items_per_section {
                            break;
                        }
                    }
                } else {
                    for nested in el.select(h3_selector()) {
                        if let Some(bullet) =
                            self.event_bullet(nested, base_url, hint.as_deref(), &mut seen)
                        {
                            bullets.push(bullet);
                            root_count += 1;
                            if bullets.len() >= MAX_BULLETS {
                                break 'outer;
                            }
                            if root_count >= self.max_items_per_section {
                                break;
                            }
                        }
                    }
                    if root_count >= self.max_items_per_section {
                        break;
                    }
                }
            }
        }

        Extraction::new(bullets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Extraction {
        let doc = Html::parse_document(html);
        let base = Url::parse("https://game8.co/games/Genshin-Impact/archives/301601").unwrap();
        SectionExtractor::new(10).extract(&doc, &base)
    }

    #[test]
    fn no_section_roots_means_empty_extraction() {
        let extraction = extract("<html><body><h2>Something Else</h2></body></html>");
        assert_eq!(extraction.item_count, 0);
        assert!(extraction.lines.is_empty());
    }

    #[test]
    fn extracts_events_with_links_and_date_ranges() {
        let extraction = extract(
            r#"
            <html><body>
            <h2>List of Current Events</h2>
            <div>
                <h3>Lantern Rite Festival</h3>
                <p>Event duration 2/1 - 2/14</p>
                <p><a href="https://game8.co/games/Genshin-Impact/archives/999">Lantern Rite Festival Guide</a></p>
                <h3>Ley Line Overflow</h3>
                <p>Event Start: Feb 3, 2026 / Event End: Feb 10, 2026</p>
            </div>
            </body></html>
        "#,
        );

        assert_eq!(extraction.lines[0], "__List of Current/Upcoming Events__");
        assert_eq!(extraction.item_count, 2);
        assert!(extraction.lines[1].contains("[Lantern Rite Festival]"));
        assert!(extraction.lines[1].contains("2/1 - 2/14"));
        assert!(extraction.lines[2].contains("Ley Line Overflow"));
        assert!(extraction.lines[2].contains("Feb 3, 2026 → Feb 10, 2026"));
    }

    #[test]
    fn skips_navigation_and_junk_headings() {
        let extraction = extract(
            r#"
            <html><body>
            <h2>List of Current Events</h2>
            <div>
                <h3>Events Calendar for February</h3>
                <h3>Version 5.4 Events</h3>
                <h3>Create your free account today</h3>
                <h3>Real Event Here</h3>
            </div>
            </body></html>
        "#,
        );

        assert_eq!(extraction.item_count, 1);
        assert!(extraction.lines[1].contains("Real Event Here"));
    }

    #[test]
    fn off_site_links_are_ignored() {
        let extraction = extract(
            r#"
            <html><body>
            <h2>List of Current Events</h2>
            <div>
                <h3>Crossover Event</h3>
                <p><a href="https://game8.co/games/Other-Game/archives/1">Crossover Event Guide</a></p>
            </div>
            </body></html>
        "#,
        );

        assert_eq!(extraction.item_count, 1);
        // The link points at another game's path, so the bullet is plain.
        assert!(!extraction.lines[1].contains("]("));
    }

    #[test]
    fn one_word_headings_are_skipped() {
        let extraction = extract(
            r#"
            <html><body>
            <h2>List of Upcoming Events</h2>
            <div><h3>Rewards</h3><h3>Proper Event Name</h3></div>
            </body></html>
        "#,
        );

        assert_eq!(extraction.item_count, 1);
        assert!(extraction.lines[1].contains("Proper Event Name"));
    }

    #[test]
    fn per_section_cap_limits_events() {
        let html = r#"
            <html><body>
            <h2>List of Current Events</h2>
            <div>
                <h3>Event Alpha</h3>
                <h3>Event Beta</h3>
                <h3>Event Gamma</h3>
            </div>
            </body></html>
        "#;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://game8.co/games/Genshin-Impact/archives/1").unwrap();

        let extraction = SectionExtractor::new(2).extract(&doc, &base);
        assert_eq!(extraction.item_count, 2);
    }

    #[test]
    fn path_hint_comes_from_games_segment() {
        let url = Url::parse("https://game8.co/games/Genshin-Impact/archives/1").unwrap();
        assert_eq!(path_hint(&url).as_deref(), Some("genshin-impact"));

        let other = Url::parse("https://example.com/news/1").unwrap();
        assert_eq!(path_hint(&other), None);
    }
}
