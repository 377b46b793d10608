// src/pipeline/normalize.rs

//! Bullet-line normalization into canonical records.
//!
//! Extractors emit display-ready bullet lines; this stage parses them
//! back into comparable records for diffing. A line is one of:
//!
//! ```text
//! • [label](link) — info
//! • [label](link)
//! • label — info
//! • label
//! ```
//!
//! Section-header lines (`__Title__`) are presentation only and skipped.
//! Malformed lines degrade to a label-only record rather than failing.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::CanonicalRecord;

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*•\s*(?:\[(?P<label>[^\]]+)\]\((?P<link>[^)]+)\)|(?P<label2>[^—]+?))\s*(?:—\s*(?P<info>.+))?\s*$",
        )
        .expect("bullet regex is valid")
    })
}

/// Parse one bullet line into (label, link, info).
pub fn parse_bullet(line: &str) -> (String, Option<String>, Option<String>) {
    let trimmed = line.trim();
    match bullet_re().captures(trimmed) {
        Some(caps) => {
            let label = caps
                .name("label")
                .or_else(|| caps.name("label2"))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            let link = caps.name("link").map(|m| m.as_str().trim().to_string());
            let info = caps.name("info").map(|m| m.as_str().trim().to_string());
            (label, link, info)
        }
        None => {
            // Degenerate line: strip the bullet marker and keep the rest as label.
            let label = trimmed.trim_start_matches('•').trim().to_string();
            (label, None, None)
        }
    }
}

/// Check whether a line is a section header (`__Title__`).
pub fn is_section_header(line: &str) -> bool {
    line.trim().starts_with("__")
}

/// Normalize extractor output into canonical records.
///
/// Skips section headers and empty labels, dedups by lower-cased label
/// with the first occurrence winning (stable scrape order).
pub fn normalize_lines(lines: &[String]) -> Vec<CanonicalRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for line in lines {
        if is_section_header(line) {
            continue;
        }
        let (label, link, info) = parse_bullet(line);
        if label.is_empty() {
            continue;
        }
        let record = CanonicalRecord::new(label, link, info);
        if seen.insert(record.identity_key()) {
            records.push(record);
        }
    }

    records
}

/// Count the renderable items in a bullet list (section headers excluded).
pub fn count_items(lines: &[String]) -> usize {
    lines.iter().filter(|l| !is_section_header(l)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_bullet() {
        let (label, link, info) = parse_bullet("• [Spring Event](https://x/a) — 3/1-3/10");
        assert_eq!(label, "Spring Event");
        assert_eq!(link.as_deref(), Some("https://x/a"));
        assert_eq!(info.as_deref(), Some("3/1-3/10"));
    }

    #[test]
    fn parse_linked_bullet_without_info() {
        let (label, link, info) = parse_bullet("• [Banner](https://x/b)");
        assert_eq!(label, "Banner");
        assert_eq!(link.as_deref(), Some("https://x/b"));
        assert!(info.is_none());
    }

    #[test]
    fn parse_plain_bullet_with_info() {
        let (label, link, info) = parse_bullet("• Maintenance — Jan 5");
        assert_eq!(label, "Maintenance");
        assert!(link.is_none());
        assert_eq!(info.as_deref(), Some("Jan 5"));
    }

    #[test]
    fn parse_bare_bullet() {
        let (label, link, info) = parse_bullet("• Login Bonus");
        assert_eq!(label, "Login Bonus");
        assert!(link.is_none());
        assert!(info.is_none());
    }

    #[test]
    fn malformed_line_degrades_to_label_only() {
        let (label, link, info) = parse_bullet("just some text");
        assert_eq!(label, "just some text");
        assert!(link.is_none());
        assert!(info.is_none());
    }

    #[test]
    fn normalize_skips_section_headers() {
        let lines = vec![
            "__Current Events__".to_string(),
            "• [A](https://x/a)".to_string(),
        ];
        let records = normalize_lines(&lines);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "A");
    }

    #[test]
    fn normalize_dedups_first_occurrence_wins() {
        let lines = vec![
            "• [Event](https://x/first) — early".to_string(),
            "• [event](https://x/second) — late".to_string(),
        ];
        let records = normalize_lines(&lines);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link.as_deref(), Some("https://x/first"));
        assert_eq!(records[0].info.as_deref(), Some("early"));
    }

    #[test]
    fn count_items_excludes_headers() {
        let lines = vec![
            "__Section__".to_string(),
            "• A".to_string(),
            "• B".to_string(),
        ];
        assert_eq!(count_items(&lines), 2);
    }
}
