// src/services/codes.rs

//! Promo-code table extractor.
//!
//! For pages that publish active codes as tables under per-category
//! headings (`Code | Reward | Expiration`). Column order is resolved
//! from the header row when present; placeholder rows ("None currently",
//! "N/A") are dropped. Codes are shown upper-cased since that is how
//! they are redeemed.

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::Extraction;
use super::extractor::{Extractor, clean_text, element_text};

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("table").expect("static selector is valid"))
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("static selector is valid"))
}

fn cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("th, td").expect("static selector is valid"))
}

/// Placeholder rows that mean "no codes right now".
fn is_placeholder(code: &str) -> bool {
    let lower = code.trim().to_lowercase();
    lower.is_empty() || lower.contains("none") || lower == "n/a" || lower == "na"
}

/// Column indices resolved from a table's header row.
#[derive(Debug, Default)]
struct ColumnMap {
    code: Option<usize>,
    reward: Option<usize>,
    expiration: Option<usize>,
}

impl ColumnMap {
    fn from_header(cells: &[String]) -> Self {
        let mut map = Self::default();
        for (i, header) in cells.iter().enumerate() {
            let lower = header.to_lowercase();
            if map.code.is_none() && lower.contains("code") {
                map.code = Some(i);
            }
            if map.reward.is_none() && lower.contains("reward") {
                map.reward = Some(i);
            }
            if map.expiration.is_none()
                && (lower.contains("expir") || lower.contains("expiry") || lower.contains("date"))
            {
                map.expiration = Some(i);
            }
        }
        map
    }

    /// A header row is recognizable only if it names a code column.
    fn is_resolved(&self) -> bool {
        self.code.is_some()
    }
}

pub struct CodeTableExtractor;

impl CodeTableExtractor {
    pub fn new() -> Self {
        Self
    }

    fn row_cells(row: ElementRef<'_>) -> Vec<String> {
        row.select(cell_selector()).map(element_text).collect()
    }

    fn cell<'a>(cells: &'a [String], idx: Option<usize>) -> &'a str {
        idx.and_then(|i| cells.get(i)).map_or("", |s| s.as_str())
    }

    fn extract_table(&self, table: ElementRef<'_>, bullets: &mut Vec<String>) {
        let rows: Vec<ElementRef> = table.select(row_selector()).collect();
        let Some((header, body)) = rows.split_first() else {
            return;
        };

        let columns = ColumnMap::from_header(&Self::row_cells(*header));
        if !columns.is_resolved() {
            return;
        }

        for row in body {
            let cells = Self::row_cells(*row);
            if cells.is_empty() {
                continue;
            }

            let code_raw = Self::cell(&cells, columns.code);
            if is_placeholder(code_raw) {
                continue;
            }
            let code = clean_text(code_raw).to_uppercase();

            let reward = clean_text(Self::cell(&cells, columns.reward));
            let expiration = clean_text(Self::cell(&cells, columns.expiration));
            let expiration = match expiration.to_lowercase().as_str() {
                "" | "unknown" | "n/a" | "na" => None,
                _ => Some(expiration),
            };

            let info = match (reward.is_empty(), &expiration) {
                (false, Some(exp)) => Some(format!("{reward} (expires {exp})")),
                (false, None) => Some(reward),
                (true, Some(exp)) => Some(format!("expires {exp}")),
                (true, None) => None,
            };

            bullets.push(match info {
                Some(detail) => format!("• {code} — {detail}"),
                None => format!("• {code}"),
            });
        }
    }
}

impl Extractor for CodeTableExtractor {
    fn name(&self) -> &'static str {
        "codes"
    }

    fn extract(&self, document: &Html, _base_url: &Url) -> Extraction {
        let mut bullets = Vec::new();
        for table in document.select(table_selector()) {
            self.extract_table(table, &mut bullets);
        }
        Extraction::new(bullets)
    }
}
