// src/services/mod.rs

//! Site extraction services.
//!
//! Each extractor turns a parsed HTML page into display-ready bullet
//! lines; a router selects the best-scoring extractor for a feed.
//! News sources are their own family: they poll platform APIs or
//! embedded page state and return whole posts instead of lines.

mod codes;
mod extractor;
mod generic;
mod gryphline;
mod hoyolab;
mod news;
mod sections;

pub use codes::CodeTableExtractor;
pub use extractor::{Extraction, Extractor, ExtractorRouter, extract_last_updated};
pub use generic::GenericExtractor;
pub use gryphline::GryphlineSource;
pub use hoyolab::HoyolabSource;
pub use news::{NewsPoll, NewsSource, build_sources, html_to_text};
pub use sections::SectionExtractor;
