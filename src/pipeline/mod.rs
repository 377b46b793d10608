// src/pipeline/mod.rs

//! The generic feed pipeline: normalize → diff → render → publish → run.
//!
//! Every configured feed flows through the same stages; only the
//! extractor that produces the raw bullet lines varies per site.
//! News streams run beside the feeds through their own per-item
//! orchestrator in [`news`].

pub mod diff;
pub mod news;
pub mod normalize;
pub mod publish;
pub mod render;
pub mod run;

pub use diff::{Delta, diff_records, format_delta};
pub use news::{EmbedSink, NewsRunOptions, NewsRunReport, run_news};
pub use normalize::normalize_lines;
pub use publish::{MessageTransport, Publisher};
pub use render::{build_header, build_messages, chunk_messages};
pub use run::{RunOptions, run_feeds, send_run_summary};
