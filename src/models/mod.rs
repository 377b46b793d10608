// src/models/mod.rs

//! Domain models for the gazette application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod news;
mod record;
mod summary;

// Re-export all public types
pub use config::{Config, FeedInfo, HttpConfig, NewsConfig, NewsGameInfo, RenderConfig, RetryConfig};
pub use news::{NewsPost, NewsRecord, composite_key};
pub use record::{CanonicalRecord, FeedState, MessageHandles};
pub use summary::{FeedStatus, PublishAction, RunResult, RunSummary};
