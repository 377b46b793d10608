// src/webhook/mod.rs

//! Outbound webhook transport and embed building.

mod client;
mod embed;

pub use client::WebhookClient;
pub use embed::{
    Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedThumbnail, build_news_embed,
    build_summary_embed, collect_mentions,
};
