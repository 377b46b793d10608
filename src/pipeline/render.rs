// src/pipeline/render.rs

//! Message rendering and size-bounded chunking.
//!
//! Turns a header plus bullet lines into one or more message bodies,
//! each at most `limit` characters. The first chunk starts with the
//! header, later chunks start with a continuation marker. Output is
//! byte-identical for identical input.

use unicode_segmentation::UnicodeSegmentation;

/// Continuation marker prefixed to every chunk after the first.
pub const CONTINUATION_PREFIX: &str = "_(continued)_\n\n";

/// Placeholder body used when an extractor found nothing.
pub const NO_ITEMS_PLACEHOLDER: &str =
    "_No parseable items found today (site layout may have changed)._";

/// Build the message header for a feed.
pub fn build_header(title: &str, url: &str, last_updated: &str) -> String {
    format!("**{title}**\n<{url}>\n_Last updated: **{last_updated}**_\n")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split a string into pieces of at most `max_chars` characters,
/// breaking only at grapheme boundaries.
fn split_oversized(s: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut count = 0;

    for grapheme in s.graphemes(true) {
        let grapheme_chars = char_len(grapheme);
        if count + grapheme_chars > max_chars && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            count = 0;
        }
        piece.push_str(grapheme);
        count += grapheme_chars;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Close the current chunk and start a continuation.
fn flush(messages: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim_end();
    if !trimmed.is_empty() {
        messages.push(trimmed.to_string());
    }
    *current = CONTINUATION_PREFIX.to_string();
}

/// Split header + bullet lines into messages of at most `limit` characters.
///
/// Lines are never reordered; a single line that exceeds an empty
/// chunk's budget is hard-split at grapheme boundaries into as many
/// pieces as needed. Never emits an empty chunk.
pub fn chunk_messages(header: &str, lines: &[String], limit: usize) -> Vec<String> {
    let mut messages: Vec<String> = Vec::new();
    let mut current = format!("{}\n\n", header.trim_end());

    for line in lines {
        let add = format!("{}\n", line.trim_end());

        if char_len(&current) + char_len(&add) > limit {
            flush(&mut messages, &mut current);
        }

        if char_len(&current) + char_len(&add) > limit {
            // Oversized single line: the empty-chunk budget is the limit
            // minus the continuation prefix.
            let budget = limit.saturating_sub(char_len(CONTINUATION_PREFIX));
            for piece in split_oversized(&add, budget) {
                if char_len(&current) + char_len(&piece) > limit {
                    flush(&mut messages, &mut current);
                }
                current.push_str(&piece);
            }
        } else {
            current.push_str(&add);
        }
    }

    let trimmed = current.trim_end();
    if !trimmed.is_empty() && trimmed != CONTINUATION_PREFIX.trim_end() {
        messages.push(trimmed.to_string());
    }
    messages
}

/// Render a feed snapshot into outbound message bodies.
///
/// Empty bullet lists render a single chunk with the header and the
/// "no items" placeholder.
pub fn build_messages(
    title: &str,
    url: &str,
    last_updated: &str,
    bullets: &[String],
    limit: usize,
) -> Vec<String> {
    let header = build_header(title, url, last_updated);
    if bullets.is_empty() {
        let placeholder = vec![NO_ITEMS_PLACEHOLDER.to_string()];
        chunk_messages(&header, &placeholder, limit)
    } else {
        chunk_messages(&header, bullets, limit)
    }
}
