// src/models/record.rs

//! Canonical record and per-feed state structures.

use serde::{Deserialize, Serialize};

/// The normalized, comparable representation of one scraped item.
///
/// Built fresh each run from the extractor's bullet lines and compared
/// against the previous run's stored set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Display label of the item (event name, code, article title)
    pub label: String,

    /// Absolute URL for the item, if the source provided one
    #[serde(default)]
    pub link: Option<String>,

    /// Free-text auxiliary detail (date range, reward text)
    #[serde(default)]
    pub info: Option<String>,
}

impl CanonicalRecord {
    /// Create a record from its parts.
    pub fn new(label: impl Into<String>, link: Option<String>, info: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
            info,
        }
    }

    /// Identity key used for dedup and diffing: the lower-cased label.
    ///
    /// Two distinct items that render the same label collapse into one;
    /// this is a known limitation carried over deliberately.
    pub fn identity_key(&self) -> String {
        self.label.to_lowercase()
    }
}

/// Persisted state for one feed: the last-seen snapshot.
///
/// Replaced wholesale at the end of a successful run; never merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FeedState {
    /// Opaque site-reported timestamp string, compared textually only
    #[serde(default)]
    pub last_updated: Option<String>,

    /// The records seen on the last successful run
    #[serde(default)]
    pub items: Vec<CanonicalRecord>,
}

/// Handles of the remote messages currently representing a feed.
///
/// The on-disk format stores a bare string when a feed has exactly one
/// message and an array otherwise; both shapes must round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageHandles {
    Single(String),
    Many(Vec<String>),
}

impl MessageHandles {
    /// Flatten to a plain list of handle identifiers.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(id) => vec![id.clone()],
            Self::Many(ids) => ids.clone(),
        }
    }

    /// Build the storage shape from a handle list.
    ///
    /// Returns `None` for an empty list so the caller can drop the entry.
    pub fn from_vec(handles: &[String]) -> Option<Self> {
        match handles {
            [] => None,
            [only] => Some(Self::Single(only.clone())),
            many => Some(Self::Many(many.to_vec())),
        }
    }
}
