// src/pipeline/diff.rs

//! Diff calculation between record snapshots.
//!
//! Compares the freshly scraped record set against the stored one and
//! partitions identity keys into added, removed, and modified. Identity
//! is the lower-cased label; two distinct items rendering identical text
//! therefore merge into one key (a known, accepted limitation).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::CanonicalRecord;

/// A record whose link or info changed between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifiedRecord {
    pub before: CanonicalRecord,
    pub after: CanonicalRecord,
}

/// Partitioned diff between two snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Delta {
    pub added: Vec<CanonicalRecord>,
    pub removed: Vec<CanonicalRecord>,
    pub modified: Vec<ModifiedRecord>,
}

impl Delta {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.modified.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// Calculate the diff between the previous and current snapshots.
///
/// Pure function. Output order is deterministic: added and modified
/// follow the order of `current`, removed follows the order of
/// `previous`; the maps are used only for membership lookup.
pub fn diff_records(previous: &[CanonicalRecord], current: &[CanonicalRecord]) -> Delta {
    let prev_map: HashMap<String, &CanonicalRecord> = previous
        .iter()
        .map(|r| (r.identity_key(), r))
        .collect();
    let curr_map: HashMap<String, &CanonicalRecord> = current
        .iter()
        .map(|r| (r.identity_key(), r))
        .collect();

    let mut delta = Delta::default();

    for record in current {
        match prev_map.get(&record.identity_key()) {
            None => delta.added.push(record.clone()),
            Some(prev) => {
                if prev.link != record.link || prev.info != record.info {
                    delta.modified.push(ModifiedRecord {
                        before: (*prev).clone(),
                        after: record.clone(),
                    });
                }
            }
        }
    }

    for record in previous {
        if !curr_map.contains_key(&record.identity_key()) {
            delta.removed.push(record.clone());
        }
    }

    delta
}

/// Build the human-readable delta line for the run summary.
///
/// Shows partition counts, up to two notable labels per partition, and
/// whether the site's last-updated marker changed.
pub fn format_delta(delta: &Delta, last_updated_changed: bool) -> String {
    if !delta.has_changes() && !last_updated_changed {
        return "No detected changes".to_string();
    }

    let mut parts = Vec::new();
    if delta.has_changes() {
        parts.push(format!(
            "Δ Items: +{} / −{} / ~{}",
            delta.added.len(),
            delta.removed.len(),
            delta.modified.len()
        ));
    }
    if last_updated_changed {
        parts.push("Site timestamp changed".to_string());
    }

    let mut notable = Vec::new();
    for record in delta.added.iter().take(2) {
        notable.push(format!("+ {}", record.label));
    }
    for record in delta.removed.iter().take(2) {
        notable.push(format!("− {}", record.label));
    }
    for change in delta.modified.iter().take(2) {
        notable.push(format!("~ {}", change.after.label));
    }
    if !notable.is_empty() {
        parts.push(notable.join(" · "));
    }

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, link: &str, info: &str) -> CanonicalRecord {
        CanonicalRecord::new(
            label,
            (!link.is_empty()).then(|| link.to_string()),
            (!info.is_empty()).then(|| info.to_string()),
        )
    }

    #[test]
    fn no_changes_for_identical_sets() {
        let prev = vec![record("A", "https://x/a", "1/1"), record("B", "", "")];
        let curr = prev.clone();

        let delta = diff_records(&prev, &curr);
        assert!(!delta.has_changes());
        assert_eq!(delta.change_count(), 0);
    }

    #[test]
    fn detects_additions_in_current_order() {
        let prev = vec![record("A", "", "")];
        let curr = vec![record("A", "", ""), record("B", "", ""), record("C", "", "")];

        let delta = diff_records(&prev, &curr);
        let labels: Vec<_> = delta.added.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "C"]);
        assert!(delta.removed.is_empty());
    }

    #[test]
    fn detects_removals_in_previous_order() {
        let prev = vec![record("A", "", ""), record("B", "", ""), record("C", "", "")];
        let curr = vec![record("B", "", "")];

        let delta = diff_records(&prev, &curr);
        let labels: Vec<_> = delta.removed.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "C"]);
        assert!(delta.added.is_empty());
    }

    #[test]
    fn detects_info_change_as_modified() {
        let prev = vec![record("Spring Event", "http://x/a", "3/1-3/10")];
        let curr = vec![record("Spring Event", "http://x/a", "3/1-3/15")];

        let delta = diff_records(&prev, &curr);
        assert!(delta.added.is_empty());
        assert!(delta.removed.is_empty());
        assert_eq!(delta.modified.len(), 1);
        assert_eq!(delta.modified[0].before.info.as_deref(), Some("3/1-3/10"));
        assert_eq!(delta.modified[0].after.info.as_deref(), Some("3/1-3/15"));
    }

    #[test]
    fn identity_is_case_insensitive() {
        let prev = vec![record("spring event", "http://x/a", "")];
        let curr = vec![record("Spring Event", "http://x/a", "")];

        let delta = diff_records(&prev, &curr);
        assert!(!delta.has_changes());
    }

    #[test]
    fn every_current_key_lands_in_one_partition() {
        let prev = vec![
            record("Keep", "http://x/1", ""),
            record("Change", "http://x/2", "old"),
            record("Drop", "http://x/3", ""),
        ];
        let curr = vec![
            record("Keep", "http://x/1", ""),
            record("Change", "http://x/2", "new"),
            record("Fresh", "http://x/4", ""),
        ];

        let delta = diff_records(&prev, &curr);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].label, "Fresh");
        assert_eq!(delta.modified.len(), 1);
        assert_eq!(delta.modified[0].after.label, "Change");
        assert_eq!(delta.removed.len(), 1);
        assert_eq!(delta.removed[0].label, "Drop");
        // Unchanged record appears nowhere
        let all_labels: Vec<&str> = delta
            .added
            .iter()
            .chain(delta.removed.iter())
            .map(|r| r.label.as_str())
            .chain(delta.modified.iter().map(|m| m.after.label.as_str()))
            .collect();
        assert!(!all_labels.contains(&"Keep"));
    }

    #[test]
    fn empty_to_full_and_back() {
        let set = vec![record("Only", "", "")];

        let delta = diff_records(&[], &set);
        assert_eq!(delta.added.len(), 1);
        assert!(delta.removed.is_empty());

        let delta = diff_records(&set, &[]);
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed.len(), 1);
    }

    #[test]
    fn format_delta_no_changes() {
        let delta = Delta::default();
        assert_eq!(format_delta(&delta, false), "No detected changes");
    }

    #[test]
    fn format_delta_marker_only() {
        let delta = Delta::default();
        assert_eq!(format_delta(&delta, true), "Site timestamp changed");
    }

    #[test]
    fn format_delta_lists_counts_and_notables() {
        let prev = vec![record("Old", "", "")];
        let curr = vec![record("New", "", "")];
        let delta = diff_records(&prev, &curr);

        let line = format_delta(&delta, false);
        assert!(line.contains("Δ Items: +1 / −1 / ~0"));
        assert!(line.contains("+ New"));
        assert!(line.contains("− Old"));
    }
}
