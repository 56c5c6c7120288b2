// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Merge of fetched log lists with realtime insert notifications.
//!
//! Inserts are prepended; anything already present by id is ignored, so a
//! notification racing the initial fetch never produces a duplicate row.

use crate::models::{LogEntry, RecordId};
use std::collections::HashSet;

/// Log list as displayed, newest first.
#[derive(Debug, Clone, Default)]
pub struct LogFeed {
    entries: Vec<LogEntry>,
    ids: HashSet<RecordId>,
    /// Ids received by push since the last fetch
    pushed: HashSet<RecordId>,
}

impl LogFeed {
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Prepend a pushed entry. Returns false when it was already listed.
    pub fn apply_insert(&mut self, entry: LogEntry) -> bool {
        if !self.ids.insert(entry.id.clone()) {
            tracing::debug!(log_id = %entry.id, "Ignoring duplicate realtime insert");
            return false;
        }
        self.pushed.insert(entry.id.clone());
        self.entries.insert(0, entry);
        true
    }

    /// Replace the list with a fetch result.
    ///
    /// Pushed entries the fetch did not include stay on top in their
    /// current order; everything else comes from the fetch.
    pub fn apply_fetch(&mut self, fetched: Vec<LogEntry>) {
        let fetched_ids: HashSet<&RecordId> = fetched.iter().map(|e| &e.id).collect();
        let mut merged: Vec<LogEntry> = self
            .entries
            .iter()
            .filter(|e| self.pushed.contains(&e.id) && !fetched_ids.contains(&e.id))
            .cloned()
            .collect();
        drop(fetched_ids);

        let mut ids: HashSet<RecordId> = merged.iter().map(|e| e.id.clone()).collect();
        for entry in fetched {
            if ids.insert(entry.id.clone()) {
                merged.push(entry);
            }
        }

        self.entries = merged;
        self.ids = ids;
        self.pushed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn entry(id: &str, minute: u32) -> LogEntry {
        LogEntry {
            id: RecordId::from(id),
            user_id: Uuid::nil(),
            notes: format!("note {}", id),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap(),
            location: None,
        }
    }

    fn ids(feed: &LogFeed) -> Vec<&str> {
        feed.entries().iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_insert_prepends_once() {
        let mut feed = LogFeed::default();
        feed.apply_fetch(vec![entry("2", 2), entry("1", 1)]);

        assert!(feed.apply_insert(entry("3", 3)));
        assert!(!feed.apply_insert(entry("3", 3)));
        assert_eq!(ids(&feed), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_insert_already_fetched_is_ignored() {
        let mut feed = LogFeed::default();
        feed.apply_fetch(vec![entry("2", 2), entry("1", 1)]);
        assert!(!feed.apply_insert(entry("2", 2)));
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_push_before_fetch_not_duplicated() {
        let mut feed = LogFeed::default();
        // Notification lands before the initial fetch returns, and the fetch includes it.
        feed.apply_insert(entry("3", 3));
        feed.apply_fetch(vec![entry("3", 3), entry("2", 2), entry("1", 1)]);
        assert_eq!(ids(&feed), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_push_missing_from_fetch_is_kept_on_top() {
        let mut feed = LogFeed::default();
        feed.apply_insert(entry("4", 4));
        feed.apply_fetch(vec![entry("2", 2), entry("1", 1)]);
        assert_eq!(ids(&feed), vec!["4", "2", "1"]);
    }

    #[test]
    fn test_refetch_drops_entries_no_longer_visible() {
        let mut feed = LogFeed::default();
        feed.apply_fetch(vec![entry("2", 2), entry("1", 1)]);
        feed.apply_fetch(vec![entry("1", 1)]);
        assert_eq!(ids(&feed), vec!["1"]);
        assert!(!feed.contains(&RecordId::from("2")));
    }
}
