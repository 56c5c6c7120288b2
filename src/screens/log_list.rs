// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Log list screen: visible entries plus live inserts.

use crate::backend::{Backend, Subscription};
use crate::screens::{Notice, Notices, ViewState};
use crate::services::{AuthContext, LogFeed, LogService};
use crate::time_utils::format_display_date;
use std::fmt;

/// View model for the log list.
pub struct LogListScreen<B> {
    logs: LogService<B>,
    auth: AuthContext,
    state: ViewState<LogFeed>,
    /// Inserts that arrive while no list is loaded
    early: LogFeed,
    subscription: Option<Subscription>,
    pub notices: Notices,
}

impl<B: Backend> LogListScreen<B> {
    pub fn new(logs: LogService<B>, auth: AuthContext) -> Self {
        Self {
            logs,
            auth,
            state: ViewState::Idle,
            early: LogFeed::default(),
            subscription: None,
            notices: Notices::default(),
        }
    }

    pub fn state(&self) -> &ViewState<LogFeed> {
        &self.state
    }

    /// Whether live inserts are currently being received.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribe to inserts, then load the list.
    ///
    /// Subscribing first means nothing inserted during the fetch is missed;
    /// the feed drops the overlap by id.
    pub async fn mount(&mut self) {
        if self.auth.current_user().is_none() {
            self.state = ViewState::Failed("Please log in to view logs".to_string());
            return;
        }

        match self.logs.subscribe_inserts().await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                tracing::warn!(error = %e, "Live log updates unavailable");
                self.notices.push(Notice::new("Live Updates", e.user_message()));
            }
        }

        self.refresh().await;
    }

    /// Reload the list from the backend.
    pub async fn refresh(&mut self) {
        let mut feed = self
            .state
            .begin_reload()
            .unwrap_or_else(|| std::mem::take(&mut self.early));

        match self.logs.list_entries().await {
            Ok(entries) => {
                feed.apply_fetch(entries);
                self.state = ViewState::Loaded(feed);
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching logs");
                self.early = feed;
                self.state = ViewState::Failed(e.user_message());
            }
        }
    }

    fn apply_insert(&mut self, entry: crate::models::LogEntry) -> bool {
        match self.state.data_mut() {
            Some(feed) => feed.apply_insert(entry),
            None => self.early.apply_insert(entry),
        }
    }

    /// Wait for the next live insert and merge it.
    ///
    /// Returns `None` once the subscription has ended, otherwise whether the
    /// insert added a row.
    pub async fn next_update(&mut self) -> Option<bool> {
        let received = self.subscription.as_mut()?.recv().await;
        match received {
            Some(entry) => Some(self.apply_insert(entry)),
            None => {
                tracing::info!("Live log updates ended");
                self.subscription = None;
                None
            }
        }
    }

    /// Merge every insert already received. Returns the number of rows added.
    pub fn drain_updates(&mut self) -> usize {
        let mut added = 0;
        while let Some(entry) = self.subscription.as_mut().and_then(Subscription::try_recv) {
            if self.apply_insert(entry) {
                added += 1;
            }
        }
        added
    }

    /// Release the live subscription.
    pub fn unmount(&mut self) {
        self.subscription = None;
    }
}

impl<B> fmt::Display for LogListScreen<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ViewState::Idle | ViewState::Loading => writeln!(f, "Loading logs..."),
            ViewState::Failed(reason) => writeln!(f, "Error: {}", reason),
            ViewState::Loaded(feed) if feed.is_empty() => writeln!(f, "No log entries yet"),
            ViewState::Loaded(feed) => {
                writeln!(f, "Log Entries")?;
                for entry in feed.entries() {
                    writeln!(f, "- {}", entry.notes)?;
                    write!(f, "  {}", format_display_date(entry.created_at))?;
                    if let Some(location) = entry.location {
                        write!(f, " @ {:.6}, {:.6}", location.latitude, location.longitude)?;
                    }
                    writeln!(f, "  [{}]", entry.id)?;
                }
                Ok(())
            }
        }
    }
}
