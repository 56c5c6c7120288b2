// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Create-log screen.

use crate::backend::Backend;
use crate::models::LogEntry;
use crate::screens::{Notice, Notices, ViewState};
use crate::services::{LocationService, LogService};

/// View model for composing a new log entry.
pub struct CreateLogScreen<B> {
    logs: LogService<B>,
    location: LocationService,
    pub notes: String,
    /// Try to tag the entry with the current position
    pub attach_location: bool,
    state: ViewState<LogEntry>,
    pub notices: Notices,
}

impl<B: Backend> CreateLogScreen<B> {
    pub fn new(logs: LogService<B>, location: LocationService) -> Self {
        Self {
            logs,
            location,
            notes: String::new(),
            attach_location: true,
            state: ViewState::Idle,
            notices: Notices::default(),
        }
    }

    pub fn state(&self) -> &ViewState<LogEntry> {
        &self.state
    }

    /// Submit the form. A missing location never blocks creation.
    pub async fn submit(&mut self) -> Option<LogEntry> {
        if self.state.is_loading() {
            return None;
        }
        if self.notes.trim().is_empty() {
            self.notices.push(Notice::error("Please enter some notes"));
            return None;
        }

        self.state = ViewState::Loading;

        let location = if self.attach_location {
            match self.location.current_position().await {
                Ok(location) => Some(location),
                Err(e) => {
                    tracing::info!(error = %e, "Creating log entry without location");
                    self.notices.push(Notice::new(e.title(), e.user_message()));
                    None
                }
            }
        } else {
            None
        };

        match self.logs.create_entry(&self.notes, location).await {
            Ok(entry) => {
                self.notices
                    .push(Notice::new("Success", "Log entry created successfully!"));
                self.notes.clear();
                self.state = ViewState::Loaded(entry.clone());
                Some(entry)
            }
            Err(e) => {
                let message = e.user_message();
                self.notices.push(Notice::error(message.clone()));
                self.state = ViewState::Failed(message);
                None
            }
        }
    }
}
