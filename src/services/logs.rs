// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Log entry operations for the signed-in user.

use crate::backend::{Backend, Subscription};
use crate::error::{AppError, Result};
use crate::models::{Location, LogEntry, NewLogEntry};
use crate::services::auth::AuthService;
use chrono::Utc;
use std::sync::Arc;

/// Service for creating and reading log entries.
pub struct LogService<B> {
    backend: Arc<B>,
    auth: AuthService<B>,
}

impl<B> Clone for LogService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            auth: self.auth.clone(),
        }
    }
}

impl<B: Backend> LogService<B> {
    pub fn new(backend: Arc<B>, auth: AuthService<B>) -> Self {
        Self { backend, auth }
    }

    /// Create a log entry for the current user, stamped with the current time.
    pub async fn create_entry(&self, notes: &str, location: Option<Location>) -> Result<LogEntry> {
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(AppError::Validation("Please enter some notes".to_string()));
        }

        let (token, user) = self.auth.access().await.map_err(|e| match e {
            AppError::Unauthenticated => AppError::Validation(
                "You must be logged in to create a log entry".to_string(),
            ),
            other => other,
        })?;

        let entry = NewLogEntry {
            user_id: user.id,
            notes: notes.to_string(),
            created_at: Utc::now(),
            location,
        };

        tracing::info!(user_id = %user.id, has_location = location.is_some(), "Creating log entry");
        let created = self
            .backend
            .insert_log(&token, &entry)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error creating log entry"))?;
        tracing::info!(log_id = %created.id, "Log entry created");
        Ok(created)
    }

    /// All entries the current user may see, newest first.
    pub async fn list_entries(&self) -> Result<Vec<LogEntry>> {
        let (token, user) = self.auth.access().await?;
        let entries = self
            .backend
            .select_logs(&token)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error fetching log entries"))?;
        tracing::debug!(user_id = %user.id, count = entries.len(), "Fetched log entries");
        Ok(entries)
    }

    /// Visible entries that carry a location.
    pub async fn list_located_entries(&self) -> Result<Vec<LogEntry>> {
        let entries = self.list_entries().await?;
        let total = entries.len();
        let located: Vec<LogEntry> = entries
            .into_iter()
            .filter(|e| e.location.is_some())
            .collect();
        tracing::debug!(
            located = located.len(),
            total,
            "Filtered log entries with location data"
        );
        Ok(located)
    }

    /// Subscribe to newly inserted entries visible to the current user.
    pub async fn subscribe_inserts(&self) -> Result<Subscription> {
        let (token, _) = self.auth.access().await?;
        self.backend.subscribe_log_inserts(&token).await
    }
}
