// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User and session models issued by the backend's auth subsystem.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Auth user ID (referenced by `logs.user_id` and `friendships.user*_id`)
    pub id: Uuid,
    /// Email address (absent for some identity providers)
    #[serde(default)]
    pub email: Option<String>,
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for table and realtime calls
    pub access_token: String,
    /// Token used to obtain a new access token
    pub refresh_token: String,
    /// When the access token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// The user this session belongs to
    pub user: User,
}

impl Session {
    /// Whether the access token expires within `margin` of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

/// Outcome of a sign-up call.
///
/// The backend withholds the session when email confirmation is required.
#[derive(Debug, Clone)]
pub struct SignUpResponse {
    pub user: User,
    pub session: Option<Session>,
}
