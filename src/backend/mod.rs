// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend capability interface.
//!
//! Authentication, storage, row-level authorization and realtime change
//! notification all live in the hosted backend. This module names the
//! operations the app needs from it; `supabase` talks to the hosted service
//! and `memory` is an in-process stand-in enforcing the same access policy.

pub mod memory;
pub mod realtime;
pub mod supabase;

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;

use crate::error::Result;
use crate::models::{
    Friendship, FriendshipStatus, LogEntry, NewFriendship, NewLogEntry, RecordId, Session,
    SignUpResponse, User,
};
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Table names as constants.
pub mod tables {
    pub const LOGS: &str = "logs";
    pub const FRIENDSHIPS: &str = "friendships";
}

/// Operations the app performs against the backend.
///
/// Every table call carries the caller's access token; the backend decides
/// which rows that token may read or write.
pub trait Backend: Send + Sync + 'static {
    // ─── Auth ────────────────────────────────────────────────────

    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<SignUpResponse>> + Send;

    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<Session>> + Send;

    fn refresh_session(&self, refresh_token: &str)
        -> impl Future<Output = Result<Session>> + Send;

    fn get_user(&self, access_token: &str) -> impl Future<Output = Result<User>> + Send;

    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<()>> + Send;

    // ─── Logs ────────────────────────────────────────────────────

    fn insert_log(
        &self,
        access_token: &str,
        entry: &NewLogEntry,
    ) -> impl Future<Output = Result<LogEntry>> + Send;

    /// Visible logs, newest first.
    fn select_logs(&self, access_token: &str) -> impl Future<Output = Result<Vec<LogEntry>>> + Send;

    /// Start receiving rows inserted into `logs` that the caller may see.
    ///
    /// Resolves once the channel is joined, so inserts made after this
    /// returns are delivered.
    fn subscribe_log_inserts(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Subscription>> + Send;

    // ─── Friendships ─────────────────────────────────────────────

    fn insert_friendship(
        &self,
        access_token: &str,
        friendship: &NewFriendship,
    ) -> impl Future<Output = Result<Friendship>> + Send;

    fn update_friendship_status(
        &self,
        access_token: &str,
        id: &RecordId,
        status: FriendshipStatus,
    ) -> impl Future<Output = Result<Friendship>> + Send;

    /// Friendships where `user_id` is either party.
    fn select_friendships(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Friendship>>> + Send;

    /// Pending requests addressed to `user_id`.
    fn select_pending_requests(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Friendship>>> + Send;
}

/// Live feed of inserted log rows.
///
/// Dropping the subscription releases the channel on the backend.
pub struct Subscription {
    rx: mpsc::Receiver<LogEntry>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<LogEntry>, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            rx,
            shutdown: Some(shutdown),
        }
    }

    /// Next inserted row, or `None` once the channel has closed.
    pub async fn recv(&mut self) -> Option<LogEntry> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Option<LogEntry> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            // The forwarding task may already be gone.
            let _ = tx.send(());
        }
    }
}

/// Capacity of the per-subscription delivery queue.
pub(crate) const SUBSCRIPTION_BUFFER: usize = 64;
