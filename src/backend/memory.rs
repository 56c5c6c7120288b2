// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend for offline use and tests.
//!
//! Mirrors the hosted service's behavior closely enough for the app:
//! - Signed HS256 access tokens, verified on every call
//! - Row-level policy: own logs plus logs of accepted friends; friendship
//!   rows visible to their two parties; only the recipient may update status
//! - Realtime inserts filtered by the same policy at delivery time
//!
//! Credentials and rows live only in memory for the lifetime of the value.

use crate::backend::{Backend, Subscription, SUBSCRIPTION_BUFFER};
use crate::error::{AppError, Result};
use crate::models::{
    Friendship, FriendshipStatus, LogEntry, NewFriendship, NewLogEntry, RecordId, Session,
    SignUpResponse, User,
};
use chrono::{Duration, Utc};
use dashmap::{DashMap, DashSet};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

/// Lifetime of minted access tokens.
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;
const INSERT_BROADCAST_CAPACITY: usize = 256;

/// Access token claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject (user ID)
    sub: String,
    /// Expiration time (Unix timestamp)
    exp: usize,
    /// Issued at (Unix timestamp)
    iat: usize,
    /// Token ID, so tokens minted within the same second differ
    jti: String,
}

struct Account {
    user: User,
    password: String,
    confirmed: bool,
}

struct Inner {
    signing_key: Vec<u8>,
    require_confirmation: bool,
    /// Keyed by lowercased email
    accounts: DashMap<String, Account>,
    refresh_tokens: DashMap<String, Uuid>,
    revoked: DashSet<String>,
    logs: DashMap<RecordId, LogEntry>,
    friendships: DashMap<RecordId, Friendship>,
    next_id: AtomicU64,
    inserts: broadcast::Sender<LogEntry>,
}

/// In-memory backend.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Backend where sign-up immediately yields a session.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Backend where sign-up requires email confirmation before sign-in.
    pub fn with_email_confirmation() -> Self {
        Self::build(true)
    }

    fn build(require_confirmation: bool) -> Self {
        let (inserts, _) = broadcast::channel(INSERT_BROADCAST_CAPACITY);
        let signing_key = [Uuid::new_v4().into_bytes(), Uuid::new_v4().into_bytes()].concat();
        Self {
            inner: Arc::new(Inner {
                signing_key,
                require_confirmation,
                accounts: DashMap::new(),
                refresh_tokens: DashMap::new(),
                revoked: DashSet::new(),
                logs: DashMap::new(),
                friendships: DashMap::new(),
                next_id: AtomicU64::new(1),
                inserts,
            }),
        }
    }

    /// Mark an account's email as confirmed (the link in the confirmation mail).
    pub fn confirm_email(&self, email: &str) -> Result<()> {
        let mut account = self
            .inner
            .accounts
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| AppError::NotFound(format!("Account {}", email)))?;
        account.confirmed = true;
        Ok(())
    }

    /// Number of stored log rows, regardless of visibility.
    pub fn log_count(&self) -> usize {
        self.inner.logs.len()
    }
}

impl Inner {
    fn next_record_id(&self) -> RecordId {
        RecordId::new(self.next_id.fetch_add(1, Ordering::Relaxed).to_string())
    }

    fn mint_session(&self, user: &User) -> Result<Session> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(ACCESS_TOKEN_TTL_SECS);
        let claims = Claims {
            sub: user.id.to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
        };
        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("sign token: {}", e)))?;

        let refresh_token = Uuid::new_v4().simple().to_string();
        self.refresh_tokens.insert(refresh_token.clone(), user.id);

        Ok(Session {
            access_token,
            refresh_token,
            expires_at,
            user: user.clone(),
        })
    }

    /// Resolve the caller behind an access token.
    fn authorize(&self, access_token: &str) -> Result<Uuid> {
        if self.revoked.contains(access_token) {
            return Err(AppError::InvalidSession);
        }
        let key = DecodingKey::from_secret(&self.signing_key);
        let data = decode::<Claims>(access_token, &key, &Validation::new(Algorithm::HS256))
            .map_err(|_| AppError::InvalidSession)?;
        data.claims
            .sub
            .parse()
            .map_err(|_| AppError::InvalidSession)
    }

    fn user_by_id(&self, id: Uuid) -> Option<User> {
        self.accounts
            .iter()
            .find(|a| a.user.id == id)
            .map(|a| a.user.clone())
    }

    fn are_friends(&self, a: Uuid, b: Uuid) -> bool {
        self.friendships.iter().any(|f| {
            f.status == FriendshipStatus::Accepted
                && ((f.user1_id == a && f.user2_id == b) || (f.user1_id == b && f.user2_id == a))
        })
    }

    /// Read policy on `logs`.
    fn can_read_log(&self, viewer: Uuid, entry: &LogEntry) -> bool {
        entry.user_id == viewer || self.are_friends(viewer, entry.user_id)
    }
}

impl Backend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse> {
        let key = email.trim().to_lowercase();
        if self.inner.accounts.contains_key(&key) {
            return Err(AppError::Backend {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.trim().to_string()),
        };
        let confirmed = !self.inner.require_confirmation;
        self.inner.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );
        tracing::debug!(user_id = %user.id, confirmed, "Account created");

        let session = if confirmed {
            Some(self.inner.mint_session(&user)?)
        } else {
            None
        };
        Ok(SignUpResponse { user, session })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let invalid = || AppError::Backend {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };

        let user = {
            let account = self
                .inner
                .accounts
                .get(&email.trim().to_lowercase())
                .ok_or_else(invalid)?;
            if account.password != password {
                return Err(invalid());
            }
            if !account.confirmed {
                return Err(AppError::Backend {
                    status: 400,
                    message: "Email not confirmed".to_string(),
                });
            }
            account.user.clone()
        };
        self.inner.mint_session(&user)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        // Refresh tokens are single use.
        let (_, user_id) = self
            .inner
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AppError::InvalidSession)?;
        let user = self
            .inner
            .user_by_id(user_id)
            .ok_or(AppError::InvalidSession)?;
        self.inner.mint_session(&user)
    }

    async fn get_user(&self, access_token: &str) -> Result<User> {
        let id = self.inner.authorize(access_token)?;
        self.inner.user_by_id(id).ok_or(AppError::InvalidSession)
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let id = self.inner.authorize(access_token)?;
        self.inner.revoked.insert(access_token.to_string());
        self.inner.refresh_tokens.retain(|_, owner| *owner != id);
        Ok(())
    }

    async fn insert_log(&self, access_token: &str, entry: &NewLogEntry) -> Result<LogEntry> {
        let caller = self.inner.authorize(access_token)?;
        if entry.user_id != caller {
            return Err(AppError::Forbidden(
                "new row violates row-level security policy for table \"logs\"".to_string(),
            ));
        }

        let stored = LogEntry {
            id: self.inner.next_record_id(),
            user_id: entry.user_id,
            notes: entry.notes.clone(),
            created_at: entry.created_at,
            location: entry.location,
        };
        self.inner.logs.insert(stored.id.clone(), stored.clone());
        // No receivers is fine.
        let _ = self.inner.inserts.send(stored.clone());
        Ok(stored)
    }

    async fn select_logs(&self, access_token: &str) -> Result<Vec<LogEntry>> {
        let viewer = self.inner.authorize(access_token)?;
        let mut visible: Vec<LogEntry> = self
            .inner
            .logs
            .iter()
            .filter(|e| self.inner.can_read_log(viewer, e.value()))
            .map(|e| e.value().clone())
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(visible)
    }

    async fn subscribe_log_inserts(&self, access_token: &str) -> Result<Subscription> {
        let viewer = self.inner.authorize(access_token)?;
        let mut inserts = self.inner.inserts.subscribe();
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => return,
                    received = inserts.recv() => match received {
                        Ok(entry) => {
                            if inner.can_read_log(viewer, &entry) && tx.send(entry).await.is_err() {
                                return;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Subscriber lagged; inserts dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }
        });

        Ok(Subscription::new(rx, shutdown_tx))
    }

    async fn insert_friendship(
        &self,
        access_token: &str,
        friendship: &NewFriendship,
    ) -> Result<Friendship> {
        let caller = self.inner.authorize(access_token)?;
        if friendship.user1_id != caller {
            return Err(AppError::Forbidden(
                "new row violates row-level security policy for table \"friendships\"".to_string(),
            ));
        }
        if self.inner.user_by_id(friendship.user2_id).is_none() {
            return Err(AppError::Backend {
                status: 409,
                message: "insert or update on table \"friendships\" violates foreign key constraint"
                    .to_string(),
            });
        }

        let stored = Friendship {
            id: self.inner.next_record_id(),
            user1_id: friendship.user1_id,
            user2_id: friendship.user2_id,
            status: friendship.status,
            created_at: Some(Utc::now()),
        };
        self.inner
            .friendships
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_friendship_status(
        &self,
        access_token: &str,
        id: &RecordId,
        status: FriendshipStatus,
    ) -> Result<Friendship> {
        let caller = self.inner.authorize(access_token)?;
        match self.inner.friendships.get_mut(id) {
            Some(mut row) if row.user2_id == caller => {
                row.status = status;
                Ok(row.clone())
            }
            // Rows the caller may not update look the same as missing rows.
            _ => Err(AppError::NotFound(format!("Friendship request {}", id))),
        }
    }

    async fn select_friendships(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Friendship>> {
        let caller = self.inner.authorize(access_token)?;
        Ok(self
            .inner
            .friendships
            .iter()
            .filter(|f| f.involves(caller) && f.involves(user_id))
            .map(|f| f.value().clone())
            .collect())
    }

    async fn select_pending_requests(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Friendship>> {
        let caller = self.inner.authorize(access_token)?;
        Ok(self
            .inner
            .friendships
            .iter()
            .filter(|f| {
                f.involves(caller)
                    && f.user2_id == user_id
                    && f.status == FriendshipStatus::Pending
            })
            .map(|f| f.value().clone())
            .collect())
    }
}
