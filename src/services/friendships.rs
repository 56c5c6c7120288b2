// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friendship requests between users.
//!
//! A request is a `pending` row created by the requester; the recipient
//! accepts it by flipping the status to `accepted`. The relation between two
//! users is derived from the rows in either direction.

use crate::backend::Backend;
use crate::error::{AppError, Result};
use crate::models::{Friendship, FriendshipStatus, NewFriendship, RecordId, Relation};
use crate::services::auth::AuthService;
use std::sync::Arc;
use uuid::Uuid;

/// Service for sending, accepting and listing friendship requests.
pub struct FriendshipService<B> {
    backend: Arc<B>,
    auth: AuthService<B>,
}

impl<B> Clone for FriendshipService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            auth: self.auth.clone(),
        }
    }
}

impl<B: Backend> FriendshipService<B> {
    pub fn new(backend: Arc<B>, auth: AuthService<B>) -> Self {
        Self { backend, auth }
    }

    /// Send a friendship request to the user with the given ID.
    pub async fn send_request(&self, target: &str) -> Result<Friendship> {
        let target = target.trim();
        if target.is_empty() {
            return Err(AppError::Validation("Please enter a user ID".to_string()));
        }
        let target: Uuid = target
            .parse()
            .map_err(|_| AppError::Validation("That is not a valid user ID".to_string()))?;

        let (token, me) = self.auth.access().await?;
        if target == me.id {
            return Err(AppError::Validation(
                "You cannot send a friend request to yourself".to_string(),
            ));
        }

        let existing = self.backend.select_friendships(&token, me.id).await?;
        match Relation::between(&existing, me.id, target) {
            Relation::None => {}
            Relation::PendingOutgoing => {
                return Err(AppError::Validation(
                    "Friend request already sent".to_string(),
                ))
            }
            Relation::PendingIncoming => {
                return Err(AppError::Validation(
                    "This user has already sent you a request".to_string(),
                ))
            }
            Relation::Accepted => {
                return Err(AppError::Validation("You are already friends".to_string()))
            }
        }

        let request = NewFriendship {
            user1_id: me.id,
            user2_id: target,
            status: FriendshipStatus::Pending,
        };
        let created = self.backend.insert_friendship(&token, &request).await?;
        tracing::info!(friendship_id = %created.id, to = %target, "Friendship request sent");
        Ok(created)
    }

    /// Accept a pending request addressed to the current user.
    pub async fn accept_request(&self, id: &RecordId) -> Result<Friendship> {
        let (token, me) = self.auth.access().await?;

        let pending = self.backend.select_pending_requests(&token, me.id).await?;
        if !pending.iter().any(|f| &f.id == id) {
            return Err(AppError::NotFound(format!(
                "No pending friend request {} for you",
                id
            )));
        }

        let accepted = self
            .backend
            .update_friendship_status(&token, id, FriendshipStatus::Accepted)
            .await?;
        tracing::info!(friendship_id = %accepted.id, "Friendship request accepted");
        Ok(accepted)
    }

    /// All friendships involving the current user, sent and received.
    pub async fn friendships(&self) -> Result<Vec<Friendship>> {
        let (token, me) = self.auth.access().await?;
        self.backend.select_friendships(&token, me.id).await
    }

    /// Pending requests received by the current user.
    pub async fn pending_requests(&self) -> Result<Vec<Friendship>> {
        let (token, me) = self.auth.access().await?;
        self.backend.select_pending_requests(&token, me.id).await
    }

    /// Relation between the current user and `other`.
    pub async fn relation_with(&self, other: Uuid) -> Result<Relation> {
        let (token, me) = self.auth.access().await?;
        let rows = self.backend.select_friendships(&token, me.id).await?;
        Ok(Relation::between(&rows, me.id, other))
    }
}
