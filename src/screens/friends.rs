// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friends screen: send requests, accept incoming ones, list friends.

use crate::backend::Backend;
use crate::models::{Friendship, FriendshipStatus, RecordId};
use crate::screens::{Notice, Notices, ViewState};
use crate::services::{AuthContext, FriendshipService};
use std::fmt;
use uuid::Uuid;

/// Friendship rows as seen by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendsOverview {
    pub me: Uuid,
    pub friendships: Vec<Friendship>,
    /// Requests addressed to `me` that are still pending
    pub pending: Vec<Friendship>,
}

impl FriendsOverview {
    /// Accepted friends, by user ID.
    pub fn friends(&self) -> Vec<Uuid> {
        self.friendships
            .iter()
            .filter(|f| f.status == FriendshipStatus::Accepted)
            .filter_map(|f| f.other_party(self.me))
            .collect()
    }

    /// Requests sent by `me` and not yet accepted.
    pub fn outgoing(&self) -> impl Iterator<Item = &Friendship> {
        self.friendships
            .iter()
            .filter(|f| f.status == FriendshipStatus::Pending && f.user1_id == self.me)
    }

    pub fn incoming(&self) -> &[Friendship] {
        &self.pending
    }
}

/// View model for the friends screen.
pub struct FriendsScreen<B> {
    friendships: FriendshipService<B>,
    auth: AuthContext,
    /// Text field holding the user ID to send a request to
    pub target_input: String,
    state: ViewState<FriendsOverview>,
    pub notices: Notices,
}

impl<B: Backend> FriendsScreen<B> {
    pub fn new(friendships: FriendshipService<B>, auth: AuthContext) -> Self {
        Self {
            friendships,
            auth,
            target_input: String::new(),
            state: ViewState::Idle,
            notices: Notices::default(),
        }
    }

    pub fn state(&self) -> &ViewState<FriendsOverview> {
        &self.state
    }

    /// Reload friendships and pending requests.
    pub async fn refresh(&mut self) {
        let Some(me) = self.auth.current_user() else {
            self.state = ViewState::Failed("Please log in to manage friends".to_string());
            return;
        };
        self.state = ViewState::Loading;

        let loaded = async {
            let friendships = self.friendships.friendships().await?;
            let pending = self.friendships.pending_requests().await?;
            crate::error::Result::Ok((friendships, pending))
        }
        .await;

        match loaded {
            Ok((friendships, pending)) => {
                self.state = ViewState::Loaded(FriendsOverview {
                    me: me.id,
                    friendships,
                    pending,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Error loading friendships");
                self.state = ViewState::Failed(e.user_message());
            }
        }
    }

    /// Send a request to the user ID in `target_input`.
    pub async fn send_request(&mut self) -> bool {
        match self.friendships.send_request(&self.target_input).await {
            Ok(_) => {
                self.notices
                    .push(Notice::new("Success", "Friendship request sent!"));
                self.target_input.clear();
                self.refresh().await;
                true
            }
            Err(e) => {
                self.notices.push(Notice::error(e.user_message()));
                false
            }
        }
    }

    /// Accept the incoming request with `id`.
    pub async fn accept(&mut self, id: &RecordId) -> bool {
        match self.friendships.accept_request(id).await {
            Ok(_) => {
                self.notices
                    .push(Notice::new("Success", "Friendship request accepted!"));
                self.refresh().await;
                true
            }
            Err(e) => {
                self.notices.push(Notice::error(e.user_message()));
                false
            }
        }
    }
}

impl<B> fmt::Display for FriendsScreen<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overview = match &self.state {
            ViewState::Idle | ViewState::Loading => return writeln!(f, "Loading friends..."),
            ViewState::Failed(reason) => return writeln!(f, "Error: {}", reason),
            ViewState::Loaded(overview) => overview,
        };

        writeln!(f, "Your user ID: {}", overview.me)?;

        writeln!(f, "Friends")?;
        let friends = overview.friends();
        if friends.is_empty() {
            writeln!(f, "  No friends yet")?;
        }
        for friend in friends {
            writeln!(f, "  {}", friend)?;
        }

        writeln!(f, "Pending Requests")?;
        if overview.pending.is_empty() {
            writeln!(f, "  No pending requests")?;
        }
        for request in &overview.pending {
            writeln!(f, "  [{}] from {}", request.id, request.user1_id)?;
        }

        let outgoing: Vec<&Friendship> = overview.outgoing().collect();
        if !outgoing.is_empty() {
            writeln!(f, "Sent Requests")?;
            for request in outgoing {
                writeln!(f, "  [{}] to {}", request.id, request.user2_id)?;
            }
        }
        Ok(())
    }
}
