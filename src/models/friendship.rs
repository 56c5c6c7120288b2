// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friendship model and the viewer-relative relation derived from it.

use crate::models::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status column of the `friendships` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
        }
    }
}

/// Stored friendship record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: RecordId,
    /// Requester
    pub user1_id: Uuid,
    /// Recipient
    pub user2_id: Uuid,
    pub status: FriendshipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Friendship {
    /// Whether `user_id` is either party.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The party that is not `user_id`, if `user_id` is a party at all.
    pub fn other_party(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }

    /// How this record looks from `viewer`'s side.
    pub fn relation_for(&self, viewer: Uuid) -> Relation {
        match (self.status, self.user1_id == viewer, self.user2_id == viewer) {
            (_, false, false) => Relation::None,
            (FriendshipStatus::Accepted, _, _) => Relation::Accepted,
            (FriendshipStatus::Pending, true, _) => Relation::PendingOutgoing,
            (FriendshipStatus::Pending, false, true) => Relation::PendingIncoming,
        }
    }
}

/// Insert payload for the `friendships` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewFriendship {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub status: FriendshipStatus,
}

/// Relation between the viewer and another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    None,
    /// Viewer sent a request that is not yet accepted
    PendingOutgoing,
    /// Viewer received a request they have not accepted
    PendingIncoming,
    Accepted,
}

impl Relation {
    /// Combine relations from several records; the most advanced one wins.
    pub fn strongest(self, other: Relation) -> Relation {
        fn rank(r: Relation) -> u8 {
            match r {
                Relation::None => 0,
                Relation::PendingOutgoing => 1,
                Relation::PendingIncoming => 2,
                Relation::Accepted => 3,
            }
        }
        if rank(other) > rank(self) {
            other
        } else {
            self
        }
    }

    /// Resolve the relation between `viewer` and `other` from a friendship list.
    pub fn between(friendships: &[Friendship], viewer: Uuid, other: Uuid) -> Relation {
        friendships
            .iter()
            .filter(|f| f.other_party(viewer) == Some(other))
            .map(|f| f.relation_for(viewer))
            .fold(Relation::None, Relation::strongest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friendship(from: Uuid, to: Uuid, status: FriendshipStatus) -> Friendship {
        Friendship {
            id: RecordId::new("1"),
            user1_id: from,
            user2_id: to,
            status,
            created_at: None,
        }
    }

    #[test]
    fn test_relation_four_states() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let pending = vec![friendship(a, b, FriendshipStatus::Pending)];
        assert_eq!(Relation::between(&pending, a, b), Relation::PendingOutgoing);
        assert_eq!(Relation::between(&pending, b, a), Relation::PendingIncoming);
        assert_eq!(Relation::between(&pending, a, c), Relation::None);

        let accepted = vec![friendship(a, b, FriendshipStatus::Accepted)];
        assert_eq!(Relation::between(&accepted, a, b), Relation::Accepted);
        assert_eq!(Relation::between(&accepted, b, a), Relation::Accepted);
    }

    #[test]
    fn test_crossed_requests_resolve_to_strongest() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![
            friendship(a, b, FriendshipStatus::Pending),
            friendship(b, a, FriendshipStatus::Pending),
        ];
        assert_eq!(Relation::between(&rows, a, b), Relation::PendingIncoming);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_value(FriendshipStatus::Accepted).unwrap(),
            serde_json::json!("accepted")
        );
        let parsed: FriendshipStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, FriendshipStatus::Pending);
    }
}
