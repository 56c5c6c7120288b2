// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod friendship;
pub mod log_entry;
pub mod user;

pub use friendship::{Friendship, FriendshipStatus, NewFriendship, Relation};
pub use log_entry::{Location, LogEntry, NewLogEntry, RecordId};
pub use user::{Session, SignUpResponse, User};
