// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod feed;
pub mod friendships;
pub mod location;
pub mod logs;

pub use auth::{AuthContext, AuthService, AuthState, SignUpOutcome};
pub use feed::LogFeed;
pub use friendships::FriendshipService;
pub use location::{
    Fix, FixedLocationProvider, LocationError, LocationProvider, LocationService, Permission,
    PositionOptions, UnavailableLocationProvider,
};
pub use logs::LogService;
