// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Buddy Log: share short geotagged notes with friends.
//!
//! Users sign in, write log entries optionally tagged with their position,
//! see their own and their friends' entries as a live list or on a map, and
//! manage friendship requests. Storage, auth and realtime delivery come from
//! a hosted backend reached through the [`backend::Backend`] trait.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod screens;
pub mod services;
pub mod session_store;
pub mod time_utils;

use backend::Backend;
use config::Config;
use screens::{
    CreateLogScreen, FriendsScreen, LogListScreen, LoginScreen, MapScreen, SignupScreen,
};
use services::{
    AuthService, FriendshipService, LocationProvider, LocationService, LogService,
    PositionOptions,
};
use session_store::SessionStore;
use std::sync::Arc;

/// Shared application services.
pub struct App<B> {
    pub config: Config,
    pub backend: Arc<B>,
    pub auth: AuthService<B>,
    pub logs: LogService<B>,
    pub friendships: FriendshipService<B>,
    pub location: LocationService,
}

impl<B: Backend> App<B> {
    pub fn new(
        config: Config,
        backend: B,
        provider: Arc<dyn LocationProvider>,
        store: Option<SessionStore>,
    ) -> Self {
        let backend = Arc::new(backend);
        let auth = AuthService::new(Arc::clone(&backend), store);
        let logs = LogService::new(Arc::clone(&backend), auth.clone());
        let friendships = FriendshipService::new(Arc::clone(&backend), auth.clone());
        let location = LocationService::new(provider, PositionOptions::from_config(&config));

        Self {
            config,
            backend,
            auth,
            logs,
            friendships,
            location,
        }
    }

    pub fn login_screen(&self) -> LoginScreen<B> {
        LoginScreen::new(self.auth.clone())
    }

    pub fn signup_screen(&self) -> SignupScreen<B> {
        SignupScreen::new(self.auth.clone())
    }

    pub fn log_list_screen(&self) -> LogListScreen<B> {
        LogListScreen::new(self.logs.clone(), self.auth.context().clone())
    }

    pub fn create_log_screen(&self) -> CreateLogScreen<B> {
        CreateLogScreen::new(self.logs.clone(), self.location.clone())
    }

    pub fn map_screen(&self) -> MapScreen<B> {
        MapScreen::new(self.logs.clone(), self.location.clone())
    }

    pub fn friends_screen(&self) -> FriendsScreen<B> {
        FriendsScreen::new(self.friendships.clone(), self.auth.context().clone())
    }
}
