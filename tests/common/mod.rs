// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use buddy_log::backend::{Backend, MemoryBackend, SupabaseBackend};
use buddy_log::config::Config;
use buddy_log::models::{Location, User};
use buddy_log::services::{
    Fix, FixedLocationProvider, LocationError, LocationProvider, Permission, PositionOptions,
};
use buddy_log::App;
use futures_util::future::{self, BoxFuture};
use std::sync::Arc;
use uuid::Uuid;

/// Check if a live backend is configured via environment variable.
#[allow(dead_code)]
pub fn backend_available() -> bool {
    std::env::var("SUPABASE_TEST_URL").is_ok()
}

/// Skip test with message if no live backend is configured.
#[macro_export]
macro_rules! require_backend {
    () => {
        if !crate::common::backend_available() {
            eprintln!("⚠️  Skipping: SUPABASE_TEST_URL not set");
            return;
        }
    };
}

#[allow(dead_code)]
pub fn sf() -> Location {
    Location::new(37.78825, -122.4324).unwrap()
}

/// Unique address so accounts never collide between tests.
#[allow(dead_code)]
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}

/// App over a shared in-memory backend with a fixed location.
#[allow(dead_code)]
pub fn memory_app(backend: &MemoryBackend) -> App<MemoryBackend> {
    memory_app_with_provider(backend, Arc::new(FixedLocationProvider::new(sf())))
}

#[allow(dead_code)]
pub fn memory_app_with_provider(
    backend: &MemoryBackend,
    provider: Arc<dyn LocationProvider>,
) -> App<MemoryBackend> {
    App::new(Config::test_default(), backend.clone(), provider, None)
}

/// Sign up a fresh user on its own app instance.
#[allow(dead_code)]
pub async fn signed_in_app(backend: &MemoryBackend, prefix: &str) -> (App<MemoryBackend>, User) {
    let app = memory_app(backend);
    app.auth
        .sign_up(&unique_email(prefix), "password123")
        .await
        .expect("sign up");
    let user = app.auth.current_user().expect("signed in after sign up");
    (app, user)
}

/// Two users with an accepted friendship.
#[allow(dead_code)]
pub async fn befriend<B: Backend>(requester: &App<B>, recipient: &App<B>) {
    let recipient_id = recipient.auth.current_user().expect("recipient signed in").id;
    let request = requester
        .friendships
        .send_request(&recipient_id.to_string())
        .await
        .expect("send request");
    recipient
        .friendships
        .accept_request(&request.id)
        .await
        .expect("accept request");
}

/// App against the live backend named by `SUPABASE_TEST_URL`.
#[allow(dead_code)]
pub fn live_app() -> App<SupabaseBackend> {
    let mut config = Config::test_default();
    config.supabase_url = std::env::var("SUPABASE_TEST_URL").unwrap();
    config.supabase_anon_key = std::env::var("SUPABASE_TEST_ANON_KEY").unwrap_or_default();
    let backend = SupabaseBackend::new(config.clone());
    App::new(
        config,
        backend,
        Arc::new(FixedLocationProvider::new(sf())),
        None,
    )
}

/// Provider answering with a scripted permission and position result.
#[allow(dead_code)]
pub struct ScriptedLocationProvider {
    pub permission: Permission,
    pub result: Result<Location, LocationError>,
}

impl LocationProvider for ScriptedLocationProvider {
    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        Box::pin(future::ready(self.permission))
    }

    fn current_position<'a>(
        &'a self,
        _options: &'a PositionOptions,
    ) -> BoxFuture<'a, Result<Fix, LocationError>> {
        let result = self.result.clone().map(|location| Fix {
            location,
            timestamp: chrono::Utc::now(),
        });
        Box::pin(future::ready(result))
    }
}
