// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up, sign-in, session persistence and auth-driven navigation.

mod common;

use buddy_log::backend::{Backend, MemoryBackend};
use buddy_log::config::Config;
use buddy_log::navigation::{Navigator, Route, Stack};
use buddy_log::services::{FixedLocationProvider, SignUpOutcome};
use buddy_log::session_store::SessionStore;
use buddy_log::App;
use common::{memory_app, sf, unique_email};
use std::sync::Arc;

fn app_with_store(backend: &MemoryBackend, store: SessionStore) -> App<MemoryBackend> {
    App::new(
        Config::test_default(),
        backend.clone(),
        Arc::new(FixedLocationProvider::new(sf())),
        Some(store),
    )
}

#[tokio::test]
async fn test_sign_up_signs_in() {
    let backend = MemoryBackend::new();
    let app = memory_app(&backend);
    let email = unique_email("new");

    let outcome = app.auth.sign_up(&email, "password123").await.unwrap();
    let user = match outcome {
        SignUpOutcome::SignedIn(user) => user,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(user.email.as_deref(), Some(email.as_str()));
    assert_eq!(app.auth.current_user(), Some(user));
}

#[tokio::test]
async fn test_sign_up_with_confirmation() {
    let backend = MemoryBackend::with_email_confirmation();
    let app = memory_app(&backend);
    let email = unique_email("confirm");

    let mut screen = app.signup_screen();
    screen.email = email.clone();
    screen.password = "password123".to_string();
    let outcome = screen.submit().await;
    assert_eq!(
        outcome,
        Some(SignUpOutcome::ConfirmationRequired {
            email: email.clone()
        })
    );
    let notices = screen.notices.drain();
    assert_eq!(notices[0].title, "Check your email");
    assert!(app.auth.current_user().is_none());

    let mut login = app.login_screen();
    login.email = email.clone();
    login.password = "password123".to_string();
    assert!(login.submit().await.is_none());
    assert_eq!(login.notices.drain()[0].message, "Email not confirmed");

    backend.confirm_email(&email).unwrap();
    assert!(login.submit().await.is_some());
    assert!(app.auth.current_user().is_some());
}

#[tokio::test]
async fn test_form_validation_messages() {
    let backend = MemoryBackend::new();
    let app = memory_app(&backend);

    let mut signup = app.signup_screen();
    signup.email = "alice@example.com".to_string();
    signup.password = "short".to_string();
    assert!(signup.submit().await.is_none());
    let notice = &signup.notices.drain()[0];
    assert_eq!(notice.title, "Error");
    assert_eq!(notice.message, "Password must be at least 6 characters long");

    signup.email = "not-an-email".to_string();
    signup.password = "password123".to_string();
    assert!(signup.submit().await.is_none());
    assert_eq!(
        signup.notices.drain()[0].message,
        "Please enter a valid email address"
    );

    let mut login = app.login_screen();
    assert!(login.submit().await.is_none());
    assert_eq!(login.notices.drain()[0].message, "Please fill in all fields");
}

#[tokio::test]
async fn test_wrong_password_is_a_login_error() {
    let backend = MemoryBackend::new();
    let app = memory_app(&backend);
    let email = unique_email("pw");
    app.auth.sign_up(&email, "password123").await.unwrap();
    app.auth.sign_out().await;

    let mut login = app.login_screen();
    login.email = email;
    login.password = "wrong-password".to_string();
    assert!(login.submit().await.is_none());
    let notice = &login.notices.drain()[0];
    assert_eq!(notice.title, "Login Error");
    assert_eq!(notice.message, "Invalid login credentials");
}

#[tokio::test]
async fn test_sign_out_clears_session() {
    let backend = MemoryBackend::new();
    let app = memory_app(&backend);
    app.auth
        .sign_up(&unique_email("bye"), "password123")
        .await
        .unwrap();

    app.auth.sign_out().await;
    assert!(app.auth.current_user().is_none());
    assert!(app.logs.list_entries().await.is_err());
}

#[tokio::test]
async fn test_session_restored_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = MemoryBackend::new();

    let first = app_with_store(&backend, SessionStore::new(&path));
    first
        .auth
        .sign_up(&unique_email("persist"), "password123")
        .await
        .unwrap();
    let user = first.auth.current_user().unwrap();
    assert!(path.exists());

    let second = app_with_store(&backend, SessionStore::new(&path));
    assert_eq!(second.auth.restore().await, Some(user.clone()));
    assert_eq!(second.auth.current_user(), Some(user));
    assert!(!second.auth.context().snapshot().loading);

    second.auth.sign_out().await;
    assert!(!path.exists());

    let third = app_with_store(&backend, SessionStore::new(&path));
    assert_eq!(third.auth.restore().await, None);
}

#[tokio::test]
async fn test_revoked_stored_session_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = MemoryBackend::new();

    let first = app_with_store(&backend, SessionStore::new(&path));
    first
        .auth
        .sign_up(&unique_email("revoked"), "password123")
        .await
        .unwrap();

    // Revoke on the backend only, leaving the file in place.
    let session = SessionStore::new(&path).load().unwrap().unwrap();
    backend.sign_out(&session.access_token).await.unwrap();

    let second = app_with_store(&backend, SessionStore::new(&path));
    assert_eq!(second.auth.restore().await, None);
    assert!(second.auth.current_user().is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_navigation_follows_auth_state() {
    let backend = MemoryBackend::new();
    let app = memory_app(&backend);

    let mut nav = Navigator::new(&app.auth.context().snapshot());
    assert_eq!(nav.stack(), Stack::Auth);
    assert_eq!(nav.current(), Route::Login);
    assert!(nav.navigate(Route::LogList).is_err());

    app.auth
        .sign_up(&unique_email("nav"), "password123")
        .await
        .unwrap();
    assert!(nav.sync(&app.auth.context().snapshot()));
    assert_eq!(nav.current(), Route::LogList);
    nav.navigate(Route::CreateLog).unwrap();
    assert_eq!(nav.current(), Route::CreateLog);

    app.auth.sign_out().await;
    assert!(nav.sync(&app.auth.context().snapshot()));
    assert_eq!(nav.current(), Route::Login);
}
