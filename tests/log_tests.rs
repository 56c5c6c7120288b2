// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Log creation and visibility against the in-memory backend.

mod common;

use buddy_log::backend::MemoryBackend;
use buddy_log::error::AppError;
use buddy_log::screens::ViewState;
use common::{befriend, memory_app, sf, signed_in_app};

#[tokio::test]
async fn test_create_with_location_round_trips() {
    let backend = MemoryBackend::new();
    let (app, user) = signed_in_app(&backend, "alice").await;

    let created = app
        .logs
        .create_entry("Summit reached", Some(sf()))
        .await
        .unwrap();
    assert_eq!(created.user_id, user.id);
    assert_eq!(created.location, Some(sf()));

    let listed = app.logs.list_entries().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].notes, "Summit reached");
    assert_eq!(listed[0].location, Some(sf()));
}

#[tokio::test]
async fn test_create_without_location_is_listed_but_not_mapped() {
    let backend = MemoryBackend::new();
    let (app, _) = signed_in_app(&backend, "alice").await;

    app.logs.create_entry("Indoors", None).await.unwrap();
    app.logs.create_entry("Outdoors", Some(sf())).await.unwrap();

    assert_eq!(app.logs.list_entries().await.unwrap().len(), 2);
    let located = app.logs.list_located_entries().await.unwrap();
    assert_eq!(located.len(), 1);
    assert_eq!(located[0].notes, "Outdoors");
}

#[tokio::test]
async fn test_notes_are_required() {
    let backend = MemoryBackend::new();
    let (app, _) = signed_in_app(&backend, "alice").await;

    let err = app.logs.create_entry("   ", None).await.unwrap_err();
    assert_eq!(err.user_message(), "Please enter some notes");
    assert_eq!(backend.log_count(), 0);
}

#[tokio::test]
async fn test_create_requires_sign_in() {
    let backend = MemoryBackend::new();
    let app = memory_app(&backend);

    let err = app.logs.create_entry("hello", None).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "You must be logged in to create a log entry"
    );
    assert!(matches!(
        app.logs.list_entries().await,
        Err(AppError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let backend = MemoryBackend::new();
    let (app, _) = signed_in_app(&backend, "alice").await;

    for notes in ["first", "second", "third"] {
        app.logs.create_entry(notes, None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let notes: Vec<String> = app
        .logs
        .list_entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.notes)
        .collect();
    assert_eq!(notes, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_friend_logs_visible_strangers_hidden() {
    let backend = MemoryBackend::new();
    let (alice, _) = signed_in_app(&backend, "alice").await;
    let (bob, _) = signed_in_app(&backend, "bob").await;
    let (carol, _) = signed_in_app(&backend, "carol").await;

    befriend(&alice, &bob).await;
    alice.logs.create_entry("from alice", None).await.unwrap();
    carol.logs.create_entry("from carol", None).await.unwrap();

    let seen_by_bob: Vec<String> = bob
        .logs
        .list_entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.notes)
        .collect();
    assert_eq!(seen_by_bob, vec!["from alice"]);

    let seen_by_carol = carol.logs.list_entries().await.unwrap();
    assert_eq!(seen_by_carol.len(), 1);
    assert_eq!(seen_by_carol[0].notes, "from carol");
}

#[tokio::test]
async fn test_pending_request_does_not_share_logs() {
    let backend = MemoryBackend::new();
    let (alice, _) = signed_in_app(&backend, "alice").await;
    let (bob, bob_user) = signed_in_app(&backend, "bob").await;

    alice
        .friendships
        .send_request(&bob_user.id.to_string())
        .await
        .unwrap();
    alice.logs.create_entry("not yet shared", None).await.unwrap();

    assert!(bob.logs.list_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_screen_reports_success() {
    let backend = MemoryBackend::new();
    let (app, _) = signed_in_app(&backend, "alice").await;

    let mut screen = app.create_log_screen();
    screen.notes = "From the screen".to_string();
    let created = screen.submit().await.expect("entry created");

    assert_eq!(created.location, Some(sf()));
    assert!(screen.notes.is_empty());
    assert!(matches!(screen.state(), ViewState::Loaded(_)));
    let notices = screen.notices.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Success");
    assert_eq!(notices[0].message, "Log entry created successfully!");
}

#[tokio::test]
async fn test_log_list_screen_requires_user() {
    let backend = MemoryBackend::new();
    let app = memory_app(&backend);

    let mut screen = app.log_list_screen();
    screen.mount().await;
    assert_eq!(screen.state().error(), Some("Please log in to view logs"));
    assert!(!screen.is_live());
}

#[tokio::test]
async fn test_log_list_screen_renders_empty_state() {
    let backend = MemoryBackend::new();
    let (app, _) = signed_in_app(&backend, "alice").await;

    let mut screen = app.log_list_screen();
    screen.mount().await;
    assert_eq!(screen.to_string(), "No log entries yet\n");
}
