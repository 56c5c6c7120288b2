// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted backend client (Supabase auth + PostgREST + Realtime).
//!
//! Handles:
//! - Email/password sign-up, sign-in, refresh and sign-out
//! - Row inserts, selects and status updates on `logs` and `friendships`
//! - Error body decoding into [`AppError`]

use crate::backend::{realtime, tables, Backend, Subscription};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    Friendship, FriendshipStatus, LogEntry, NewFriendship, NewLogEntry, RecordId, Session,
    SignUpResponse, User,
};
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client for the hosted backend.
#[derive(Clone)]
pub struct SupabaseBackend {
    http: reqwest::Client,
    config: Config,
}

impl SupabaseBackend {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.config.rest_url(), table)
    }

    /// Request builder with the API key and the caller's bearer token.
    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        access_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let bearer = access_token.unwrap_or(&self.config.supabase_anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.config.supabase_anon_key)
            .bearer_auth(bearer)
    }

    /// POST a password grant or refresh grant to the token endpoint.
    async fn token_grant<T: Serialize + ?Sized>(&self, grant_type: &str, body: &T) -> Result<Session> {
        let url = format!("{}/token", self.config.auth_url());
        let response = self
            .request(reqwest::Method::POST, &url, None)
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await?;

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn select_rows<T: DeserializeOwned>(
        &self,
        access_token: &str,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let response = self
            .request(reqwest::Method::GET, &self.table_url(table), Some(access_token))
            .query(query)
            .send()
            .await?;

        check_response_json(response).await
    }

    /// Insert a single row and return the stored representation.
    async fn insert_row<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        access_token: &str,
        table: &str,
        row: &B,
    ) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, &self.table_url(table), Some(access_token))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let rows: Vec<T> = check_response_json(response).await?;
        rows.into_iter().next().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("insert into {} returned no rows", table))
        })
    }
}

impl Backend for SupabaseBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse> {
        let url = format!("{}/signup", self.config.auth_url());
        let response = self
            .request(reqwest::Method::POST, &url, None)
            .json(&Credentials { email, password })
            .send()
            .await?;

        let body: serde_json::Value = check_response_json(response).await?;
        parse_sign_up(body, Utc::now())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .token_grant("password", &Credentials { email, password })
            .await?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        #[derive(Serialize)]
        struct RefreshBody<'a> {
            refresh_token: &'a str,
        }

        self.token_grant("refresh_token", &RefreshBody { refresh_token })
            .await
            .map_err(|e| match e {
                AppError::Backend { status, .. } if status == 400 || status == 401 => {
                    AppError::InvalidSession
                }
                other => other,
            })
    }

    async fn get_user(&self, access_token: &str) -> Result<User> {
        let url = format!("{}/user", self.config.auth_url());
        let response = self
            .request(reqwest::Method::GET, &url, Some(access_token))
            .send()
            .await?;

        check_response_json(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = format!("{}/logout", self.config.auth_url());
        let response = self
            .request(reqwest::Method::POST, &url, Some(access_token))
            .send()
            .await?;

        check_response(response).await
    }

    async fn insert_log(&self, access_token: &str, entry: &NewLogEntry) -> Result<LogEntry> {
        self.insert_row(access_token, tables::LOGS, entry).await
    }

    async fn select_logs(&self, access_token: &str) -> Result<Vec<LogEntry>> {
        self.select_rows(
            access_token,
            tables::LOGS,
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn subscribe_log_inserts(&self, access_token: &str) -> Result<Subscription> {
        realtime::subscribe_inserts(&self.config, tables::LOGS, access_token).await
    }

    async fn insert_friendship(
        &self,
        access_token: &str,
        friendship: &NewFriendship,
    ) -> Result<Friendship> {
        self.insert_row(access_token, tables::FRIENDSHIPS, friendship)
            .await
    }

    async fn update_friendship_status(
        &self,
        access_token: &str,
        id: &RecordId,
        status: FriendshipStatus,
    ) -> Result<Friendship> {
        #[derive(Serialize)]
        struct StatusPatch {
            status: FriendshipStatus,
        }

        let response = self
            .request(
                reqwest::Method::PATCH,
                &self.table_url(tables::FRIENDSHIPS),
                Some(access_token),
            )
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .json(&StatusPatch { status })
            .send()
            .await?;

        // Rows hidden by the access policy are silently not updated.
        let rows: Vec<Friendship> = check_response_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Friendship request {}", id)))
    }

    async fn select_friendships(&self, access_token: &str, user_id: Uuid) -> Result<Vec<Friendship>> {
        self.select_rows(
            access_token,
            tables::FRIENDSHIPS,
            &[
                ("select", "*".to_string()),
                ("or", format!("(user1_id.eq.{0},user2_id.eq.{0})", user_id)),
            ],
        )
        .await
    }

    async fn select_pending_requests(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Friendship>> {
        self.select_rows(
            access_token,
            tables::FRIENDSHIPS,
            &[
                ("select", "*".to_string()),
                ("user2_id", format!("eq.{}", user_id)),
                ("status", format!("eq.{}", FriendshipStatus::Pending.as_str())),
            ],
        )
        .await
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(3600)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Decode a sign-up body.
///
/// With auto-confirm the body is a full token response; when email
/// confirmation is pending it is the bare user (or `{ user, session: null }`).
fn parse_sign_up(body: serde_json::Value, now: DateTime<Utc>) -> Result<SignUpResponse> {
    let parse_err = |e: serde_json::Error| {
        AppError::Internal(anyhow::anyhow!("Unexpected sign-up response: {}", e))
    };

    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body).map_err(parse_err)?;
        let session = token.into_session(now);
        return Ok(SignUpResponse {
            user: session.user.clone(),
            session: Some(session),
        });
    }

    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: User = serde_json::from_value(user_value).map_err(parse_err)?;
    Ok(SignUpResponse {
        user,
        session: None,
    })
}

/// Error body shapes used by the auth and REST endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Map a non-success response to an [`AppError`].
fn error_from_body(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED if message.to_lowercase().contains("jwt") => {
            AppError::InvalidSession
        }
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::Backend {
            status: status.as_u16(),
            message,
        },
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, "Backend request failed");
    Err(error_from_body(status, &body))
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "Backend request failed");
        return Err(error_from_body(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_with_session() {
        let now = Utc::now();
        let body = serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "00000000-0000-0000-0000-0000000000aa", "email": "a@example.com" }
        });

        let response = parse_sign_up(body, now).unwrap();
        let session = response.session.expect("session present");
        assert_eq!(session.access_token, "at");
        assert_eq!(session.expires_at, now + Duration::seconds(3600));
        assert_eq!(response.user.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_sign_up_pending_confirmation() {
        let bare = serde_json::json!({
            "id": "00000000-0000-0000-0000-0000000000bb",
            "email": "b@example.com",
            "confirmation_sent_at": "2026-01-01T00:00:00Z"
        });
        assert!(parse_sign_up(bare, Utc::now()).unwrap().session.is_none());

        let wrapped = serde_json::json!({
            "user": { "id": "00000000-0000-0000-0000-0000000000bb" },
            "session": null
        });
        assert!(parse_sign_up(wrapped, Utc::now()).unwrap().session.is_none());
    }

    #[test]
    fn test_error_body_messages() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.user_message(), "Invalid login credentials");

        let err = error_from_body(
            StatusCode::FORBIDDEN,
            r#"{"code":"42501","message":"new row violates row-level security policy"}"#,
        );
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = error_from_body(StatusCode::UNAUTHORIZED, r#"{"message":"JWT expired"}"#);
        assert!(err.is_auth_error());

        let err = error_from_body(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.user_message(), "upstream down");
    }

    #[test]
    fn test_expires_at_takes_precedence() {
        let token = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: Some(10),
            expires_at: Some(1_900_000_000),
            user: User {
                id: Uuid::nil(),
                email: None,
            },
        };
        let session = token.into_session(Utc::now());
        assert_eq!(session.expires_at.timestamp(), 1_900_000_000);
    }
}
