// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication service and the shared auth context.
//!
//! Handles:
//! - Sign-up / sign-in form validation and backend calls
//! - Exposing the current user to screens via [`AuthContext`]
//! - Session restore from disk and refresh before expiry

use crate::backend::Backend;
use crate::error::{AppError, Result};
use crate::models::{Session, User};
use crate::session_store::SessionStore;
use chrono::{Duration, Utc};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use validator::Validate;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Snapshot of the authentication state.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub session: Option<Session>,
    /// True while a stored session is being restored
    pub loading: bool,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// Shared, cloneable handle to the current auth state.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    state: Arc<RwLock<AuthState>>,
}

impl AuthContext {
    pub fn snapshot(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot().session.map(|s| s.user)
    }

    fn session(&self) -> Option<Session> {
        self.snapshot().session
    }

    fn update(&self, f: impl FnOnce(&mut AuthState)) {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }
}

/// Sign-up form.
#[derive(Debug, Clone, Validate)]
pub struct SignUpForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Sign-in form.
#[derive(Debug, Clone, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please fill in all fields"))]
    pub password: String,
}

/// Result of a successful sign-up call.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Account created and signed in
    SignedIn(User),
    /// Account created; the user must follow the emailed link first
    ConfirmationRequired { email: String },
}

/// Authentication service.
pub struct AuthService<B> {
    backend: Arc<B>,
    context: AuthContext,
    store: Option<SessionStore>,
    /// Serializes refresh so concurrent callers don't spend the refresh token twice.
    refresh_lock: Arc<Mutex<()>>,
}

impl<B> Clone for AuthService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            context: self.context.clone(),
            store: self.store.clone(),
            refresh_lock: Arc::clone(&self.refresh_lock),
        }
    }
}

impl<B: Backend> AuthService<B> {
    /// Create an auth service. Without a store, sessions live only in memory.
    pub fn new(backend: Arc<B>, store: Option<SessionStore>) -> Self {
        Self {
            backend,
            context: AuthContext::default(),
            store,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn context(&self) -> &AuthContext {
        &self.context
    }

    pub fn current_user(&self) -> Option<User> {
        self.context.current_user()
    }

    /// Restore a persisted session, refreshing or discarding it as needed.
    pub async fn restore(&self) -> Option<User> {
        self.context.update(|s| s.loading = true);
        let user = self.restore_inner().await;
        self.context.update(|s| s.loading = false);
        user
    }

    async fn restore_inner(&self) -> Option<User> {
        let stored = match self.store.as_ref().map(SessionStore::load).transpose() {
            Ok(stored) => stored.flatten()?,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored session");
                return None;
            }
        };
        self.context.update(|s| s.session = Some(stored));

        let (token, user) = match self.access().await {
            Ok(access) => access,
            Err(e) => {
                tracing::info!(error = %e, "Stored session no longer usable");
                return None;
            }
        };

        match self.backend.get_user(&token).await {
            Ok(verified) => Some(verified),
            Err(e) if e.is_auth_error() => {
                tracing::info!("Stored session was revoked");
                self.clear_local();
                None
            }
            Err(e) => {
                // Keep the session; the backend may just be unreachable.
                tracing::warn!(error = %e, "Could not verify stored session");
                Some(user)
            }
        }
    }

    /// Create an account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please fill in all fields".to_string()));
        }
        let form = SignUpForm {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        form.validate()?;

        let response = self.backend.sign_up(&form.email, &form.password).await?;
        match response.session {
            Some(session) => {
                tracing::info!(user_id = %session.user.id, "Signup successful");
                let user = session.user.clone();
                self.install(session);
                Ok(SignUpOutcome::SignedIn(user))
            }
            None => {
                tracing::info!(user_id = %response.user.id, "Signup awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired { email: form.email })
            }
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please fill in all fields".to_string()));
        }
        let form = SignInForm {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        form.validate()?;

        let session = self.backend.sign_in(&form.email, &form.password).await?;
        let user = session.user.clone();
        self.install(session);
        Ok(user)
    }

    /// Sign out locally, and on the backend when reachable.
    pub async fn sign_out(&self) {
        if let Some(session) = self.context.session() {
            if let Err(e) = self.backend.sign_out(&session.access_token).await {
                tracing::warn!(error = %e, "Backend sign-out failed; clearing local session anyway");
            }
        }
        self.clear_local();
    }

    /// Access token and user for a backend call, refreshing when close to expiry.
    pub async fn access(&self) -> Result<(String, User)> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        let session = self.context.session().ok_or(AppError::Unauthenticated)?;
        if !session.is_expired_at(Utc::now(), margin) {
            return Ok((session.access_token, session.user));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let session = self.context.session().ok_or(AppError::Unauthenticated)?;
        if !session.is_expired_at(Utc::now(), margin) {
            return Ok((session.access_token, session.user));
        }

        tracing::info!(user_id = %session.user.id, "Access token expiring, refreshing");
        match self.backend.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                let access = (fresh.access_token.clone(), fresh.user.clone());
                self.install(fresh);
                Ok(access)
            }
            Err(e) => {
                if e.is_auth_error() {
                    self.clear_local();
                }
                Err(e)
            }
        }
    }

    fn install(&self, session: Session) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&session) {
                tracing::warn!(error = %e, "Could not persist session");
            }
        }
        self.context.update(|s| s.session = Some(session));
    }

    fn clear_local(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "Could not remove stored session");
            }
        }
        self.context.update(|s| s.session = None);
    }
}
