// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login and sign-up screens.

use crate::backend::Backend;
use crate::error::AppError;
use crate::models::User;
use crate::screens::{Notice, Notices};
use crate::services::{AuthService, SignUpOutcome};

pub struct LoginScreen<B> {
    auth: AuthService<B>,
    pub email: String,
    pub password: String,
    loading: bool,
    pub notices: Notices,
}

impl<B: Backend> LoginScreen<B> {
    pub fn new(auth: AuthService<B>) -> Self {
        Self {
            auth,
            email: String::new(),
            password: String::new(),
            loading: false,
            notices: Notices::default(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Sign in with the entered credentials.
    ///
    /// On success the auth state changes and navigation moves to the main
    /// stack; nothing else happens here.
    pub async fn submit(&mut self) -> Option<User> {
        if self.loading {
            return None;
        }
        self.loading = true;
        let result = self.auth.sign_in(&self.email, &self.password).await;
        self.loading = false;

        match result {
            Ok(user) => {
                self.password.clear();
                Some(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "Login failed");
                let title = match e {
                    AppError::Validation(_) => "Error",
                    _ => "Login Error",
                };
                self.notices.push(Notice::new(title, e.user_message()));
                None
            }
        }
    }
}

pub struct SignupScreen<B> {
    auth: AuthService<B>,
    pub email: String,
    pub password: String,
    loading: bool,
    pub notices: Notices,
}

impl<B: Backend> SignupScreen<B> {
    pub fn new(auth: AuthService<B>) -> Self {
        Self {
            auth,
            email: String::new(),
            password: String::new(),
            loading: false,
            notices: Notices::default(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub async fn submit(&mut self) -> Option<SignUpOutcome> {
        if self.loading {
            return None;
        }
        self.loading = true;
        let result = self.auth.sign_up(&self.email, &self.password).await;
        self.loading = false;

        match result {
            Ok(outcome) => {
                if let SignUpOutcome::ConfirmationRequired { .. } = outcome {
                    self.notices.push(Notice::new(
                        "Check your email",
                        "Please check your email for a confirmation link to complete your registration.",
                    ));
                }
                self.password.clear();
                Some(outcome)
            }
            Err(e) => {
                tracing::info!(error = %e, "Signup failed");
                let title = match e {
                    AppError::Validation(_) => "Error",
                    _ => "Signup Error",
                };
                self.notices.push(Notice::new(title, e.user_message()));
                None
            }
        }
    }
}
