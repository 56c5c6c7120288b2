// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing messages.

/// Application error type surfaced to screens.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("{0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Realtime error: {0}")]
    Realtime(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Fallback text when a backend error carries no message of its own.
    pub const GENERIC_FAILURE: &'static str = "Something went wrong. Please try again.";

    /// Text shown to the user in an alert or inline error line.
    ///
    /// Backend messages are surfaced verbatim; internal failures are not.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "User not authenticated".to_string(),
            AppError::InvalidSession => "Your session has expired. Please log in again.".to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Forbidden(msg) => {
                msg.clone()
            }
            AppError::Backend { message, .. } if !message.is_empty() => message.clone(),
            AppError::Backend { .. } => Self::GENERIC_FAILURE.to_string(),
            AppError::Network(_) => "Unable to reach the server.".to_string(),
            AppError::Realtime(_) => "Live updates are unavailable.".to_string(),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                Self::GENERIC_FAILURE.to_string()
            }
        }
    }

    /// Whether the error means the stored session can no longer be used.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::Unauthenticated
                | AppError::InvalidSession
                | AppError::Backend { status: 401, .. }
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Forms show a single line, so pick one message deterministically.
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field))
                })
            })
            .min()
            .unwrap_or_else(|| "Invalid input".to_string());
        AppError::Validation(message)
    }
}

/// Result type alias for services and backends.
pub type Result<T> = std::result::Result<T, AppError>;
