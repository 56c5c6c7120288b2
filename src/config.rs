// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The service URL and anonymous key are the only required values; both are
//! public client credentials, the access policy lives on the backend.

use crate::models::Location;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default single-fix timeout for location requests.
pub const DEFAULT_LOCATION_TIMEOUT_SECS: u64 = 15;
/// Default maximum age of a cached location fix.
pub const DEFAULT_LOCATION_MAX_AGE_SECS: u64 = 10;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend service URL, without trailing slash
    pub supabase_url: String,
    /// Anonymous API key sent with every request
    pub supabase_anon_key: String,
    /// Upper bound on a single location fix
    pub location_timeout: Duration,
    /// Cached fixes younger than this are reused
    pub location_max_age: Duration,
    /// Where the signed-in session is persisted
    pub session_path: PathBuf,
    /// Static position used by the fixed location provider
    pub fixed_location: Option<Location>,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let supabase_url = env::var("SUPABASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                reason: "must start with http:// or https://".to_string(),
            });
        }

        Ok(Self {
            supabase_url,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            location_timeout: Duration::from_secs(secs_var(
                "LOCATION_TIMEOUT_SECS",
                DEFAULT_LOCATION_TIMEOUT_SECS,
            )?),
            location_max_age: Duration::from_secs(secs_var(
                "LOCATION_MAX_AGE_SECS",
                DEFAULT_LOCATION_MAX_AGE_SECS,
            )?),
            session_path: env::var("BUDDY_SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_session_path()),
            fixed_location: env::var("BUDDY_FIXED_LOCATION")
                .ok()
                .map(|raw| {
                    parse_location(&raw).ok_or(ConfigError::Invalid {
                        name: "BUDDY_FIXED_LOCATION",
                        reason: "expected \"latitude,longitude\"".to_string(),
                    })
                })
                .transpose()?,
        })
    }

    /// Defaults pointing at a local backend, for tests and offline runs.
    pub fn test_default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            location_timeout: Duration::from_secs(DEFAULT_LOCATION_TIMEOUT_SECS),
            location_max_age: Duration::from_secs(DEFAULT_LOCATION_MAX_AGE_SECS),
            session_path: std::env::temp_dir().join("buddy-log-test-session.json"),
            fixed_location: None,
        }
    }

    /// Base URL of the PostgREST endpoint.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }

    /// Base URL of the auth endpoint.
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.supabase_url)
    }

    /// Websocket URL of the realtime endpoint.
    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.supabase_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.supabase_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.supabase_url.clone()
        };
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base,
            urlencoding::encode(&self.supabase_anon_key)
        )
    }
}

fn secs_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("expected whole seconds, got {:?}", raw),
        }),
        Err(_) => Ok(default),
    }
}

fn default_session_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("buddy-log")
        .join("session.json")
}

/// Parse a `"latitude,longitude"` pair.
pub fn parse_location(raw: &str) -> Option<Location> {
    let (lat, lon) = raw.split_once(',')?;
    Location::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
