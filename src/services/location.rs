// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location acquisition.
//!
//! Permission first, then a single position fix bounded by a timeout, with
//! a recent cached fix reused. Every failure is classified and carries a
//! user-facing message; callers continue without a location.

use crate::config::Config;
use crate::models::Location;
use chrono::{DateTime, Utc};
use futures_util::future::{self, BoxFuture};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Give up on a fix after this long
    pub timeout: Duration,
    /// Reuse a fix no older than this
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(crate::config::DEFAULT_LOCATION_TIMEOUT_SECS),
            maximum_age: Duration::from_secs(crate::config::DEFAULT_LOCATION_MAX_AGE_SECS),
        }
    }
}

impl PositionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.location_timeout,
            maximum_age: config.location_max_age,
            ..Self::default()
        }
    }
}

/// Answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// A position fix and when it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub location: Location,
    pub timestamp: DateTime<Utc>,
}

/// Location failures, classified the way the platform reports them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    /// The permission prompt was refused
    #[error("Location permission not granted")]
    PermissionRequired,

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location service unavailable")]
    Unavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    /// Alert title.
    pub fn title(&self) -> &'static str {
        match self {
            LocationError::PermissionRequired => "Location Permission Required",
            _ => "Location Error",
        }
    }

    /// Alert body.
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionRequired => {
                "Please enable location permissions to use this feature."
            }
            LocationError::PermissionDenied => "Location permission denied.",
            LocationError::Unavailable => "Location service unavailable.",
            LocationError::Timeout => "Location request timed out.",
            LocationError::Other(_) => "Unable to get your current location.",
        }
    }
}

/// Platform positioning capability.
pub trait LocationProvider: Send + Sync {
    fn request_permission(&self) -> BoxFuture<'_, Permission>;

    fn current_position<'a>(
        &'a self,
        options: &'a PositionOptions,
    ) -> BoxFuture<'a, Result<Fix, LocationError>>;
}

/// Provider that always reports the same position.
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    location: Location,
}

impl FixedLocationProvider {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        Box::pin(future::ready(Permission::Granted))
    }

    fn current_position<'a>(
        &'a self,
        _options: &'a PositionOptions,
    ) -> BoxFuture<'a, Result<Fix, LocationError>> {
        Box::pin(future::ready(Ok(Fix {
            location: self.location,
            timestamp: Utc::now(),
        })))
    }
}

/// Provider for hosts without positioning hardware.
#[derive(Debug, Clone, Default)]
pub struct UnavailableLocationProvider;

impl LocationProvider for UnavailableLocationProvider {
    fn request_permission(&self) -> BoxFuture<'_, Permission> {
        Box::pin(future::ready(Permission::Granted))
    }

    fn current_position<'a>(
        &'a self,
        _options: &'a PositionOptions,
    ) -> BoxFuture<'a, Result<Fix, LocationError>> {
        Box::pin(future::ready(Err(LocationError::Unavailable)))
    }
}

/// Location service over a platform provider.
#[derive(Clone)]
pub struct LocationService {
    provider: Arc<dyn LocationProvider>,
    options: PositionOptions,
    last_fix: Arc<Mutex<Option<Fix>>>,
}

impl LocationService {
    pub fn new(provider: Arc<dyn LocationProvider>, options: PositionOptions) -> Self {
        Self {
            provider,
            options,
            last_fix: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn request_permission(&self) -> Permission {
        let permission = self.provider.request_permission().await;
        tracing::debug!(?permission, "Location permission requested");
        permission
    }

    /// Ask for permission, then return a fresh-enough position.
    pub async fn current_position(&self) -> Result<Location, LocationError> {
        if self.request_permission().await == Permission::Denied {
            tracing::info!("Location permission denied by user");
            return Err(LocationError::PermissionRequired);
        }

        if let Some(fix) = self.cached_fix(Utc::now()) {
            tracing::debug!("Reusing cached location fix");
            return Ok(fix.location);
        }

        let fix = tokio::time::timeout(
            self.options.timeout,
            self.provider.current_position(&self.options),
        )
        .await
        .map_err(|_| LocationError::Timeout)
        .and_then(|result| result)
        .inspect_err(|e| tracing::warn!(error = %e, "Error getting current position"))?;

        *self
            .last_fix
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(fix);
        Ok(fix.location)
    }

    fn cached_fix(&self, now: DateTime<Utc>) -> Option<Fix> {
        let guard = self
            .last_fix
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let fix = (*guard)?;
        let age = (now - fix.timestamp).to_std().unwrap_or(Duration::ZERO);
        (age <= self.options.maximum_age).then_some(fix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sf() -> Location {
        Location::new(37.78825, -122.4324).unwrap()
    }

    #[tokio::test]
    async fn test_fixed_provider_returns_location() {
        let service = LocationService::new(
            Arc::new(FixedLocationProvider::new(sf())),
            PositionOptions::default(),
        );
        assert_eq!(service.current_position().await, Ok(sf()));
    }

    #[tokio::test]
    async fn test_unavailable_provider_message() {
        let service = LocationService::new(
            Arc::new(UnavailableLocationProvider),
            PositionOptions::default(),
        );
        let err = service.current_position().await.unwrap_err();
        assert_eq!(err, LocationError::Unavailable);
        assert_eq!(err.user_message(), "Location service unavailable.");
        assert_eq!(err.title(), "Location Error");
    }

    /// Provider that never answers.
    struct HangingProvider;

    impl LocationProvider for HangingProvider {
        fn request_permission(&self) -> BoxFuture<'_, Permission> {
            Box::pin(future::ready(Permission::Granted))
        }

        fn current_position<'a>(
            &'a self,
            _options: &'a PositionOptions,
        ) -> BoxFuture<'a, Result<Fix, LocationError>> {
            Box::pin(future::pending())
        }
    }

    /// Provider that counts position requests.
    #[derive(Default)]
    struct CountingProvider {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl LocationProvider for CountingProvider {
        fn request_permission(&self) -> BoxFuture<'_, Permission> {
            Box::pin(future::ready(Permission::Granted))
        }

        fn current_position<'a>(
            &'a self,
            _options: &'a PositionOptions,
        ) -> BoxFuture<'a, Result<Fix, LocationError>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Box::pin(future::ready(Ok(Fix {
                location: sf(),
                timestamp: Utc::now(),
            })))
        }
    }

    #[tokio::test]
    async fn test_timeout_applies_to_unresponsive_provider() {
        let options = PositionOptions {
            timeout: Duration::from_millis(50),
            ..PositionOptions::default()
        };
        let service = LocationService::new(Arc::new(HangingProvider), options);

        let result = tokio::time::timeout(Duration::from_secs(2), service.current_position())
            .await
            .expect("service gives up on its own");
        assert_eq!(result, Err(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_recent_fix_is_reused() {
        let provider = Arc::new(CountingProvider::default());
        let options = PositionOptions {
            maximum_age: Duration::from_millis(100),
            ..PositionOptions::default()
        };
        let service = LocationService::new(provider.clone(), options);
        let calls = || provider.calls.load(std::sync::atomic::Ordering::SeqCst);

        assert_eq!(service.current_position().await, Ok(sf()));
        assert_eq!(service.current_position().await, Ok(sf()));
        assert_eq!(calls(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(service.current_position().await, Ok(sf()));
        assert_eq!(calls(), 2);
    }

    #[test]
    fn test_default_options_match_platform_request() {
        let options = PositionOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(15));
        assert_eq!(options.maximum_age, Duration::from_secs(10));
    }
}
