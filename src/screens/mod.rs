// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Screen view models.
//!
//! Each screen owns a [`ViewState`] for its primary data and a queue of
//! [`Notice`]s (blocking alerts in a graphical shell, printed lines in the
//! CLI). Screens call services and never touch the backend directly.

pub mod auth;
pub mod create_log;
pub mod friends;
pub mod log_list;
pub mod map;

pub use auth::{LoginScreen, SignupScreen};
pub use create_log::CreateLogScreen;
pub use friends::{FriendsOverview, FriendsScreen};
pub use log_list::LogListScreen;
pub use map::{MapMarker, MapRegion, MapScreen};

/// Load state of a screen's data.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Idle
    }
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ViewState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        match self {
            ViewState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Move out the loaded data, leaving `Loading` behind.
    pub fn begin_reload(&mut self) -> Option<T> {
        match std::mem::replace(self, ViewState::Loading) {
            ViewState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

/// Alert-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Pending notices, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Notices(Vec<Notice>);

impl Notices {
    pub fn push(&mut self, notice: Notice) {
        tracing::debug!(title = %notice.title, message = %notice.message, "Notice raised");
        self.0.push(notice);
    }

    /// Take all pending notices, as a dismissed alert would.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_reload_takes_data() {
        let mut state = ViewState::Loaded(vec![1, 2]);
        assert_eq!(state.begin_reload(), Some(vec![1, 2]));
        assert!(state.is_loading());

        let mut failed: ViewState<Vec<i32>> = ViewState::Failed("boom".to_string());
        assert_eq!(failed.begin_reload(), None);
        assert!(failed.is_loading());
    }

    #[test]
    fn test_notices_drain() {
        let mut notices = Notices::default();
        notices.push(Notice::error("one"));
        notices.push(Notice::new("Success", "two"));
        let drained = notices.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].to_string(), "Error: one");
        assert!(notices.is_empty());
    }
}
