// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Screen routing driven by the auth state.
//!
//! Three stacks exist: a splash while a stored session is restored, the auth
//! stack for signed-out users and the main stack once signed in. Switching
//! stacks resets history to the stack's first screen.

use crate::services::AuthState;

/// A screen the app can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Splash,
    Login,
    Signup,
    LogList,
    CreateLog,
    Map,
    Friends,
}

impl Route {
    pub fn title(self) -> &'static str {
        match self {
            Route::Splash => "Loading",
            Route::Login => "Login",
            Route::Signup => "Sign Up",
            Route::LogList => "Buddy App",
            Route::CreateLog => "New Log Entry",
            Route::Map => "Map",
            Route::Friends => "Friends",
        }
    }

    /// Stack this route belongs to.
    pub fn stack(self) -> Stack {
        match self {
            Route::Splash => Stack::Loading,
            Route::Login | Route::Signup => Stack::Auth,
            Route::LogList | Route::CreateLog | Route::Map | Route::Friends => Stack::Main,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stack {
    Loading,
    Auth,
    Main,
}

impl Stack {
    pub fn for_state(state: &AuthState) -> Stack {
        if state.loading {
            Stack::Loading
        } else if state.session.is_some() {
            Stack::Main
        } else {
            Stack::Auth
        }
    }

    pub fn initial_route(self) -> Route {
        match self {
            Stack::Loading => Route::Splash,
            Stack::Auth => Route::Login,
            Stack::Main => Route::LogList,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("{route:?} is not reachable from the {stack:?} stack")]
    WrongStack { route: Route, stack: Stack },
}

/// History of routes within the active stack.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Stack,
    history: Vec<Route>,
}

impl Navigator {
    pub fn new(state: &AuthState) -> Self {
        let stack = Stack::for_state(state);
        Self {
            stack,
            history: vec![stack.initial_route()],
        }
    }

    /// Follow an auth state change. Returns true when the stack switched.
    pub fn sync(&mut self, state: &AuthState) -> bool {
        let stack = Stack::for_state(state);
        if stack == self.stack {
            return false;
        }
        tracing::debug!(from = ?self.stack, to = ?stack, "Switching navigation stack");
        self.stack = stack;
        self.history = vec![stack.initial_route()];
        true
    }

    pub fn navigate(&mut self, route: Route) -> Result<(), NavigationError> {
        if route.stack() != self.stack {
            return Err(NavigationError::WrongStack {
                route,
                stack: self.stack,
            });
        }
        if self.current() != route {
            self.history.push(route);
        }
        Ok(())
    }

    /// Pop the current route. The first route of a stack is never popped.
    pub fn go_back(&mut self) -> bool {
        if self.history.len() > 1 {
            self.history.pop();
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Route {
        self.history
            .last()
            .copied()
            .unwrap_or_else(|| self.stack.initial_route())
    }

    pub fn stack(&self) -> Stack {
        self.stack
    }
}
