// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-connection state: lives only for the life of a socket.

use std::time::{Duration, Instant};

/// State carried alongside a single websocket connection.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// Client-generated, carried in the upgrade URL.
    pub subscriber_id: String,
    /// Opaque authentication token from a cookie or dev query param.
    pub session_id: Option<String>,
    initialize_received_at: Option<Instant>,
    initialized: bool,
}

impl ConnectionState {
    #[must_use]
    pub fn new(subscriber_id: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            session_id,
            initialize_received_at: None,
            initialized: false,
        }
    }

    /// A connection state for stateless, single-shot callers (e.g. a CLI
    /// issuing one HTTP request) that never perform the MCP handshake and
    /// don't need to: initialized from construction.
    #[must_use]
    pub fn preinitialized(subscriber_id: impl Into<String>) -> Self {
        Self { subscriber_id: subscriber_id.into(), session_id: None, initialize_received_at: None, initialized: true }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn mark_initialize_received(&mut self) {
        self.initialize_received_at.get_or_insert_with(Instant::now);
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// True once `initialize` arrived but `notifications/initialized`
    /// hasn't, and `timeout` has elapsed since. The transport is
    /// responsible for actually closing the socket when this is true.
    #[must_use]
    pub fn initialization_timed_out(&self, timeout: Duration) -> bool {
        !self.initialized
            && self.initialize_received_at.is_some_and(|at| at.elapsed() >= timeout)
    }
}
