// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle tracking.
//!
//! The first `open` settles readiness; later opens are reconnects. Readiness
//! is published on a watch channel and settles at most once, so every
//! waiter observes the same outcome.

use std::fmt;

use tokio::sync::watch;

/// State of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the first open.
    Connecting,
    Open,
    /// Dropped; the transport may reopen it.
    Closed,
}

/// Status notification passed to the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Open,
    Error,
    Closed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Error => "error",
            Status::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the initial connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    /// The transport reported an error before the first open.
    Failed(String),
}

impl Readiness {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

/// Which kind of open just happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    Initial,
    Reconnected,
}

/// Where a transport error should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorRoute {
    /// It rejected readiness.
    Readiness,
    /// Readiness already settled; the in-flight call takes it.
    InFlight,
}

/// Lifecycle state machine for one session.
#[derive(Debug)]
pub struct Lifecycle {
    state: ConnectionState,
    initial_connect: bool,
    readiness: watch::Sender<Readiness>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (readiness, _) = watch::channel(Readiness::Pending);
        Lifecycle {
            state: ConnectionState::Connecting,
            initial_connect: true,
            readiness,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current readiness outcome.
    pub fn readiness(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    /// Subscribe to readiness.
    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.readiness.subscribe()
    }

    pub fn on_open(&mut self) -> Opened {
        self.state = ConnectionState::Open;
        if self.initial_connect {
            self.initial_connect = false;
            self.settle(Readiness::Ready);
            Opened::Initial
        } else {
            Opened::Reconnected
        }
    }

    /// Errors never change the connection state; a close follows if the
    /// connection actually dropped.
    pub fn on_error(&mut self, reason: &str) -> ErrorRoute {
        if self.settle(Readiness::Failed(reason.to_string())) {
            ErrorRoute::Readiness
        } else {
            ErrorRoute::InFlight
        }
    }

    pub fn on_close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Settle readiness if still pending. Returns true if this call settled it.
    fn settle(&self, outcome: Readiness) -> bool {
        self.readiness.send_if_modified(|current| {
            if current.is_settled() {
                false
            } else {
                *current = outcome;
                true
            }
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
