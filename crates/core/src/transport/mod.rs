// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for message-oriented connections.
//!
//! A transport is an event source plus a send operation:
//! - it reports `Open`, `Error`, `Message` and `Close` through an event
//!   channel handed to it at construction
//! - `send` is best-effort; failures come back as `Error` events
//!
//! Provides:
//! - [`ReconnectingWebSocket`] for production (reconnects with backoff)
//! - a mock transport for unit testing

mod backoff;
mod websocket;

pub use backoff::Backoff;
pub use websocket::ReconnectingWebSocket;

use tokio::sync::mpsc;



/// Error type for transport operations, reported through
/// [`TransportEvent::Error`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection attempt failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt did not finish in time.
    #[error("connection attempt timed out after {0}ms")]
    ConnectTimeout(u64),

    /// Send requested while no connection is open.
    #[error("not connected")]
    NotConnected,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Lifecycle and data events emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection opened (first time or after a reconnect).
    Open,
    /// Something went wrong; the connection may or may not survive.
    Error(String),
    /// An inbound text message.
    Message(String),
    /// The connection dropped.
    Close,
}

impl From<TransportError> for TransportEvent {
    fn from(err: TransportError) -> Self {
        TransportEvent::Error(err.to_string())
    }
}

/// Sending half of a transport's event channel.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half of a transport's event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Create the channel a transport reports its events on.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Transport trait for message-oriented communication.
///
/// Abstracts over the actual connection so the client can be driven by a
/// mock in tests or by any embedding-specific transport.
pub trait Transport: Send + Sync {
    /// Send a text message. Never blocks; failures surface as error events.
    fn send(&self, text: String);

    /// Shut the transport down permanently.
    fn close(&self);
}
