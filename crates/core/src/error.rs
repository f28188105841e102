// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for wsrpc-core operations.

use serde_json::Value;
use thiserror::Error;

/// Reasons a single correlated call can be rejected.
///
/// Every rejection surfaces on the [`PendingReply`](crate::PendingReply) the
/// call returned; none of these ever tear down the session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallError {
    /// The peer answered with an `error` field.
    #[error("remote error: {0}")]
    Remote(Value),

    /// The connection dropped (or the client was closed) before a reply.
    #[error("connection closed")]
    ConnectionClosed,

    /// The transport reported a failure while this call was in flight.
    #[error("transport error: {0}")]
    Transport(String),
}

/// All possible errors that can occur in wsrpc-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("no callback rule registered for method '{0}'\n  hint: register one with RpcClientBuilder::callback_rule")]
    NoCallbackRule(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unable to connect: {0}")]
    Connect(String),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A specialized Result type for wsrpc-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
