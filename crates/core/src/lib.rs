// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! wsrpc-core: JSON-RPC client over a reconnecting WebSocket
//!
//! This crate provides the request/response correlation engine, the
//! connection lifecycle, and the transport used by the wsrpc CLI. Calls
//! are sent as `{"method":"call","params":[...],"id":N}` and settled by
//! the response carrying the same id; a dropped connection rejects every
//! outstanding call.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod rewrite;
pub mod transport;

pub use client::{RpcClient, RpcClientBuilder};
pub use config::ClientConfig;
pub use error::{CallError, Error, Result};
pub use lifecycle::{ConnectionState, Readiness, Status};
pub use protocol::{Reply, Request, Response};
pub use registry::{MethodCallback, PendingReply};
pub use rewrite::{BroadcastWithCallback, CallbackRule, CallbackRules};
pub use transport::{ReconnectingWebSocket, Transport, TransportEvent};
