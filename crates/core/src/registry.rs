// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Id-keyed registries of outstanding work.
//!
//! Two kinds of entries live here:
//! - [`PendingCall`]: the resolver half of a [`PendingReply`] handed to a caller
//! - [`MethodCallback`]: a one-shot completion signal registered alongside a
//!   call whose payload embeds a callback token
//!
//! Settling an entry consumes it, so an entry taken out of its registry can
//! settle at most once.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::CallError;

/// Result delivered to a caller.
pub type CallResult = Result<Value, CallError>;

/// Entries keyed by request id, iterated in id order.
#[derive(Debug)]
pub struct Registry<T> {
    entries: BTreeMap<u64, T>,
}

impl<T> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry {
            entries: BTreeMap::new(),
        }
    }

    /// Insert an entry, returning the one it displaced (if any).
    pub fn insert(&mut self, id: u64, entry: T) -> Option<T> {
        self.entries.insert(id, entry)
    }

    /// Remove and return the entry for `id`.
    pub fn take(&mut self, id: u64) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Check whether `id` is outstanding.
    pub fn contains(&self, id: u64) -> bool {
        self.entries.contains_key(&id)
    }

    /// Remove every entry, in id order.
    pub fn drain(&mut self) -> Vec<(u64, T)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over outstanding entries in id order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The resolver side of an outstanding call.
#[derive(Debug)]
pub struct PendingCall {
    id: u64,
    created_at: DateTime<Utc>,
    sender: oneshot::Sender<CallResult>,
}

impl PendingCall {
    /// Create a pending call and the reply handle its caller awaits.
    pub fn new(id: u64) -> (Self, PendingReply) {
        let (sender, receiver) = oneshot::channel();
        let call = PendingCall {
            id,
            created_at: Utc::now(),
            sender,
        };
        (call, PendingReply { receiver })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// When the call was registered.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Settle the call. A caller that dropped its reply is not an error.
    pub fn settle(self, result: CallResult) {
        if self.sender.send(result).is_err() {
            tracing::debug!("reply for call {} dropped by caller", self.id);
        }
    }

    pub fn resolve(self, result: Value) {
        self.settle(Ok(result));
    }

    pub fn reject(self, error: CallError) {
        self.settle(Err(error));
    }
}

/// Future returned to callers; settles exactly once.
///
/// A resolver that disappears without settling (client torn down) surfaces
/// as [`CallError::ConnectionClosed`].
#[derive(Debug)]
pub struct PendingReply {
    receiver: oneshot::Receiver<CallResult>,
}

impl PendingReply {
    /// A reply that is already rejected with [`CallError::ConnectionClosed`].
    pub fn closed() -> Self {
        let (_, reply) = PendingCall::new(0);
        reply
    }

    /// Check for a result without waiting.
    ///
    /// Returns `None` while the call is outstanding. Once this returns
    /// `Some`, the reply is spent and must not be awaited.
    pub fn try_result(&mut self) -> Option<CallResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(CallError::ConnectionClosed)),
        }
    }
}

impl Future for PendingReply {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CallError::ConnectionClosed)))
    }
}

type Resolve = Box<dyn FnOnce() + Send>;
type Reject = Box<dyn FnOnce(CallError) + Send>;

/// One-shot completion signal for calls that expect a follow-up from the
/// peer. The shape is fixed at registration time.
pub enum MethodCallback {
    /// Only signals completion.
    ResolveOnly(Resolve),
    /// Signals completion or failure.
    ResolveAndReject { resolve: Resolve, reject: Reject },
}

impl MethodCallback {
    pub fn resolve_only(resolve: impl FnOnce() + Send + 'static) -> Self {
        MethodCallback::ResolveOnly(Box::new(resolve))
    }

    pub fn with_reject(
        resolve: impl FnOnce() + Send + 'static,
        reject: impl FnOnce(CallError) + Send + 'static,
    ) -> Self {
        MethodCallback::ResolveAndReject {
            resolve: Box::new(resolve),
            reject: Box::new(reject),
        }
    }

    pub fn can_reject(&self) -> bool {
        matches!(self, MethodCallback::ResolveAndReject { .. })
    }

    /// Settle from a peer response.
    ///
    /// Success carries no value. A failure reaches `reject` when there is
    /// one; a resolve-only callback still just signals completion.
    pub fn settle(self, outcome: Result<(), CallError>) {
        match (self, outcome) {
            (MethodCallback::ResolveAndReject { reject, .. }, Err(error)) => reject(error),
            (MethodCallback::ResolveOnly(resolve), _)
            | (MethodCallback::ResolveAndReject { resolve, .. }, Ok(())) => resolve(),
        }
    }

    /// Abandon without a peer response (disconnect).
    ///
    /// A resolve-only callback has nothing to reject and is dropped.
    pub fn abandon(self, error: CallError) {
        if let MethodCallback::ResolveAndReject { reject, .. } = self {
            reject(error);
        }
    }
}

impl fmt::Debug for MethodCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolveOnly(_) => f.write_str("ResolveOnly"),
            Self::ResolveAndReject { .. } => f.write_str("ResolveAndReject"),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
