// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation.
//!
//! The [`Engine`] assigns ids, records a [`PendingCall`] for each request it
//! serializes, and routes decoded responses back to the matching entry. It
//! never calls user code itself: every operation that settles entries
//! returns [`Settlements`] for the caller to apply once its lock is released.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{CallError, Error, Result};
use crate::protocol::{Reply, Request, Response};
use crate::registry::{CallResult, MethodCallback, PendingCall, PendingReply, Registry};
use crate::rewrite::{method_name, CallbackRules};

/// A request ready to hand to the transport.
#[derive(Debug)]
pub struct Prepared {
    pub id: u64,
    /// Serialized request.
    pub text: String,
    pub reply: PendingReply,
}

#[derive(Debug)]
enum CallbackOutcome {
    Reply(std::result::Result<(), CallError>),
    Abandon(CallError),
}

/// Entries removed from the registries, waiting to be settled.
#[must_use = "settlements do nothing until applied"]
#[derive(Debug, Default)]
pub struct Settlements {
    callbacks: Vec<(MethodCallback, CallbackOutcome)>,
    calls: Vec<(PendingCall, CallResult)>,
}

impl Settlements {
    pub fn len(&self) -> usize {
        self.callbacks.len() + self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Settle everything, method callbacks first.
    pub fn apply(self) {
        for (callback, outcome) in self.callbacks {
            match outcome {
                CallbackOutcome::Reply(outcome) => callback.settle(outcome),
                CallbackOutcome::Abandon(error) => callback.abandon(error),
            }
        }
        for (call, result) in self.calls {
            call.settle(result);
        }
    }
}

/// Correlation state for one session.
#[derive(Debug)]
pub struct Engine {
    next_id: u64,
    pending: Registry<PendingCall>,
    callbacks: Registry<MethodCallback>,
    /// Most recently issued call; target of transport errors.
    in_flight: Option<u64>,
    rules: CallbackRules,
}

impl Engine {
    pub fn new(rules: CallbackRules) -> Self {
        Engine {
            next_id: 0,
            pending: Registry::new(),
            callbacks: Registry::new(),
            in_flight: None,
            rules,
        }
    }

    /// The id the next request will get.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Number of outstanding calls.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of outstanding method callbacks.
    pub fn callback_len(&self) -> usize {
        self.callbacks.len()
    }

    /// Registration time of the longest-outstanding call.
    pub fn oldest_pending(&self) -> Option<DateTime<Utc>> {
        self.pending.values().map(PendingCall::created_at).min()
    }

    /// Allocate an id, register the call, and serialize the request.
    ///
    /// With a `callback`, the rule for the method named in `params` writes
    /// the call id into the payload and the callback is registered under the
    /// same id. A missing rule or malformed params fail without consuming
    /// an id.
    pub fn prepare(
        &mut self,
        mut params: Value,
        callback: Option<MethodCallback>,
    ) -> Result<Prepared> {
        let id = self.next_id;

        if callback.is_some() {
            let rule = self.rules.find(&params).ok_or_else(|| {
                Error::NoCallbackRule(method_name(&params).unwrap_or_default().to_string())
            })?;
            rule.substitute(&mut params, Value::from(id))?;
        }

        let text = Request::call(id, params).to_json()?;
        self.next_id += 1;

        let (call, reply) = PendingCall::new(id);
        self.pending.insert(id, call);
        if let Some(callback) = callback {
            debug!("registered method callback for call {}", id);
            self.callbacks.insert(id, callback);
        }
        self.in_flight = Some(id);

        Ok(Prepared { id, text, reply })
    }

    /// Route a response to the entries registered under its id.
    ///
    /// Responses matching nothing (already settled, unroutable diagnostics)
    /// are dropped.
    pub fn dispatch(&mut self, response: Response) -> Settlements {
        let mut settlements = Settlements::default();

        let Some(id) = response.id else {
            debug!("dropping response without id: {:?}", response.reply);
            return settlements;
        };

        let callback = self.callbacks.take(id);
        let call = self.pending.take(id);
        if callback.is_none() && call.is_none() {
            debug!("dropping response for unknown call {}", id);
            return settlements;
        }

        let (callback_outcome, call_result) = match response.reply {
            Reply::Success(result) => (Ok(()), Ok(result)),
            Reply::Failure(error) => (
                Err(CallError::Remote(error.clone())),
                Err(CallError::Remote(error)),
            ),
        };

        if let Some(callback) = callback {
            settlements
                .callbacks
                .push((callback, CallbackOutcome::Reply(callback_outcome)));
        }
        if let Some(call) = call {
            settlements.calls.push((call, call_result));
        }
        settlements
    }

    /// Reject the most recently issued call if it is still outstanding.
    pub fn fail_in_flight(&mut self, reason: &str) -> Settlements {
        let mut settlements = Settlements::default();
        if let Some(call) = self.in_flight.take().and_then(|id| self.pending.take(id)) {
            debug!("transport error rejects call {}", call.id());
            settlements
                .calls
                .push((call, Err(CallError::Transport(reason.to_string()))));
        }
        settlements
    }

    /// Abandon everything outstanding and restart ids from 0.
    pub fn reset(&mut self) -> Settlements {
        let mut settlements = Settlements::default();
        for (_, callback) in self.callbacks.drain() {
            settlements.callbacks.push((
                callback,
                CallbackOutcome::Abandon(CallError::ConnectionClosed),
            ));
        }
        for (_, call) in self.pending.drain() {
            settlements
                .calls
                .push((call, Err(CallError::ConnectionClosed)));
        }
        self.next_id = 0;
        self.in_flight = None;
        settlements
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(CallbackRules::default())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
