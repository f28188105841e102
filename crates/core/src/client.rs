// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! RPC client for JSON-RPC servers over a reconnecting transport.
//!
//! Provides a high-level interface for:
//! - Issuing correlated calls and awaiting their replies
//! - Tracking readiness of the initial connection
//! - Failing every outstanding call when the connection drops
//! - Status and reconnection notifications
//!
//! All registry mutations happen synchronously inside [`RpcClient::call`]
//! or [`RpcClient::handle_event`] under one session lock. User callbacks
//! (status, reconnect, method callbacks) always run after that lock is
//! released.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::engine::{Engine, Settlements};
use crate::error::{Error, Result};
use crate::lifecycle::{ConnectionState, ErrorRoute, Lifecycle, Opened, Readiness, Status};
use crate::protocol::Response;
use crate::registry::{MethodCallback, PendingReply};
use crate::rewrite::{CallbackRule, CallbackRules};
use crate::transport::{
    event_channel, EventReceiver, ReconnectingWebSocket, Transport, TransportEvent,
};

/// Api id the server exposes its login and api lookup calls on.
pub const LOGIN_API: u64 = 1;

type StatusHook = Arc<dyn Fn(Status) + Send + Sync>;
type ReconnectHook = Arc<dyn Fn() + Send + Sync>;

/// Builder for [`RpcClient`].
pub struct RpcClientBuilder {
    config: ClientConfig,
    rules: CallbackRules,
    on_status: Option<StatusHook>,
    on_reconnect: Option<ReconnectHook>,
}

impl RpcClientBuilder {
    /// Called with every status change.
    pub fn on_status(mut self, hook: impl Fn(Status) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Arc::new(hook));
        self
    }

    /// Called on every open after the first.
    pub fn on_reconnect(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reconnect = Some(Arc::new(hook));
        self
    }

    /// Add a callback rule for a method that embeds a callback reference.
    pub fn callback_rule(mut self, rule: impl CallbackRule + 'static) -> Self {
        self.rules.register(rule);
        self
    }

    /// Connect over a [`ReconnectingWebSocket`] built from the config.
    ///
    /// Returns immediately; use [`RpcClient::ready`] to wait for the first
    /// open. Must be called from within a tokio runtime.
    pub fn connect(self) -> Result<RpcClient> {
        self.config.validate()?;
        let (tx, rx) = event_channel();
        let transport = ReconnectingWebSocket::spawn(self.config.clone(), tx);
        Ok(self.with_transport(transport, rx))
    }

    /// Use a custom transport that reports its events on `events`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_transport(
        self,
        transport: impl Transport + 'static,
        events: EventReceiver,
    ) -> RpcClient {
        let transport: Box<dyn Transport> = Box::new(transport);
        let lifecycle = Lifecycle::new();
        let readiness = lifecycle.subscribe();

        let inner = Arc::new(Inner {
            url: self.config.url,
            session: Mutex::new(Session {
                engine: Engine::new(self.rules),
                lifecycle,
                released: false,
            }),
            transport: Mutex::new(Some(transport)),
            readiness,
            on_status: self.on_status,
            on_reconnect: self.on_reconnect,
            pump: Mutex::new(None),
        });

        let pump = tokio::spawn(pump(Arc::downgrade(&inner), events));
        *lock(&inner.pump) = Some(pump);

        RpcClient { inner }
    }
}

/// Correlation and lifecycle state, guarded by one lock.
struct Session {
    engine: Engine,
    lifecycle: Lifecycle,
    /// Set by [`RpcClient::close`]; no further activity is possible.
    released: bool,
}

struct Inner {
    url: String,
    session: Mutex<Session>,
    transport: Mutex<Option<Box<dyn Transport>>>,
    readiness: watch::Receiver<Readiness>,
    on_status: Option<StatusHook>,
    on_reconnect: Option<ReconnectHook>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let transport = self
            .transport
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(transport) = transport {
            transport.close();
        }
        let pump = self
            .pump
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pump) = pump {
            pump.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feed transport events to the client until either side goes away.
async fn pump(inner: Weak<Inner>, mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        RpcClient { inner }.handle_event(event);
    }
    debug!("event pump finished");
}

/// JSON-RPC client. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

impl RpcClient {
    /// Start building a client.
    pub fn builder(config: ClientConfig) -> RpcClientBuilder {
        RpcClientBuilder {
            config,
            rules: CallbackRules::default(),
            on_status: None,
            on_reconnect: None,
        }
    }

    /// Connect with default hooks and rules.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        Self::builder(config).connect()
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        lock(&self.inner.session)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.session().lifecycle.state()
    }

    /// Check whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.session().released
    }

    /// Number of calls awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.session().engine.pending_len()
    }

    /// Number of method callbacks awaiting a reply.
    pub fn pending_callbacks(&self) -> usize {
        self.session().engine.callback_len()
    }

    /// Registration time of the longest-outstanding call.
    pub fn oldest_pending(&self) -> Option<DateTime<Utc>> {
        self.session().engine.oldest_pending()
    }

    /// Wait until the initial connection settles.
    pub async fn ready(&self) -> Result<()> {
        let mut readiness = self.inner.readiness.clone();
        let outcome = match readiness.wait_for(Readiness::is_settled).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => return Err(Error::Connect("client dropped".to_string())),
        };
        match outcome {
            Readiness::Ready => Ok(()),
            Readiness::Failed(reason) => Err(Error::Connect(reason)),
            Readiness::Pending => Err(Error::Connect("readiness never settled".to_string())),
        }
    }

    /// Issue a correlated call.
    ///
    /// The reply settles exactly once: with the remote `result`, the remote
    /// `error`, a transport error, or [`CallError::ConnectionClosed`]. After
    /// [`close`](Self::close) the reply is already rejected.
    ///
    /// [`CallError::ConnectionClosed`]: crate::CallError::ConnectionClosed
    pub fn call(&self, params: Value) -> Result<PendingReply> {
        self.issue(params, None)
    }

    /// Issue a call whose payload carries a callback reference.
    ///
    /// The callback rule registered for the method named in `params` writes
    /// the call id into the payload; `callback` is settled by the response
    /// to that id, independently of the returned reply.
    pub fn call_with_callback(
        &self,
        params: Value,
        callback: MethodCallback,
    ) -> Result<PendingReply> {
        self.issue(params, Some(callback))
    }

    /// Look up an api id by name.
    pub fn get_api_by_name(&self, api: &str) -> Result<PendingReply> {
        self.call(json!([LOGIN_API, "get_api_by_name", [api]]))
    }

    /// Wait for the initial connection, then log in.
    pub async fn login(&self, user: &str, password: &str) -> Result<Value> {
        self.ready().await?;
        let reply = self.call(json!([LOGIN_API, "login", [user, password]]))?;
        Ok(reply.await?)
    }

    fn issue(&self, params: Value, callback: Option<MethodCallback>) -> Result<PendingReply> {
        let transport = lock(&self.inner.transport);
        let Some(transport) = transport.as_ref() else {
            return Ok(PendingReply::closed());
        };

        let prepared = self.session().engine.prepare(params, callback)?;
        debug!("-> call {}: {}", prepared.id, prepared.text);
        transport.send(prepared.text);
        Ok(prepared.reply)
    }

    /// Apply one transport event.
    ///
    /// The event pump calls this for every event the transport reports.
    /// Embeddings that drive their own transport loop may call it directly.
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Error(reason) => self.on_error(&reason),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Close => self.end_session(false),
        }
    }

    fn on_open(&self) {
        let opened = {
            let mut session = self.session();
            if session.released {
                return;
            }
            session.lifecycle.on_open()
        };
        self.notify(Status::Open);

        match opened {
            Opened::Initial => info!("connected to {}", self.inner.url),
            Opened::Reconnected => {
                info!("reconnected to {}", self.inner.url);
                if let Some(hook) = &self.inner.on_reconnect {
                    hook();
                }
            }
        }
    }

    fn on_error(&self, reason: &str) {
        let settlements = {
            let mut session = self.session();
            if session.released {
                return;
            }
            match session.lifecycle.on_error(reason) {
                ErrorRoute::Readiness => Settlements::default(),
                ErrorRoute::InFlight => session.engine.fail_in_flight(reason),
            }
        };
        warn!("transport error: {}", reason);
        self.notify(Status::Error);
        settlements.apply();
    }

    fn on_message(&self, text: &str) {
        debug!("<- {}", text);
        let response = Response::from_text(text);
        let settlements = {
            let mut session = self.session();
            if session.released {
                return;
            }
            session.engine.dispatch(response)
        };
        settlements.apply();
    }

    /// Abandon everything outstanding; with `release`, also refuse any
    /// further activity.
    fn end_session(&self, release: bool) {
        let settlements = {
            let mut session = self.session();
            if session.released {
                return;
            }
            session.released = release;
            session.lifecycle.on_close();
            session.engine.reset()
        };
        if !settlements.is_empty() {
            info!(
                "connection closed, abandoning {} outstanding entries",
                settlements.len()
            );
        }
        settlements.apply();
        self.notify(Status::Closed);
    }

    fn notify(&self, status: Status) {
        debug!("status: {}", status);
        if let Some(hook) = &self.inner.on_status {
            hook(status);
        }
    }

    /// Tear the session down: reject everything outstanding, shut the
    /// transport down, and release it. Calling it again does nothing.
    ///
    /// Hosts should call this on shutdown; dropping the last client handle
    /// also shuts the transport down.
    pub fn close(&self) {
        let Some(transport) = lock(&self.inner.transport).take() else {
            return;
        };
        self.end_session(true);
        transport.close();
        if let Some(pump) = lock(&self.inner.pump).take() {
            pump.abort();
        }
        info!("client for {} closed", self.inner.url);
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session();
        f.debug_struct("RpcClient")
            .field("url", &self.inner.url)
            .field("state", &session.lifecycle.state())
            .field("pending_calls", &session.engine.pending_len())
            .field("pending_callbacks", &session.engine.callback_len())
            .field("released", &session.released)
            .finish()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
