// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket transport that reconnects on its own.
//!
//! A background task owns the socket. It connects, reports events, and on
//! any drop waits out a backoff delay before trying again, until the
//! transport is closed. With an idle threshold configured, a connection
//! that drops after a quiet period is only re-established once the client
//! sends again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Backoff, EventSender, Transport, TransportError, TransportEvent};
use crate::config::ClientConfig;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Tracks when the client last tried to send.
struct Activity {
    last_send: Mutex<Instant>,
    wake: Notify,
}

impl Activity {
    fn new() -> Self {
        Activity {
            last_send: Mutex::new(Instant::now()),
            wake: Notify::new(),
        }
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_send.lock() {
            *last = Instant::now();
        }
        self.wake.notify_waiters();
    }

    fn idle_for(&self) -> Duration {
        self.last_send
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    /// Wait for the next send if nothing was sent for `threshold`.
    ///
    /// Returns whether it had to wait.
    async fn wait_if_idle(&self, threshold: Duration) -> bool {
        // Registered before the idle check so a send racing it still wakes us.
        let woken = self.wake.notified();
        tokio::pin!(woken);
        woken.as_mut().enable();

        if self.idle_for() < threshold {
            return false;
        }
        info!("idle for over {:?}, reconnecting on next send", threshold);
        woken.await;
        true
    }
}

/// WebSocket transport implementation using tokio-tungstenite.
pub struct ReconnectingWebSocket {
    outbound: mpsc::UnboundedSender<String>,
    events: EventSender,
    connected: Arc<AtomicBool>,
    activity: Arc<Activity>,
    cancel: CancellationToken,
}

impl ReconnectingWebSocket {
    /// Start connecting in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: ClientConfig, events: EventSender) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let activity = Arc::new(Activity::new());
        let cancel = CancellationToken::new();

        tokio::spawn(run(
            config,
            events.clone(),
            outbound_rx,
            Arc::clone(&connected),
            Arc::clone(&activity),
            cancel.clone(),
        ));

        ReconnectingWebSocket {
            outbound,
            events,
            connected,
            activity,
            cancel,
        }
    }

    /// Check if a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Transport for ReconnectingWebSocket {
    fn send(&self, text: String) {
        self.activity.touch();

        if !self.is_connected() {
            emit(&self.events, TransportError::NotConnected.into());
            return;
        }
        if self.outbound.send(text).is_err() {
            emit(
                &self.events,
                TransportError::SendFailed("transport stopped".to_string()).into(),
            );
        }
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ReconnectingWebSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn emit(events: &EventSender, event: TransportEvent) {
    if events.send(event).is_err() {
        debug!("transport event dropped: receiver gone");
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Dropped,
    Cancelled,
}

/// Connection loop: connect, serve, back off, repeat until cancelled.
async fn run(
    config: ClientConfig,
    events: EventSender,
    mut outbound: mpsc::UnboundedReceiver<String>,
    connected: Arc<AtomicBool>,
    activity: Arc<Activity>,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::from_config(&config);

    loop {
        let attempt = tokio::time::timeout(
            config.timeout_interval(),
            tokio_tungstenite::connect_async(config.url.as_str()),
        );

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = attempt => result,
        };

        match result {
            Ok(Ok((socket, _))) => {
                backoff.reset();
                // Frames queued for a previous connection belong to calls
                // that were already rejected on close.
                while outbound.try_recv().is_ok() {}

                info!("connected to {}", config.url);
                connected.store(true, Ordering::Release);
                emit(&events, TransportEvent::Open);

                let end = serve(socket, &events, &mut outbound, &cancel).await;

                connected.store(false, Ordering::Release);
                emit(&events, TransportEvent::Close);
                if end == SessionEnd::Cancelled {
                    break;
                }
                info!("connection to {} dropped", config.url);
            }
            Ok(Err(e)) => {
                warn!("connection to {} failed: {}", config.url, e);
                emit(&events, TransportError::ConnectionFailed(e.to_string()).into());
            }
            Err(_) => {
                warn!("connection to {} timed out", config.url);
                emit(
                    &events,
                    TransportError::ConnectTimeout(config.timeout_interval_ms).into(),
                );
            }
        }

        if let Some(threshold) = config.idle_threshold() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                waited = activity.wait_if_idle(threshold) => {
                    if waited {
                        debug!("send after idle period, reconnecting to {}", config.url);
                    }
                }
            }
        }

        let delay = backoff.next_delay();
        debug!("reconnecting in {:?} (attempt {})", delay, backoff.attempt());
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    connected.store(false, Ordering::Release);
    debug!("transport for {} stopped", config.url);
}

/// Pump one open connection until it drops or the transport is closed.
async fn serve(
    socket: Socket,
    events: &EventSender,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
) -> SessionEnd {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = sink.close().await {
                    debug!("close handshake failed: {}", e);
                }
                return SessionEnd::Cancelled;
            }

            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    emit(events, TransportError::SendFailed(e.to_string()).into());
                    return SessionEnd::Dropped;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        emit(events, TransportEvent::Message(text.to_string()));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite; binary is not part of the protocol
                    }
                    Some(Err(e)) => {
                        emit(events, TransportError::ReceiveFailed(e.to_string()).into());
                        return SessionEnd::Dropped;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "websocket_tests.rs"]
mod tests;
