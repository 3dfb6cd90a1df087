//! Connection lifecycle: connect, reconnect with backoff, teardown.
//!
//! The transport owns one duplex WebSocket connection to the device and
//! delivers every inbound text frame, verbatim, to the router from a
//! single read loop. It never touches the channel registry: connection
//! events update only the observable [`ConnectionState`], so subscriptions
//! survive disconnect/reconnect cycles unchanged.
//!
//! On an unexpected close or socket error the connection task sleeps the
//! policy's backoff delay and retries, indefinitely, until it succeeds or
//! [`Transport::close`] cancels it. Socket errors are logged and absorbed
//! here; consumers only ever see the connection-state flag.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use metrics::counter;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use helio_core::reconnect::ReconnectPolicy;

use crate::errors::TransportError;
use crate::router::FrameRouter;

/// Outbound queue depth; sends beyond this return
/// [`TransportError::QueueFull`].
const SEND_QUEUE_DEPTH: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Observable lifecycle of the device connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none pending (initial state, or after `close`).
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is established; frames are flowing.
    Connected,
    /// The connection dropped; a reconnect attempt is scheduled.
    ReconnectPending,
}

impl ConnectionState {
    /// Whether frames can currently flow.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Book-keeping for the currently spawned connection task.
struct ActiveLink {
    endpoint: String,
    cancel: CancellationToken,
    outbound: mpsc::Sender<String>,
}

/// Owns the WebSocket connection to the device.
pub struct Transport {
    router: Arc<FrameRouter>,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
    link: Mutex<Option<ActiveLink>>,
}

impl Transport {
    /// Create a transport delivering inbound frames to `router`.
    pub fn new(router: Arc<FrameRouter>, policy: ReconnectPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            router,
            policy,
            state_tx,
            link: Mutex::new(None),
        }
    }

    /// Watch connection-state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Whether the connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Open (or move) the connection to `endpoint`.
    ///
    /// Idempotent: if a connection task for the same endpoint is already
    /// live, this is a no-op. A different endpoint cancels the old task
    /// and spawns a fresh one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, endpoint: &str) {
        let mut link = self.link.lock();
        if let Some(active) = link.as_ref() {
            if active.endpoint == endpoint && !active.cancel.is_cancelled() {
                trace!(endpoint, "connect: endpoint unchanged, nothing to do");
                return;
            }
            info!(old = %active.endpoint, new = endpoint, "endpoint changed, tearing down old connection");
            active.cancel.cancel();
        } else {
            info!(endpoint, "opening device connection");
        }

        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(SEND_QUEUE_DEPTH);
        *link = Some(ActiveLink {
            endpoint: endpoint.to_owned(),
            cancel: cancel.clone(),
            outbound: outbound_tx,
        });

        let task = ConnectionTask {
            endpoint: endpoint.to_owned(),
            router: Arc::clone(&self.router),
            policy: self.policy.clone(),
            state: self.state_tx.clone(),
            cancel,
        };
        drop(tokio::spawn(task.run(outbound_rx)));
    }

    /// Tear the connection down and suppress further reconnection.
    ///
    /// Idempotent. Registered subscriptions are untouched.
    pub fn close(&self) {
        let mut link = self.link.lock();
        if let Some(active) = link.take() {
            info!(endpoint = %active.endpoint, "closing transport");
            active.cancel.cancel();
        }
        let _ = self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Queue an outbound text frame.
    ///
    /// Fails when no connection is established or the outbound queue is
    /// full; neither case blocks.
    pub fn send(&self, text: impl Into<String>) -> Result<(), TransportError> {
        let link = self.link.lock();
        let Some(active) = link.as_ref() else {
            return Err(TransportError::NotConnected);
        };
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        match active.outbound.try_send(text.into()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                counter!("link_outbound_drops_total").increment(1);
                Err(TransportError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TransportError::NotConnected),
        }
    }
}

/// The spawned per-endpoint connection loop.
struct ConnectionTask {
    endpoint: String,
    router: Arc<FrameRouter>,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl ConnectionTask {
    /// Connect, drive, and reconnect until cancelled.
    async fn run(self, mut outbound: mpsc::Receiver<String>) {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            self.set_state(ConnectionState::Connecting);

            match timeout(self.policy.connect_timeout(), connect_async(self.endpoint.as_str())).await
            {
                Ok(Ok((stream, _response))) => {
                    info!(endpoint = %self.endpoint, "connected");
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    if self.drive(stream, &mut outbound).await {
                        // Explicit teardown; `close()` owns the state.
                        return;
                    }
                    warn!(endpoint = %self.endpoint, "connection lost");
                }
                Ok(Err(error)) => {
                    warn!(endpoint = %self.endpoint, %error, "connection attempt failed");
                }
                Err(_elapsed) => {
                    warn!(
                        endpoint = %self.endpoint,
                        timeout_ms = self.policy.connect_timeout_ms,
                        "connection attempt timed out"
                    );
                }
            }

            self.set_state(ConnectionState::ReconnectPending);
            counter!("link_reconnect_attempts_total").increment(1);
            let delay = self.policy.delay_for(attempt);
            attempt = attempt.saturating_add(1);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect backoff");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancel.cancelled() => return,
            }
        }
    }

    /// Pump one established connection. Returns `true` when the loop ended
    /// because of explicit cancellation (no reconnect wanted).
    async fn drive(&self, stream: WsStream, outbound: &mut mpsc::Receiver<String>) -> bool {
        let (mut sink, mut source) = stream.split();
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return true;
                }
                inbound = source.next() => match inbound {
                    Some(Ok(Message::Text(text))) => self.router.route(text.as_str()),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(endpoint = %self.endpoint, "server closed connection");
                        return false;
                    }
                    // Binary frames and pongs carry nothing for us.
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        warn!(endpoint = %self.endpoint, %error, "socket error");
                        return false;
                    }
                    None => return false,
                },
                queued = outbound.recv() => match queued {
                    Some(text) => {
                        if let Err(error) = sink.send(Message::Text(text.into())).await {
                            warn!(endpoint = %self.endpoint, %error, "outbound send failed");
                            return false;
                        }
                    }
                    // The sender half lives in the transport's link slot
                    // and is only dropped on teardown or replacement.
                    None => return true,
                },
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        // After teardown the transport owns the terminal state; a late
        // write from this task must not clobber it.
        if !self.cancel.is_cancelled() {
            let _ = self.state.send_replace(state);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
