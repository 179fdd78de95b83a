#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::classify::FrameClassifier;
use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::envelope::{ConnectionState, Envelope};
use crate::error::TransportError;
use crate::heartbeat::HeartbeatMonitor;
use crate::registry::SubscriberRegistry;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why an active session ended.
enum SessionEnd {
    /// The peer closed the connection or the stream ran dry
    Peer,
    /// A transport-level failure
    Failed(tokio_tungstenite::tungstenite::Error),
    /// `close()` was called on the manager
    Shutdown,
}

/// Manages the transport lifecycle: connection, reconnection and heartbeat.
///
/// The manager owns the WebSocket handle and is the single source of truth
/// for [`ConnectionState`]. Every lifecycle transition is published twice:
/// on a `watch` channel for code that polls state, and as a synthesized
/// status envelope through the [`SubscriberRegistry`]. Inbound frames run
/// through the classifier `C` and fan out to the registry unconditionally.
///
/// Transport failures are never surfaced to the caller as errors. They
/// appear as an `error` status followed by a `closed` status and a retry
/// after the current backoff delay, forever, until [`close`](Self::close)
/// is called.
#[derive(Clone)]
pub struct ConnectionManager<C>
where
    C: FrameClassifier,
{
    /// Watch channel sender for state changes
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for checking the current state
    state_rx: watch::Receiver<ConnectionState>,
    /// Sender channel for outgoing frames
    sender_tx: mpsc::UnboundedSender<String>,
    /// Fan-out registry shared with the background task
    registry: SubscriberRegistry,
    /// Cancels the background task; the intentional-close signal
    shutdown: CancellationToken,
    /// Set once by the first `close()` call
    closed: Arc<AtomicBool>,
    /// Phantom data for the classifier type parameter
    _phantom: PhantomData<C>,
}

impl<C> ConnectionManager<C>
where
    C: FrameClassifier,
{
    /// Create a manager and start the connection loop.
    ///
    /// Returns immediately; the first attempt proceeds in a background task
    /// and cannot fail synchronously. Callers observe progress through the
    /// registry or [`state_receiver`](Self::state_receiver).
    pub fn new(
        endpoint: Endpoint,
        config: Config,
        classifier: C,
        registry: SubscriberRegistry,
    ) -> Self {
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);
        let shutdown = CancellationToken::new();
        let closed = Arc::new(AtomicBool::new(false));

        let task_registry = registry.clone();
        let task_state_tx = state_tx.clone();
        let task_shutdown = shutdown.clone();
        let task_closed = Arc::clone(&closed);

        tokio::spawn(async move {
            Self::connection_loop(
                endpoint,
                config,
                sender_rx,
                task_registry,
                classifier,
                task_state_tx,
                task_shutdown,
                task_closed,
            )
            .await;
        });

        Self {
            state_tx,
            state_rx,
            sender_tx,
            registry,
            shutdown,
            closed,
            _phantom: PhantomData,
        }
    }

    /// Main connection loop with automatic reconnection.
    #[expect(
        clippy::too_many_arguments,
        reason = "Task entry point taking ownership of the manager's shared halves"
    )]
    async fn connection_loop(
        endpoint: Endpoint,
        config: Config,
        mut sender_rx: mpsc::UnboundedReceiver<String>,
        registry: SubscriberRegistry,
        classifier: C,
        state_tx: watch::Sender<ConnectionState>,
        shutdown: CancellationToken,
        closed: Arc<AtomicBool>,
    ) {
        let mut backoff: ExponentialBackoff = config.reconnect.clone().into();

        loop {
            Self::transition(&state_tx, &registry, ConnectionState::Connecting);

            // Re-resolved on every attempt; scheme and host are never cached.
            let url = endpoint.resolve();

            let attempt = tokio::select! {
                () = shutdown.cancelled() => break,
                attempt = connect_async(url) => attempt,
            };

            match attempt {
                Ok((ws_stream, _)) => {
                    backoff.reset();
                    Self::transition(&state_tx, &registry, ConnectionState::Open);

                    let ended = Self::handle_connection(
                        ws_stream,
                        &mut sender_rx,
                        &registry,
                        &classifier,
                        &config,
                        &shutdown,
                    )
                    .await;

                    match ended {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Failed(e) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(error = %e, "Transport failure");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                            Self::transition(&state_tx, &registry, ConnectionState::Error);
                        }
                        SessionEnd::Peer => {}
                    }
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %e, "Unable to connect");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                    Self::transition(&state_tx, &registry, ConnectionState::Error);
                }
            }

            // `close()` raises this flag before cancelling and emits its own
            // final `closed` status; emitting one here too would double it.
            if closed.load(Ordering::SeqCst) {
                break;
            }

            Self::transition(&state_tx, &registry, ConnectionState::Closed);

            if let Some(delay) = backoff.next_backoff() {
                #[cfg(feature = "tracing")]
                tracing::debug!(?delay, "Waiting before reconnecting");

                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = sleep(delay) => {}
                }
            }
        }
    }

    /// Handle an active WebSocket session until it ends.
    async fn handle_connection(
        ws_stream: WsStream,
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        registry: &SubscriberRegistry,
        classifier: &C,
        config: &Config,
        shutdown: &CancellationToken,
    ) -> SessionEnd {
        let (mut write, mut read) = ws_stream.split();

        // Dropped with the session, so at most one heartbeat timer is armed
        // across any sequence of reconnects.
        let mut heartbeat = HeartbeatMonitor::new(config.heartbeat_interval);

        loop {
            tokio::select! {
                // Inbound frames, classified and fanned out unconditionally
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            #[cfg(feature = "tracing")]
                            tracing::trace!(%text, "Received frame");

                            registry.notify(&classifier.classify(text.as_str()));
                        }
                        Some(Ok(Message::Close(_))) | None => return SessionEnd::Peer,
                        Some(Err(e)) => return SessionEnd::Failed(e),
                        Some(Ok(_)) => {
                            // Binary and low-level control frames carry
                            // nothing for subscribers.
                        }
                    }
                }

                // Outbound messages queued by the caller
                Some(text) = sender_rx.recv() => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        return SessionEnd::Failed(e);
                    }
                }

                // Keep-alive ping; a failed send means the transport is
                // about to close and the read side will observe it.
                () = heartbeat.tick() => {
                    _ = write.send(Message::Text(HeartbeatMonitor::frame().into())).await;
                }

                () = shutdown.cancelled() => {
                    _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    /// Publish a state change on the watch channel and as a status envelope.
    fn transition(
        state_tx: &watch::Sender<ConnectionState>,
        registry: &SubscriberRegistry,
        state: ConnectionState,
    ) {
        _ = state_tx.send(state);
        registry.notify(&Envelope::Status(state));
    }

    /// Queue a message for the hub. The payload is opaque to the transport
    /// core; it is serialized and relayed as-is.
    pub fn send<R: Serialize>(&self, message: &R) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.send_text(json)
    }

    /// Queue raw frame text for the hub.
    pub fn send_text<S: Into<String>>(&self, text: S) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed.into());
        }
        self.sender_tx
            .send(text.into())
            .map_err(|_e| TransportError::ConnectionClosed)?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Whether `close()` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Tear down the connection deterministically.
    ///
    /// Emits exactly one final `closed` status envelope, then drops all
    /// subscriptions. No reconnection is scheduled; the background task and
    /// both timers wind down at their next await point. Idempotent — the
    /// second and later calls are no-ops.
    ///
    /// The subscriptions are removed in the same step that delivers the
    /// final envelope, so a connection loop racing this call finds an empty
    /// registry and listeners never observe anything after the final
    /// `closed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shutdown.cancel();
        _ = self.state_tx.send(ConnectionState::Closed);
        self.registry
            .finalize(&Envelope::Status(ConnectionState::Closed));
    }
}
