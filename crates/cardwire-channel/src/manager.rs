//! The channel manager: one persistent WebSocket per session.
//!
//! `ChannelManager` owns the connection lifecycle end to end:
//!
//! 1. **Connect** — builds the channel target from the configured
//!    endpoint plus the context's credential token. No credential means
//!    no attempt: the caller gets [`ChannelError::AuthRequired`].
//! 2. **Pump** — an I/O task forwards outbound frames from an internal
//!    queue and delivers inbound text frames as [`ChannelEvent`]s.
//! 3. **Probe** — a periodic liveness check reconnects whenever the
//!    channel reports `Closing`/`Closed` and the session context does
//!    not flag an intentional navigation. Retries are fixed-interval and
//!    unbounded; DESIGN.md records that decision.
//! 4. **Join** — on open, the initial `join_game` is deferred by
//!    short-interval polling until local bookkeeping (catalog +
//!    presentation) is ready, then sent exactly once per connection.
//! 5. **Teardown** — cancels every task; on an ungraceful teardown it
//!    first makes a best-effort in-band disconnect send plus one
//!    fire-and-forget out-of-band notice.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cardwire_protocol::{ClientMessage, Codec, JsonCodec};
use cardwire_session::SessionContext;
use futures_util::{SinkExt, StreamExt};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::ChannelError;

/// Grace window for flushing the best-effort disconnect frame before
/// the socket is torn down.
const FLUSH_GRACE: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Channel behavior knobs.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket endpoint base, e.g. `ws://localhost:3000`. The manager
    /// appends `/ws?token=...`.
    pub endpoint: String,

    /// How often the liveness probe inspects the channel state.
    /// Default: 5 seconds.
    pub probe_interval: Duration,

    /// How often the open handler re-checks readiness before sending
    /// the deferred join. Default: 200 ms.
    pub ready_poll_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:3000".to_string(),
            probe_interval: Duration::from_secs(5),
            ready_poll_interval: Duration::from_millis(200),
        }
    }
}

impl ChannelConfig {
    /// Fixes zero intervals so `tokio::time::interval` can't panic.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.probe_interval.is_zero() {
            tracing::warn!("probe_interval is zero, using default");
            self.probe_interval = defaults.probe_interval;
        }
        if self.ready_poll_interval.is_zero() {
            self.ready_poll_interval = defaults.ready_poll_interval;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Channel lifecycle state, mirroring the readyState progression of the
/// underlying socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ChannelState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// `Closing` and `Closed` both count as down for the probe.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Open => write!(f, "OPEN"),
            Self::Closing => write!(f, "CLOSING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// The probe reconnects only when the channel is down AND the closure
/// is not an intentional in-app navigation.
fn should_reconnect(state: ChannelState, intentional_navigation: bool) -> bool {
    state.is_terminal() && !intentional_navigation
}

/// Builds the channel target: endpoint + `/ws` + percent-encoded
/// credential as a query parameter.
fn endpoint_url(endpoint: &str, credential: &str) -> String {
    let token = utf8_percent_encode(credential, NON_ALPHANUMERIC);
    format!("{}/ws?token={token}", endpoint.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Events + ports
// ---------------------------------------------------------------------------

/// What the channel reports upward to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection opened (initial connect or probe reconnect).
    Opened,

    /// An inbound frame, as raw bytes for the codec.
    Frame(Vec<u8>),

    /// The connection closed. `expected` is derived from the
    /// navigation-intent flags: an unexpected close should trigger the
    /// return-to-authentication flow.
    Closed { expected: bool },
}

/// Out-of-band disconnect notice, fired at most once on ungraceful
/// teardown. The implementation must not wait for a response
/// (sendBeacon semantics); the meta crate wires this to the lobby API.
pub trait DisconnectNotice: Send + Sync {
    fn notify(&self, credential: &str);
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

struct Shared<C: Codec> {
    config: ChannelConfig,
    context: Arc<SessionContext>,
    codec: C,
    state: AtomicU8,
    events: mpsc::UnboundedSender<ChannelEvent>,
    /// Sender into the current connection's outbound queue. Replaced on
    /// reconnect; `None` while down.
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    io_task: Mutex<Option<JoinHandle<()>>>,
    join_task: Mutex<Option<JoinHandle<()>>>,
    probe_task: Mutex<Option<JoinHandle<()>>>,
    notice: Mutex<Option<Box<dyn DisconnectNotice>>>,
}

impl<C: Codec> Shared<C> {
    fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ChannelState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Owns the persistent session channel. Exactly one instance exists per
/// session; clones of the handle share it.
pub struct ChannelManager<C: Codec = JsonCodec> {
    shared: Arc<Shared<C>>,
}

impl<C: Codec> Clone for ChannelManager<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl ChannelManager<JsonCodec> {
    /// Creates a manager with the default JSON codec. Returns the
    /// manager and the event stream the engine consumes.
    pub fn new(
        config: ChannelConfig,
        context: Arc<SessionContext>,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        Self::with_codec(config, context, JsonCodec)
    }
}

impl<C: Codec> ChannelManager<C> {
    pub fn with_codec(
        config: ChannelConfig,
        context: Arc<SessionContext>,
        codec: C,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            config: config.validated(),
            context,
            codec,
            state: AtomicU8::new(ChannelState::Closed as u8),
            events: events_tx,
            outbound: Mutex::new(None),
            io_task: Mutex::new(None),
            join_task: Mutex::new(None),
            probe_task: Mutex::new(None),
            notice: Mutex::new(None),
        });
        (Self { shared }, events_rx)
    }

    /// Installs the out-of-band disconnect notice port.
    pub fn set_disconnect_notice(&self, notice: Box<dyn DisconnectNotice>) {
        *self.shared.notice.lock().expect("channel lock poisoned") =
            Some(notice);
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state() == ChannelState::Open
    }

    /// Establishes the connection with the context's credential.
    ///
    /// # Errors
    /// - [`ChannelError::AuthRequired`] when no credential is present
    ///   (no connection is attempted).
    /// - [`ChannelError::Connect`] when the WebSocket handshake fails;
    ///   the state is left `Closed` for the probe to retry.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        connect_shared(&self.shared).await
    }

    /// Encodes and enqueues a frame.
    ///
    /// # Errors
    /// Returns [`ChannelError::NotConnected`] unless the channel is
    /// `Open`. Callers treat sends as fire-and-forget; results arrive
    /// later as independent inbound messages.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), ChannelError> {
        if self.shared.state() != ChannelState::Open {
            tracing::warn!("cannot send, channel not open");
            return Err(ChannelError::NotConnected);
        }
        let frame = encode_frame(&self.shared.codec, msg)?;
        let guard = self.shared.outbound.lock().expect("channel lock poisoned");
        match guard.as_ref() {
            Some(tx) if tx.send(frame).is_ok() => Ok(()),
            _ => Err(ChannelError::NotConnected),
        }
    }

    /// Starts the periodic liveness probe.
    ///
    /// Every `probe_interval` the probe inspects the channel state; if
    /// it is terminal and the context does not flag intentional
    /// navigation, it re-invokes `connect` with the same credential.
    /// Unbounded: it keeps retrying for as long as the session lives.
    pub fn spawn_probe(&self) {
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(shared.config.probe_interval);
            ticker.set_missed_tick_behavior(
                tokio::time::MissedTickBehavior::Delay,
            );
            // The first tick completes immediately; the first real
            // check happens one interval from now.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let state = shared.state();
                tracing::trace!(%state, "channel liveness check");

                if should_reconnect(
                    state,
                    shared.context.is_intentional_navigation(),
                ) {
                    tracing::info!(%state, "channel down, reconnecting");
                    if let Err(e) = connect_shared(&shared).await {
                        tracing::warn!(error = %e, "reconnect attempt failed");
                    }
                }
            }
        });

        let mut slot =
            self.shared.probe_task.lock().expect("channel lock poisoned");
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    /// Tears the channel down.
    ///
    /// With `intentional = false` (page close, session end) a
    /// best-effort disconnect notice goes out first: one in-band frame
    /// if the channel is open, plus one fire-and-forget out-of-band
    /// notice. With `intentional = true` (in-app navigation) nothing is
    /// sent. Either way the probe, join poller, and I/O task are
    /// cancelled so no reconnect attempt outlives the session.
    pub async fn shutdown(&self, intentional: bool) {
        abort_slot(&self.shared.probe_task);
        abort_slot(&self.shared.join_task);

        if !intentional {
            self.send_teardown_notices().await;
        }

        self.shared.set_state(ChannelState::Closing);
        // Dropping the outbound sender ends the I/O task's send loop,
        // which closes the sink and marks the channel Closed.
        self.shared
            .outbound
            .lock()
            .expect("channel lock poisoned")
            .take();

        abort_slot(&self.shared.io_task);
        self.shared.set_state(ChannelState::Closed);
    }

    async fn send_teardown_notices(&self) {
        let context = &self.shared.context;
        if let (Some(game_id), Some(auth_token)) =
            (context.game_id(), context.credential())
        {
            if self.shared.state() == ChannelState::Open {
                let _ = self.send(&ClientMessage::Disconnect {
                    game_id,
                    auth_token,
                });
                // Give the I/O task a moment to flush the frame.
                tokio::time::sleep(FLUSH_GRACE).await;
            }
        }

        if let Some(credential) = context.credential() {
            let guard =
                self.shared.notice.lock().expect("channel lock poisoned");
            if let Some(notice) = guard.as_ref() {
                notice.notify(&credential);
            }
        }
    }
}

fn abort_slot(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(handle) = slot.lock().expect("channel lock poisoned").take() {
        handle.abort();
    }
}

fn encode_frame<C: Codec>(
    codec: &C,
    msg: &ClientMessage,
) -> Result<Message, ChannelError> {
    let bytes = codec.encode(msg)?;
    // The server speaks text frames; the codec output is UTF-8 JSON.
    let text = String::from_utf8(bytes).map_err(|e| {
        ChannelError::Protocol(
            cardwire_protocol::ProtocolError::InvalidMessage(e.to_string()),
        )
    })?;
    Ok(Message::Text(text.into()))
}

// ---------------------------------------------------------------------------
// Connection plumbing
// ---------------------------------------------------------------------------

async fn connect_shared<C: Codec>(
    shared: &Arc<Shared<C>>,
) -> Result<(), ChannelError> {
    match shared.state() {
        ChannelState::Connecting | ChannelState::Open => {
            tracing::debug!("connect skipped, channel already up");
            return Ok(());
        }
        _ => {}
    }

    let Some(credential) = shared.context.credential() else {
        tracing::warn!("no credential token, not connecting");
        return Err(ChannelError::AuthRequired);
    };

    shared.set_state(ChannelState::Connecting);
    let url = endpoint_url(&shared.config.endpoint, &credential);
    tracing::info!(endpoint = %shared.config.endpoint, "connecting channel");

    let (ws, _response) = match tokio_tungstenite::connect_async(url.as_str())
        .await
    {
        Ok(pair) => pair,
        Err(e) => {
            shared.set_state(ChannelState::Closed);
            return Err(ChannelError::Connect(e));
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    *shared.outbound.lock().expect("channel lock poisoned") =
        Some(outbound_tx);

    // Replace the previous connection's tasks, if any survived.
    abort_slot(&shared.io_task);
    abort_slot(&shared.join_task);

    let io = tokio::spawn(run_io(Arc::clone(shared), ws, outbound_rx));
    *shared.io_task.lock().expect("channel lock poisoned") = Some(io);

    shared.set_state(ChannelState::Open);
    let _ = shared.events.send(ChannelEvent::Opened);

    let join = tokio::spawn(send_join_when_ready(Arc::clone(shared)));
    *shared.join_task.lock().expect("channel lock poisoned") = Some(join);

    Ok(())
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Pumps one connection: outbound queue → sink, stream → events.
async fn run_io<C: Codec>(
    shared: Arc<Shared<C>>,
    ws: WsStream,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            out = outbound_rx.recv() => match out {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        tracing::debug!(error = %e, "channel send failed");
                        break;
                    }
                }
                // Sender dropped: shutdown requested.
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = shared.events.send(ChannelEvent::Frame(
                        text.as_bytes().to_vec(),
                    ));
                }
                Some(Ok(Message::Binary(data))) => {
                    let _ = shared
                        .events
                        .send(ChannelEvent::Frame(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("channel closed by server");
                    break;
                }
                Some(Ok(_)) => {} // ping/pong handled by tungstenite
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "channel receive error");
                    break;
                }
            }
        }
    }

    shared.set_state(ChannelState::Closed);
    let expected = shared.context.is_intentional_navigation()
        || shared.context.channel_was_open();
    let _ = shared.events.send(ChannelEvent::Closed { expected });
}

/// Defers the initial join until local bookkeeping is ready, then sends
/// it exactly once for this connection.
async fn send_join_when_ready<C: Codec>(shared: Arc<Shared<C>>) {
    let mut ticker =
        tokio::time::interval(shared.config.ready_poll_interval);

    loop {
        ticker.tick().await;
        if shared.state().is_terminal() {
            // Connection died while waiting; the next connection gets
            // its own join task.
            return;
        }
        if shared.context.is_ready() {
            break;
        }
        tracing::debug!("bookkeeping not ready, deferring join");
    }

    let (Some(game_id), Some(auth_token)) = (
        shared.context.game_id(),
        shared.context.credential(),
    ) else {
        tracing::warn!("cannot join: missing game id or credential");
        return;
    };

    let msg = ClientMessage::JoinGame {
        game_id,
        auth_token,
    };
    match encode_frame(&shared.codec, &msg) {
        Ok(frame) => {
            let guard =
                shared.outbound.lock().expect("channel lock poisoned");
            if let Some(tx) = guard.as_ref() {
                if tx.send(frame).is_ok() {
                    tracing::info!(%game_id, "join request sent");
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to encode join"),
    }
}

// =========================================================================
// Tests
// =========================================================================
