//! Subscriber-side streaming client with reconnection and circuit breaking.
//!
//! The policy lives in a pure state machine (`Reconnector`) with no timers
//! inside, so transition logic is testable without real clocks. The async
//! driver (`SseClient`) owns the timers and the transport and turns machine
//! actions into opens, backoff sleeps and callback invocations.

use std::future::Future;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::snapshot::Snapshot;
use crate::sse::FrameDecoder;

/// Backoff delay before the first automatic reconnection attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);
/// Ceiling for the doubled backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_millis(30_000);
/// Consecutive transport errors tolerated before the circuit opens.
pub const MAX_RETRIES: u32 = 10;

/// Connection health as reported to the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Reconnecting,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

/// Internal machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Idle,
    Reconnecting,
    Connected,
    /// Terminal until a manual `reconnect()`.
    Disconnected,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Open the transport now.
    Open,
    /// Sleep, then open.
    RetryAfter(Duration),
    /// Circuit open: no automatic attempts until a manual reconnect.
    GiveUp,
}

/// Retry ceiling and backoff bounds.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
            max_retries: MAX_RETRIES,
        }
    }
}

/// Pure reconnection state machine.
///
/// Transitions mutate one state field and return the action the driver
/// should take; no timers or I/O happen in here.
pub struct Reconnector {
    policy: ReconnectPolicy,
    state: StreamState,
    retries: u32,
    backoff: Duration,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: StreamState::Idle,
            retries: 0,
            backoff: policy.initial_backoff,
        }
    }

    /// Status label for the current state.
    pub fn status(&self) -> ConnectionStatus {
        match self.state {
            StreamState::Connected => ConnectionStatus::Connected,
            StreamState::Reconnecting => ConnectionStatus::Reconnecting,
            StreamState::Idle | StreamState::Disconnected => ConnectionStatus::Disconnected,
        }
    }

    /// Initial connect request.
    pub fn connect(&mut self) -> ReconnectAction {
        self.state = StreamState::Reconnecting;
        ReconnectAction::Open
    }

    /// The transport opened successfully.
    pub fn opened(&mut self) {
        self.state = StreamState::Connected;
        self.retries = 0;
        self.backoff = self.policy.initial_backoff;
    }

    /// A data frame was successfully parsed. A healthy stream forgives
    /// prior transient errors; only the retry counter resets.
    pub fn frame_received(&mut self) {
        self.retries = 0;
    }

    /// The transport failed (open refused, stream error, or server close).
    pub fn transport_error(&mut self) -> ReconnectAction {
        self.retries += 1;

        if self.retries >= self.policy.max_retries {
            self.state = StreamState::Disconnected;
            return ReconnectAction::GiveUp;
        }

        self.state = StreamState::Reconnecting;
        let delay = self.backoff;
        self.backoff = (self.backoff * 2).min(self.policy.max_backoff);
        ReconnectAction::RetryAfter(delay)
    }

    /// Manual reconnect: resets counter and backoff and reopens from any
    /// state, including Disconnected.
    pub fn reconnect(&mut self) -> ReconnectAction {
        self.retries = 0;
        self.backoff = self.policy.initial_backoff;
        self.state = StreamState::Reconnecting;
        ReconnectAction::Open
    }
}

/// A source of raw SSE byte streams.
///
/// Injected into the client so tests can script connections without sockets.
pub trait Transport: Send {
    type Stream: Stream<Item = Result<Vec<u8>, TransportError>> + Send + Unpin;

    fn open(&mut self) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

/// HTTP transport over a streaming GET request.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    type Stream = futures_util::stream::BoxStream<'static, Result<Vec<u8>, TransportError>>;

    async fn open(&mut self) -> Result<Self::Stream, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let stream = response.bytes_stream().map(|item| match item {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => Err(TransportError::Interrupted(e.to_string())),
        });

        Ok(Box::pin(stream))
    }
}

/// External control messages for a running client.
#[derive(Debug, Clone, Copy)]
pub enum ClientCommand {
    /// User-triggered reconnect, valid from any state.
    Reconnect,
    Shutdown,
}

/// Handle for controlling a running [`SseClient`].
#[derive(Clone)]
pub struct ClientHandle {
    tx: UnboundedSender<ClientCommand>,
}

impl ClientHandle {
    pub fn reconnect(&self) {
        let _ = self.tx.send(ClientCommand::Reconnect);
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(ClientCommand::Shutdown);
    }
}

enum Flow {
    Continue(ReconnectAction),
    Shutdown,
}

/// Async driver: opens the transport, decodes frames, applies the
/// reconnection policy and invokes the callbacks.
pub struct SseClient<T: Transport> {
    transport: T,
    machine: Reconnector,
    commands: UnboundedReceiver<ClientCommand>,
    on_status: Box<dyn FnMut(ConnectionStatus) + Send>,
    on_snapshot: Box<dyn FnMut(Snapshot) + Send>,
}

impl<T: Transport> SseClient<T> {
    pub fn new(transport: T, policy: ReconnectPolicy) -> (Self, ClientHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Self {
            transport,
            machine: Reconnector::new(policy),
            commands: rx,
            on_status: Box::new(|_| {}),
            on_snapshot: Box::new(|_| {}),
        };
        (client, ClientHandle { tx })
    }

    /// Sets the status callback, invoked synchronously on every transition.
    pub fn on_status(mut self, callback: impl FnMut(ConnectionStatus) + Send + 'static) -> Self {
        self.on_status = Box::new(callback);
        self
    }

    /// Sets the snapshot callback, invoked for every parsed data frame.
    pub fn on_snapshot(mut self, callback: impl FnMut(Snapshot) + Send + 'static) -> Self {
        self.on_snapshot = Box::new(callback);
        self
    }

    /// Runs until shutdown. Automatic reattempts stop once the circuit
    /// opens; a manual reconnect command re-arms them.
    pub async fn run(mut self) {
        let mut action = self.machine.connect();
        self.notify();

        loop {
            match action {
                ReconnectAction::Open => match self.transport.open().await {
                    Ok(stream) => {
                        self.machine.opened();
                        self.notify();
                        match self.consume(stream).await {
                            Flow::Continue(next) => action = next,
                            Flow::Shutdown => return,
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to open stream");
                        action = self.machine.transport_error();
                        self.notify();
                    }
                },
                ReconnectAction::RetryAfter(delay) => {
                    debug!(?delay, "backing off before reconnect");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => action = ReconnectAction::Open,
                        cmd = self.commands.recv() => match cmd {
                            Some(ClientCommand::Reconnect) => {
                                action = self.machine.reconnect();
                                self.notify();
                            }
                            Some(ClientCommand::Shutdown) | None => return,
                        },
                    }
                }
                ReconnectAction::GiveUp => match self.commands.recv().await {
                    Some(ClientCommand::Reconnect) => {
                        action = self.machine.reconnect();
                        self.notify();
                    }
                    Some(ClientCommand::Shutdown) | None => return,
                },
            }
        }
    }

    /// Consumes an open stream until it errors, closes, or a command
    /// interrupts it.
    async fn consume(&mut self, mut stream: T::Stream) -> Flow {
        let mut decoder = FrameDecoder::new();

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(ClientCommand::Reconnect) => {
                        let action = self.machine.reconnect();
                        self.notify();
                        return Flow::Continue(action);
                    }
                    Some(ClientCommand::Shutdown) | None => return Flow::Shutdown,
                },
                item = stream.next() => match item {
                    Some(Ok(chunk)) => {
                        for payload in decoder.push(&String::from_utf8_lossy(&chunk)) {
                            match serde_json::from_str::<Snapshot>(&payload) {
                                Ok(snapshot) => {
                                    self.machine.frame_received();
                                    (self.on_snapshot)(snapshot);
                                }
                                // A malformed frame is dropped; it is not a
                                // transport error and changes no state.
                                Err(e) => warn!(error = %e, "dropping malformed frame"),
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "stream error");
                        let action = self.machine.transport_error();
                        self.notify();
                        return Flow::Continue(action);
                    }
                    None => {
                        warn!("stream closed by server");
                        let action = self.machine.transport_error();
                        self.notify();
                        return Flow::Continue(action);
                    }
                },
            }
        }
    }

    fn notify(&mut self) {
        (self.on_status)(self.machine.status());
    }
}
