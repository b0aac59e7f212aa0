//! Reconnecting websocket transport.
//!
//! Connects to a UniFi controller's legacy websocket endpoint and forwards
//! every text frame, parsed as JSON, through an ordered [`mpsc`] channel.
//! Frames are never reordered, batched, or dropped for lag: the reader
//! waits for the consumer before pulling the next frame.
//!
//! The transport exposes its lifecycle as a [`WebSocketState`] watch:
//!
//! ```text
//! Disconnected -> Starting -> Running -> { Stopped | Disconnected }
//! ```
//!
//! `Stopped` is entered only through [`WebSocketHandle::shutdown`] and is
//! terminal. `Disconnected` is re-started by the reconnect loop with
//! exponential backoff.
//!
//! # Example
//!
//! ```rust,ignore
//! use unimirror_api::websocket::{ReconnectConfig, WebSocketHandle};
//! use tokio_util::sync::CancellationToken;
//!
//! let ws_url = url::Url::parse("wss://192.168.1.1/proxy/network/wss/s/default/events")?;
//! let (handle, mut frames) =
//!     WebSocketHandle::connect(ws_url, ReconnectConfig::default(), CancellationToken::new(), None);
//!
//! while let Some(frame) = frames.recv().await {
//!     println!("{}", frame["meta"]["message"]);
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Frame channel capacity ───────────────────────────────────────────

const FRAME_CHANNEL_CAPACITY: usize = 256;

// ── WebSocketState ───────────────────────────────────────────────────

/// Lifecycle of a websocket transport instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebSocketState {
    /// Not connected. The reconnect loop may start it again.
    Disconnected,
    /// Connection attempt and handshake in progress.
    Starting,
    /// Connected; frames are being forwarded.
    Running,
    /// Shut down explicitly. Terminal.
    Stopped,
}

/// Move to `next` unless the transport is already `Stopped`.
fn transition(state: &watch::Sender<WebSocketState>, next: WebSocketState) {
    state.send_if_modified(|current| {
        if *current == WebSocketState::Stopped || *current == next {
            return false;
        }
        tracing::trace!(from = ?*current, to = ?next, "WebSocket state change");
        *current = next;
        true
    });
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for websocket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── WebSocketHandle ──────────────────────────────────────────────────

/// Handle to a running websocket transport.
///
/// Dropping the frame receiver ends the background task; calling
/// [`shutdown`](Self::shutdown) ends it and marks the transport `Stopped`.
pub struct WebSocketHandle {
    state: Arc<watch::Sender<WebSocketState>>,
    cancel: CancellationToken,
}

impl WebSocketHandle {
    /// Spawn the connect/read/reconnect loop.
    ///
    /// Returns immediately; the first connection attempt happens on the
    /// spawned task. Frames arrive on the returned receiver in the order
    /// the controller sent them. Must be called inside a Tokio runtime.
    pub fn connect(
        ws_url: Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
        cookie: Option<String>,
    ) -> (Self, mpsc::Receiver<serde_json::Value>) {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let state = Arc::new(watch::Sender::new(WebSocketState::Disconnected));

        let task_state = Arc::clone(&state);
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(ws_url, frame_tx, reconnect, task_cancel, cookie, task_state).await;
        });

        (Self { state, cancel }, frame_rx)
    }

    /// Observe the transport lifecycle.
    pub fn state(&self) -> watch::Receiver<WebSocketState> {
        self.state.subscribe()
    }

    /// Current lifecycle state.
    pub fn current_state(&self) -> WebSocketState {
        *self.state.borrow()
    }

    /// Stop the transport. Idempotent; the state becomes `Stopped` for good.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.state.send_replace(WebSocketState::Stopped);
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn ws_loop(
    ws_url: Url,
    frame_tx: mpsc::Sender<serde_json::Value>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
    cookie: Option<String>,
    state: Arc<watch::Sender<WebSocketState>>,
) {
    let mut attempt: u32 = 0;

    loop {
        transition(&state, WebSocketState::Starting);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &frame_tx, &cancel, cookie.as_deref(), &state) => result,
        };

        transition(&state, WebSocketState::Disconnected);

        if cancel.is_cancelled() {
            break;
        }
        if frame_tx.is_closed() {
            tracing::debug!("frame receiver dropped, stopping WebSocket loop");
            break;
        }

        let delay = match result {
            // Clean disconnect (server close frame or stream ended).
            Ok(()) => {
                tracing::info!("WebSocket disconnected cleanly, reconnecting");
                attempt = 0;
                reconnect_delay(true, attempt, &reconnect)
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "WebSocket error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            max_retries = max,
                            "WebSocket reconnection limit reached, giving up"
                        );
                        break;
                    }
                }
                let delay = reconnect_delay(false, attempt, &reconnect);
                attempt += 1;
                delay
            }
        };

        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    if cancel.is_cancelled() {
        state.send_replace(WebSocketState::Stopped);
    }
    tracing::debug!("WebSocket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single websocket connection, read frames until it drops.
///
/// If `cookie` is provided, it's injected as a `Cookie` header on the
/// upgrade request (the legacy websocket authenticates by session cookie).
async fn connect_and_read(
    url: &Url,
    frame_tx: &mpsc::Sender<serde_json::Value>,
    cancel: &CancellationToken,
    cookie: Option<&str>,
    state: &watch::Sender<WebSocketState>,
) -> Result<(), Error> {
    tracing::info!(url = %url, "Connecting to WebSocket");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let mut request = ClientRequestBuilder::new(uri);
    if let Some(cookie_val) = cookie {
        request = request.with_header("Cookie", cookie_val);
    }

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("WebSocket connected");
    transition(state, WebSocketState::Running);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let Some(value) = parse_frame(&text) else { continue };
                        if frame_tx.send(value).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                        } else {
                            tracing::info!("WebSocket close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Parse a text frame into a JSON object.
///
/// Anything that is not a JSON object is dropped with a debug log; the
/// envelope itself is interpreted by the consumer.
pub fn parse_frame(text: &str) -> Option<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            tracing::debug!("Ignoring non-object WebSocket frame");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse WebSocket frame");
            None
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Pause before the next connection attempt.
///
/// A clean close waits the initial delay, so a controller that accepts and
/// immediately closes is not reconnected in a tight loop. Errors back off.
fn reconnect_delay(clean: bool, attempt: u32, config: &ReconnectConfig) -> Duration {
    if clean {
        config.initial_delay
    } else {
        calculate_backoff(attempt, config)
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * ((f64::from(attempt) * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
