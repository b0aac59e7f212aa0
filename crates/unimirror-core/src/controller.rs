// ── Controller ──
//
// Connection lifecycle for one mirrored site: platform detection, session
// login, initial refresh, the websocket bridge and periodic refresh tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use unimirror_api::transport::{TlsMode, TransportConfig};
use unimirror_api::websocket::{WebSocketHandle, WebSocketState};
use unimirror_api::{LegacyClient, Resource};

use crate::config::{ControllerConfig, TlsVerification};
use crate::error::CoreError;
use crate::store::DataStore;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ── Controller ───────────────────────────────────────────────────

/// Entry point: one controller site, mirrored.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. The mirror itself lives in
/// the [`DataStore`]; the controller only moves data into it.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    store: Arc<DataStore>,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    /// Child token for the current connection; cancelled on disconnect,
    /// replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
    legacy_client: Mutex<Option<LegacyClient>>,
    ws_handle: Mutex<Option<WebSocketHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a controller. Does not connect: call [`connect()`](Self::connect).
    pub fn new(config: ControllerConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(ControllerInner {
                config,
                store: Arc::new(DataStore::new()),
                connection_state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                legacy_client: Mutex::new(None),
                ws_handle: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// The mirror: tables, projections, router and event classifier.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Lifecycle of the websocket, once [`connect()`](Self::connect) started it.
    pub async fn websocket_state(&self) -> Option<watch::Receiver<WebSocketState>> {
        self.inner.ws_handle.lock().await.as_ref().map(WebSocketHandle::state)
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Detect the platform, log in, load every resource, then start the
    /// websocket bridge and periodic refresh as configured.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        match self.establish().await {
            Ok(()) => {
                self.inner
                    .connection_state
                    .send_replace(ConnectionState::Connected);
                info!(url = %self.inner.config.url, site = %self.inner.config.site, "connected to controller");
                Ok(())
            }
            Err(e) => {
                self.inner.connection_state.send_replace(ConnectionState::Failed);
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<(), CoreError> {
        // A previous connection's tasks must be gone before new ones start.
        self.stop_background().await;
        if self.inner.legacy_client.lock().await.take().is_some() {
            debug!("replacing previous session");
        }

        // Fresh child token for this connection (supports reconnect).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let config = &self.inner.config;
        let platform = LegacyClient::detect_platform(&config.url).await?;
        debug!(?platform, "detected controller platform");

        let client = LegacyClient::new(
            config.url.clone(),
            config.site.clone(),
            platform,
            &build_transport(config),
        )?;
        client.login(&config.username, &config.password).await?;
        debug!("session authentication successful");
        *self.inner.legacy_client.lock().await = Some(client);

        // Initial data load
        self.refresh_all().await?;

        let mut handles = self.inner.task_handles.lock().await;

        if config.refresh_interval_secs > 0 {
            let ctrl = self.clone();
            let cancel = child.clone();
            handles.push(tokio::spawn(refresh_task(
                ctrl,
                config.refresh_interval_secs,
                cancel,
            )));
        }

        if config.websocket_enabled {
            self.spawn_websocket(&child, &mut handles).await;
        }
        Ok(())
    }

    /// Start the websocket and the bridge task feeding its frames, in
    /// order, into the store's router. Non-fatal on failure.
    async fn spawn_websocket(&self, cancel: &CancellationToken, handles: &mut Vec<JoinHandle<()>>) {
        let legacy_guard = self.inner.legacy_client.lock().await;
        let Some(ref legacy) = *legacy_guard else {
            debug!("no legacy client, websocket unavailable");
            return;
        };

        let ws_url = match legacy
            .platform()
            .websocket_url(&self.inner.config.url, &self.inner.config.site)
        {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "invalid websocket URL");
                return;
            }
        };
        let cookie = legacy.cookie_header();
        drop(legacy_guard);

        if cookie.is_none() {
            warn!("no session cookie, skipping websocket");
            return;
        }

        let ws_cancel = cancel.child_token();
        let (handle, frames) = WebSocketHandle::connect(
            ws_url,
            self.inner.config.reconnect.clone(),
            ws_cancel.clone(),
            cookie,
        );

        let store = Arc::clone(&self.inner.store);
        handles.push(tokio::spawn(bridge_task(store, frames, ws_cancel)));

        *self.inner.ws_handle.lock().await = Some(handle);
        info!("websocket message stream spawned");
    }

    /// Cancel background tasks, stop the websocket and end the session.
    /// The mirror keeps its contents.
    pub async fn disconnect(&self) {
        self.stop_background().await;

        if let Some(client) = self.inner.legacy_client.lock().await.take() {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
        }

        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Cancel the current connection's tasks, stop its websocket and wait
    /// for every task to finish.
    async fn stop_background(&self) {
        self.inner.cancel_child.lock().await.cancel();

        if let Some(handle) = self.inner.ws_handle.lock().await.take() {
            handle.shutdown();
        }

        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Fetch every resource and merge it into the store.
    ///
    /// Resources the controller does not serve (HTTP 404) count as empty.
    /// Any other failure aborts the refresh; tables already merged keep
    /// their new contents.
    pub async fn refresh_all(&self) -> Result<(), CoreError> {
        let guard = self.inner.legacy_client.lock().await;
        let Some(client) = guard.as_ref() else {
            return Err(CoreError::ControllerDisconnected);
        };

        for resource in Resource::ALL {
            let items = match client.list_raw(resource).await {
                Ok(items) => items,
                Err(ref e) if e.is_not_found() => {
                    debug!(?resource, "not available (404), treating as empty");
                    Vec::new()
                }
                Err(e) => return Err(e.into()),
            };
            self.inner.store.apply_snapshot(resource, items);
        }
        drop(guard);

        self.inner.store.mark_refreshed();
        debug!("full refresh complete");
        Ok(())
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// The single context in which websocket frames mutate the mirror: one
/// frame is routed to completion before the next is awaited.
async fn bridge_task(
    store: Arc<DataStore>,
    mut frames: mpsc::Receiver<serde_json::Value>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                store.dispatch(&frame);
            }
        }
    }
    debug!("websocket bridge exiting");
}

async fn refresh_task(controller: Controller, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = controller.refresh_all().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        cookie_jar: None, // LegacyClient::new adds one automatically
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
