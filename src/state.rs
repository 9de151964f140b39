//! Shared application state.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::live::{LiveResult, SharedLiveBackend, create_live_backend};
use crate::core::telemetry::Telemetry;
use crate::handlers::live::SessionCoordinator;

/// Why a WebSocket connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionLimitError {
    #[error("global WebSocket connection limit reached")]
    GlobalLimitReached,
    #[error("per-IP WebSocket connection limit reached")]
    PerIpLimitReached,
}

/// State shared by every request handler.
pub struct AppState {
    pub config: ServerConfig,
    pub backend: SharedLiveBackend,
    pub telemetry: Telemetry,
    coordinator: SessionCoordinator,
    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, u32>,
    active_sessions: AtomicUsize,
}

impl AppState {
    /// Build the state around an already constructed backend.
    pub fn new(config: ServerConfig, backend: SharedLiveBackend, telemetry: Telemetry) -> Arc<Self> {
        let coordinator =
            SessionCoordinator::new(backend.clone(), telemetry.clone(), config.session.settings());

        Arc::new(Self {
            config,
            backend,
            telemetry,
            coordinator,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
            active_sessions: AtomicUsize::new(0),
        })
    }

    /// Build the state, creating the backend selected by the configuration.
    pub fn from_config(config: ServerConfig, telemetry: Telemetry) -> LiveResult<Arc<Self>> {
        let backend = create_live_backend(config.backend, config.gemini_config())?;
        info!(backend = backend.name(), "Live backend initialized");
        Ok(Self::new(config, backend, telemetry))
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Reserve a WebSocket connection slot for `ip`.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let limit = self.config.max_websocket_connections;
        self.ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| match limit {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            })
            .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;

        let mut count = self.ip_connections.entry(ip).or_insert(0);
        if *count >= self.config.max_connections_per_ip {
            drop(count);
            self.ws_connections.fetch_sub(1, Ordering::SeqCst);
            self.ip_connections.remove_if(&ip, |_, c| *c == 0);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *count += 1;
        Ok(())
    }

    /// Return a slot reserved with [`AppState::try_acquire_connection`].
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1));

        if let Some(mut count) = self.ip_connections.get_mut(&ip) {
            *count = count.saturating_sub(1);
        }
        self.ip_connections.remove_if(&ip, |_, c| *c == 0);
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }

    /// Count a live session until the returned guard is dropped.
    pub fn session_started(&self) -> ActiveSession<'_> {
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        ActiveSession {
            counter: &self.active_sessions,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }
}

/// Guard returned by [`AppState::session_started`].
pub struct ActiveSession<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
