//! HTTP server implementation using Axum.

use crate::handlers::{self, lifecycle, logs, servers};
use ark_core::ArkPanel;
use ark_installer::Installer;
use axum::{
    routing::{get, post},
    Router,
};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Registry, status, lifecycle, settings and logs
    pub panel: ArkPanel,
    /// SteamCMD-driven install/update/uninstall
    pub installer: Installer,
    /// Servers with an installer operation running
    in_flight: Mutex<HashSet<u32>>,
}

impl AppState {
    pub fn new(panel: ArkPanel, installer: Installer) -> Self {
        Self {
            panel,
            installer,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Claim server `id` for an installer operation. `None` when one is
    /// already running; the claim is released when the guard drops.
    pub fn try_begin(self: &Arc<Self>, id: u32) -> Option<InFlightGuard> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id) {
            return None;
        }
        Some(InFlightGuard {
            state: Arc::clone(self),
            id,
        })
    }

    pub fn is_busy(&self, id: u32) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }
}

pub struct InFlightGuard {
    state: Arc<AppState>,
    id: u32,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

/// Build the router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    // Configure CORS for the browser frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/api/servers", get(servers::list_servers))
        .route("/api/dashboard", get(servers::dashboard))
        .route("/api/server/:id", get(servers::server_status))
        .route(
            "/api/server/:id/config",
            get(servers::get_config).post(servers::save_config),
        )
        .route("/api/server/:id/install", post(lifecycle::install))
        .route("/api/server/:id/force_install", post(lifecycle::force_install))
        .route("/api/server/:id/update", post(lifecycle::update))
        .route("/api/server/:id/uninstall", post(lifecycle::uninstall))
        .route("/api/server/:id/start", post(lifecycle::start))
        .route("/api/server/:id/stop", post(lifecycle::stop))
        .route("/api/server/:id/logs", get(logs::server_logs))
        .route("/api/server/:id/install_logs", get(logs::install_logs))
        .route("/api/server/:id/update_logs", get(logs::update_logs))
        .route("/api/server/:id/specific_log", get(logs::specific_log))
        .route("/api/server/:id/log_files", get(logs::log_files))
        .route("/api/installation/logs", get(logs::installation_logs))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    panel: ArkPanel,
    installer: Installer,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState::new(panel, installer));
    let app = router(state);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    // Spawn the server in the background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
