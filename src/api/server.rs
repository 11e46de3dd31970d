//! HTTP API Server
//!
//! Serves the game engine over HTTP + WebSocket with the standard
//! middleware stack: request IDs, CORS, timeouts, tracing.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::bank::InMemoryBank;
use crate::config::ServerConfig;
use crate::engine::game::CrashGame;
use crate::metrics::EngineMetrics;
use crate::store::RoundStore;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub node_id: String,
    pub network: String,
}

impl ApiServerConfig {
    pub fn from_server_config(server: &ServerConfig, node_id: String, network: String) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            allowed_origins: server.allowed_origins.clone(),
            request_timeout_secs: server.request_timeout_secs,
            node_id,
            network,
        }
    }
}

/// HTTP server wrapping a running game engine.
pub struct ApiServer {
    config: ApiServerConfig,
    game: Arc<CrashGame>,
    store: RoundStore,
    metrics: Arc<EngineMetrics>,
    faucet: Option<Arc<InMemoryBank>>,
}

impl ApiServer {
    pub fn new(
        config: ApiServerConfig,
        game: Arc<CrashGame>,
        store: RoundStore,
        metrics: Arc<EngineMetrics>,
        faucet: Option<Arc<InMemoryBank>>,
    ) -> Self {
        Self {
            config,
            game,
            store,
            metrics,
            faucet,
        }
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.socket_addr()?;
        let app = self.create_app();

        info!("🌐 API server listening on http://{}", addr);
        info!("   GET  /round/current    - Current round");
        info!("   POST /bet              - Place a bet");
        info!("   POST /cashout          - Cash out");
        info!("   GET  /ws               - Round event stream");

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("🛑 API server stopped gracefully");
        Ok(())
    }

    fn create_app(&self) -> axum::Router {
        let state = Arc::new(AppState {
            game: self.game.clone(),
            store: self.store.clone(),
            metrics: self.metrics.clone(),
            node_id: self.config.node_id.clone(),
            network: self.config.network.clone(),
            faucet: self.faucet.clone(),
        });

        create_router(state)
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer(self.config.allowed_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            // Tracing layer (last for complete request tracing)
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
