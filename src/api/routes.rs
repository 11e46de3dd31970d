//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::{handlers::*, websocket::websocket_handler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        .route("/status", get(status))
        // Round reads
        .route("/round/current", get(current_round))
        .route("/round/:round_id", get(round_info))
        .route("/round/:round_id/stats", get(round_stats))
        .route("/round/:round_id/players", get(round_players))
        .route("/round/:round_id/bet/:player", get(get_bet))
        .route("/rounds/recent", get(recent_rounds))
        .route("/multiplier", get(current_multiplier))
        .route("/burned", get(total_burned))
        // Game actions
        .route("/bet", post(place_bet))
        .route("/cashout", post(cash_out))
        .route("/round/start", post(start_round))
        .route("/round/settle", post(settle))
        .route("/round/refund", post(refund))
        // Operator surface (croupier-less nodes drive rounds through these)
        .route("/round/commit", post(commit_round))
        .route("/config", get(get_config).post(update_config))
        .route("/operator", post(transfer_operator))
        // Fairness audit
        .route("/verify", post(verify))
        // Dev bank (in-memory bank only)
        .route("/faucet", post(faucet))
        .route("/balance/:account", get(balance))
        // WebSocket for real-time round events
        .route("/ws", get(websocket_handler))
        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics))
        // Attach shared state
        .with_state(state)
}
