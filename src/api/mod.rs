//! HTTP/WebSocket surface for the crash game.
//!
//! Read model (round state, bet state, stats, recent crashes), the
//! player/settler-facing mutations, a live event stream, and Prometheus
//! metrics. Wallet handling and rendering stay with the clients.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{ApiServer, ApiServerConfig};
