//! crashd - provably fair crash game engine
//!
//! A round-based wagering engine built on commit-reveal randomness: the
//! operator commits a hashed seed before betting opens, players stake
//! during a fixed window, the multiplier climbs until the pre-committed
//! crash point, and anyone can settle the round once the seed is
//! revealed. Forfeited stakes are burned.
//!
//! The crate splits into:
//! - [`engine`] - round state machine, bet ledger, crash derivation
//! - [`bank`] - token movement seam (in-memory ledger for the daemon)
//! - [`store`] - RocksDB round history and engine cursors
//! - [`croupier`] - background driver that commits, starts, and reveals
//! - [`api`] - HTTP + WebSocket surface

pub mod api;
pub mod bank;
pub mod clock;
pub mod config;
pub mod croupier;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod store;

pub use bank::{InMemoryBank, TokenBank, BURN_SINK, ESCROW_ACCOUNT};
pub use clock::{ManualClock, SystemClock, TickSource};
pub use config::{GameConfig, NodeConfig};
pub use engine::{CashoutReceipt, CrashGame, RoundInfo, RoundPhase, RoundStats, SettlementOutcome};
pub use errors::{GameError, GameResult};
pub use store::RoundStore;
