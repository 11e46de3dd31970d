//! Round lifecycle and settlement engine.

pub mod commitment;
pub mod events;
pub mod game;
pub mod multiplier;
pub mod round;

pub use game::{CashoutReceipt, CrashGame, RoundInfo, RoundStats, SettlementOutcome};
pub use round::{Bet, Round, RoundPhase};
