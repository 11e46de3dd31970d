//! Round and bet records.
//!
//! Rounds and bets form an append-only ledger: bets are created during
//! Betting, resolved at most once, and never deleted. Settled rounds are
//! immutable history.

use crate::engine::commitment::{Seed, SeedHash};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle phase governing which operations are legal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    /// No round exists (before the first commit).
    None,
    Betting,
    Active,
    Settled,
    /// Terminal refund variant reached through emergencyRefund.
    Refunded,
}

impl RoundPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Settled | RoundPhase::Refunded)
    }
}

/// One player's bet in one round. At most one per `(round, player)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bet {
    /// Stake, in token units. Always positive.
    pub amount: u64,
    /// Auto-cashout threshold (fixed-point); 0 disables auto-cashout.
    pub auto_cashout: u64,
    /// Multiplier the bet resolved at; 0 until resolved.
    pub cashed_out_at: u64,
    /// Set exactly once, by cashout, settlement or refund.
    pub settled: bool,
}

impl Bet {
    pub fn new(amount: u64, auto_cashout: u64) -> Self {
        Self {
            amount,
            auto_cashout,
            cashed_out_at: 0,
            settled: false,
        }
    }
}

/// One complete betting/play/settlement cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: u64,
    pub seed_hash: SeedHash,
    /// Preimage, present only after a verified reveal.
    pub revealed_seed: Option<Seed>,
    pub betting_end_tick: u64,
    /// Tick the Active phase began; 0 while Betting.
    pub start_tick: u64,
    /// Tick the live curve crossed the crash point; 0 until settled.
    pub crash_tick: u64,
    /// Fixed-point crash multiplier; 0 until settled.
    pub crash_multiplier: u64,
    pub total_staked: u64,
    pub total_paid_out: u64,
    pub phase: RoundPhase,
    /// Insertion order = first-bet order; no duplicates.
    pub players: Vec<String>,
    pub bets: HashMap<String, Bet>,
}

impl Round {
    pub fn commit(id: u64, seed_hash: SeedHash, betting_end_tick: u64) -> Self {
        Self {
            id,
            seed_hash,
            revealed_seed: None,
            betting_end_tick,
            start_tick: 0,
            crash_tick: 0,
            crash_multiplier: 0,
            total_staked: 0,
            total_paid_out: 0,
            phase: RoundPhase::Betting,
            players: Vec::new(),
            bets: HashMap::new(),
        }
    }

    pub fn bet(&self, player: &str) -> Option<&Bet> {
        self.bets.get(player)
    }

    /// Players in first-bet order.
    pub fn player_list(&self) -> &[String] {
        &self.players
    }
}
