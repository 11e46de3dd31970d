//! API Request/Response Models
//!
//! Binary fields (seed hashes, seeds) travel hex-encoded.

use crate::engine::game::{RoundInfo, RoundStats};
use crate::engine::round::{Bet, Round, RoundPhase};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Node status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub node_id: String,
    pub network: String,
    pub version: String,
    pub current_round_id: u64,
    pub phase: RoundPhase,
    pub tick: u64,
}

/// Round metadata, the `getRoundInfo` read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundInfoResponse {
    pub round_id: u64,
    pub seed_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_seed: Option<String>,
    pub betting_end_tick: u64,
    pub start_tick: u64,
    pub crash_multiplier: u64,
    pub phase: RoundPhase,
}

impl From<RoundInfo> for RoundInfoResponse {
    fn from(info: RoundInfo) -> Self {
        Self {
            round_id: info.round_id,
            seed_hash: hex::encode(info.seed_hash),
            revealed_seed: info.revealed_seed.map(hex::encode),
            betting_end_tick: info.betting_end_tick,
            start_tick: info.start_tick,
            crash_multiplier: info.crash_multiplier,
            phase: info.phase,
        }
    }
}

/// Aggregate money flow, the `getRoundStats` read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundStatsResponse {
    pub round_id: u64,
    pub total_staked: u64,
    pub total_paid_out: u64,
    pub player_count: u64,
}

impl RoundStatsResponse {
    pub fn new(round_id: u64, stats: RoundStats) -> Self {
        Self {
            round_id,
            total_staked: stats.total_staked,
            total_paid_out: stats.total_paid_out,
            player_count: stats.player_count,
        }
    }
}

/// One bet, the `getBet` read model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetResponse {
    pub round_id: u64,
    pub player: String,
    pub amount: u64,
    pub auto_cashout: u64,
    pub cashed_out_at: u64,
    pub settled: bool,
}

impl BetResponse {
    pub fn new(round_id: u64, player: String, bet: Bet) -> Self {
        Self {
            round_id,
            player,
            amount: bet.amount,
            auto_cashout: bet.auto_cashout,
            cashed_out_at: bet.cashed_out_at,
            settled: bet.settled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayersResponse {
    pub round_id: u64,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplierResponse {
    pub multiplier: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnedResponse {
    pub total_burned: u64,
}

/// Entry in the recent-crashes feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_id: u64,
    pub phase: RoundPhase,
    pub crash_multiplier: u64,
    pub total_staked: u64,
    pub total_paid_out: u64,
    pub player_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_seed: Option<String>,
}

impl From<&Round> for RoundSummary {
    fn from(round: &Round) -> Self {
        Self {
            round_id: round.id,
            phase: round.phase,
            crash_multiplier: round.crash_multiplier,
            total_staked: round.total_staked,
            total_paid_out: round.total_paid_out,
            player_count: round.players.len() as u64,
            revealed_seed: round.revealed_seed.map(hex::encode),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentRoundsResponse {
    pub rounds: Vec<RoundSummary>,
}

// ---- mutation requests --------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub player: String,
    pub amount: u64,
    /// Fixed-point threshold; 0 disables auto-cashout.
    #[serde(default)]
    pub auto_cashout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetAcceptedResponse {
    pub round_id: u64,
    pub player: String,
    pub amount: u64,
    pub auto_cashout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashOutRequest {
    pub player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRoundResponse {
    pub round_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleRequest {
    /// Account credited with the settler reward.
    pub settler: String,
    /// Hex-encoded 32-byte seed preimage.
    pub seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub caller: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub refunded: u64,
}

/// Dev faucet; backs demo deployments of the in-memory bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetRequest {
    pub player: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: String,
    pub balance: u64,
}

// ---- operator surface ----------------------------------------------------
//
// These drive a node whose built-in croupier is disabled, and carry the
// caller identity in the body; the engine rejects non-operators.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRoundRequest {
    pub operator: String,
    /// Hex-encoded 32-byte seed commitment hash.
    pub seed_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRoundResponse {
    pub round_id: u64,
    pub betting_end_tick: u64,
}

/// Limit changes; absent fields keep their current values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfigRequest {
    pub operator: String,
    #[serde(default)]
    pub min_bet: Option<u64>,
    #[serde(default)]
    pub max_bet: Option<u64>,
    #[serde(default)]
    pub betting_duration: Option<u64>,
    #[serde(default)]
    pub round_duration: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOperatorRequest {
    pub operator: String,
    pub new_operator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorResponse {
    pub operator: String,
}

// ---- fairness verification ----------------------------------------------

/// Recompute a settled round's crash point from a seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub round_id: u64,
    /// Hex-encoded 32-byte seed preimage.
    pub seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub round_id: u64,
    /// Seed hashes to the round's commitment.
    pub seed_valid: bool,
    /// Crash point recomputed from the supplied seed.
    pub computed_crash_multiplier: u64,
    /// Recomputation agrees with the settled round.
    pub matches_round: bool,
}
