//! HTTP Handlers
//!
//! Thin adapters from HTTP to the game engine; all game rules live in
//! `engine::game`, handlers only translate types and map errors.

use crate::api::errors::ApiError;
use crate::api::middleware::RequestId;
use crate::api::models::*;
use crate::bank::{InMemoryBank, TokenBank};
use crate::engine::commitment::{verify_reveal, Seed};
use crate::engine::game::CrashGame;
use crate::engine::multiplier::crash_multiplier;
use crate::engine::round::RoundPhase;
use crate::metrics::EngineMetrics;
use crate::store::RoundStore;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use tracing::info;

const RECENT_ROUNDS_LIMIT: usize = 20;

/// Shared state handed to every handler.
pub struct AppState {
    pub game: Arc<CrashGame>,
    pub store: RoundStore,
    pub metrics: Arc<EngineMetrics>,
    pub node_id: String,
    pub network: String,
    /// Present only when the node runs the in-memory bank; enables the
    /// dev faucet and balance endpoints.
    pub faucet: Option<Arc<InMemoryBank>>,
}

fn parse_hex32(request_id: &str, field: &str, raw: &str) -> Result<[u8; 32], ApiError> {
    let bytes = hex::decode(raw).map_err(|_| {
        ApiError::bad_request(request_id.to_string(), format!("{field} must be hex"))
    })?;
    bytes.try_into().map_err(|_| {
        ApiError::bad_request(request_id.to_string(), format!("{field} must be 32 bytes"))
    })
}

fn parse_seed(request_id: &str, raw: &str) -> Result<Seed, ApiError> {
    parse_hex32(request_id, "seed", raw)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let phase = state
        .game
        .current_round()
        .map(|r| r.phase)
        .unwrap_or(RoundPhase::None);
    Json(StatusResponse {
        node_id: state.node_id.clone(),
        network: state.network.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        current_round_id: state.game.current_round_id(),
        phase,
        tick: state.game.now_tick(),
    })
}

pub async fn current_round(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<RoundInfoResponse>, ApiError> {
    let round_id = state.game.current_round_id();
    let info = state
        .game
        .round_info(round_id)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?
        .ok_or_else(|| ApiError::not_found(request_id, "no round committed yet"))?;
    Ok(Json(info.into()))
}

pub async fn round_info(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<u64>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<RoundInfoResponse>, ApiError> {
    let info = state
        .game
        .round_info(round_id)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?
        .ok_or_else(|| ApiError::not_found(request_id, format!("round {round_id} not found")))?;
    Ok(Json(info.into()))
}

pub async fn round_stats(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<u64>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<RoundStatsResponse>, ApiError> {
    let stats = state
        .game
        .round_stats(round_id)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?
        .ok_or_else(|| ApiError::not_found(request_id, format!("round {round_id} not found")))?;
    Ok(Json(RoundStatsResponse::new(round_id, stats)))
}

pub async fn round_players(
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<u64>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<PlayersResponse>, ApiError> {
    let players = state
        .game
        .round_players(round_id)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?
        .ok_or_else(|| ApiError::not_found(request_id, format!("round {round_id} not found")))?;
    Ok(Json(PlayersResponse { round_id, players }))
}

pub async fn get_bet(
    State(state): State<Arc<AppState>>,
    Path((round_id, player)): Path<(u64, String)>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<BetResponse>, ApiError> {
    let bet = state
        .game
        .bet(round_id, &player)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?
        .ok_or_else(|| {
            ApiError::not_found(request_id, format!("no bet for {player} in round {round_id}"))
        })?;
    Ok(Json(BetResponse::new(round_id, player, bet)))
}

pub async fn recent_rounds(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<RecentRoundsResponse>, ApiError> {
    let rounds = state
        .store
        .recent_rounds(RECENT_ROUNDS_LIMIT)
        .map_err(|e| ApiError::internal_error(request_id, e.to_string()))?;
    Ok(Json(RecentRoundsResponse {
        rounds: rounds.iter().map(RoundSummary::from).collect(),
    }))
}

pub async fn current_multiplier(State(state): State<Arc<AppState>>) -> Json<MultiplierResponse> {
    Json(MultiplierResponse {
        multiplier: state.game.current_multiplier(),
    })
}

pub async fn total_burned(State(state): State<Arc<AppState>>) -> Json<BurnedResponse> {
    Json(BurnedResponse {
        total_burned: state.game.total_burned(),
    })
}

pub async fn place_bet(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<PlaceBetRequest>,
) -> Result<Json<BetAcceptedResponse>, ApiError> {
    state
        .game
        .place_bet(&req.player, req.amount, req.auto_cashout)
        .map_err(|e| ApiError::from_game(request_id, e))?;
    info!(player = %req.player, amount = req.amount, "bet accepted");
    Ok(Json(BetAcceptedResponse {
        round_id: state.game.current_round_id(),
        player: req.player,
        amount: req.amount,
        auto_cashout: req.auto_cashout,
    }))
}

pub async fn cash_out(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<CashOutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .game
        .cash_out(&req.player)
        .map_err(|e| ApiError::from_game(request_id, e))?;
    info!(player = %req.player, multiplier = receipt.multiplier, payout = receipt.payout, "cashed out");
    Ok(Json(receipt))
}

pub async fn commit_round(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<CommitRoundRequest>,
) -> Result<Json<CommitRoundResponse>, ApiError> {
    let seed_hash = parse_hex32(&request_id, "seed_hash", &req.seed_hash)?;
    let round_id = state
        .game
        .commit_round(&req.operator, seed_hash)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?;
    let info = state
        .game
        .round_info(round_id)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?
        .ok_or_else(|| ApiError::internal_error(request_id, "committed round vanished"))?;
    Ok(Json(CommitRoundResponse {
        round_id,
        betting_end_tick: info.betting_end_tick,
    }))
}

pub async fn start_round(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<StartRoundResponse>, ApiError> {
    let round_id = state
        .game
        .start_round()
        .map_err(|e| ApiError::from_game(request_id, e))?;
    Ok(Json(StartRoundResponse { round_id }))
}

pub async fn settle(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<SettleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let seed = parse_seed(&request_id, &req.seed)?;
    let outcome = state
        .game
        .reveal_and_settle(&req.settler, seed)
        .map_err(|e| ApiError::from_game(request_id, e))?;
    info!(
        round_id = outcome.round_id,
        crash_multiplier = outcome.crash_multiplier,
        burned = outcome.burned,
        "round settled"
    );
    Ok(Json(outcome))
}

pub async fn refund(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refunded = state
        .game
        .emergency_refund(&req.caller)
        .map_err(|e| ApiError::from_game(request_id, e))?;
    Ok(Json(RefundResponse { refunded }))
}

/// Recompute a round's crash point from a revealed seed so anyone can
/// audit the outcome without trusting the node.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let seed = parse_seed(&request_id, &req.seed)?;
    let info = state
        .game
        .round_info(req.round_id)
        .map_err(|e| ApiError::from_game(request_id.clone(), e))?
        .ok_or_else(|| {
            ApiError::not_found(request_id, format!("round {} not found", req.round_id))
        })?;
    let seed_valid = verify_reveal(&info.seed_hash, &seed);
    let computed = crash_multiplier(&state.game.game_config(), &seed, req.round_id);
    let matches_round =
        seed_valid && info.phase == RoundPhase::Settled && info.crash_multiplier == computed;
    Ok(Json(VerifyResponse {
        round_id: req.round_id,
        seed_valid,
        computed_crash_multiplier: computed,
        matches_round,
    }))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<crate::config::GameConfig> {
    Json(state.game.game_config())
}

pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<UpdateConfigRequest>,
) -> Result<Json<crate::config::GameConfig>, ApiError> {
    let game = &state.game;
    let apply = |r: Result<(), crate::errors::GameError>| {
        r.map_err(|e| ApiError::from_game(request_id.clone(), e))
    };
    if let Some(v) = req.min_bet {
        apply(game.set_min_bet(&req.operator, v))?;
    }
    if let Some(v) = req.max_bet {
        apply(game.set_max_bet(&req.operator, v))?;
    }
    if let Some(v) = req.betting_duration {
        apply(game.set_betting_duration(&req.operator, v))?;
    }
    if let Some(v) = req.round_duration {
        apply(game.set_round_duration(&req.operator, v))?;
    }
    Ok(Json(game.game_config()))
}

pub async fn transfer_operator(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<TransferOperatorRequest>,
) -> Result<Json<OperatorResponse>, ApiError> {
    state
        .game
        .transfer_operator(&req.operator, &req.new_operator)
        .map_err(|e| ApiError::from_game(request_id, e))?;
    info!(operator = %req.new_operator, "operator transferred");
    Ok(Json(OperatorResponse {
        operator: req.new_operator,
    }))
}

pub async fn faucet(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(req): Json<FaucetRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let bank = state
        .faucet
        .as_ref()
        .ok_or_else(|| ApiError::not_found(request_id, "faucet not available on this node"))?;
    bank.deposit(&req.player, req.amount);
    Ok(Json(BalanceResponse {
        balance: bank.balance(&req.player),
        account: req.player,
    }))
}

pub async fn balance(
    State(state): State<Arc<AppState>>,
    Path(account): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let bank = state
        .faucet
        .as_ref()
        .ok_or_else(|| ApiError::not_found(request_id, "balances not available on this node"))?;
    Ok(Json(BalanceResponse {
        balance: bank.balance(&account),
        account,
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GameConfig;
    use crate::engine::commitment::hash_seed;
    use axum::http::StatusCode;
    use tempfile::TempDir;

    fn test_state() -> (Arc<AppState>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RoundStore::open(dir.path()).unwrap();
        let bank = Arc::new(InMemoryBank::new());
        let metrics = Arc::new(EngineMetrics::new().unwrap());
        let game = Arc::new(
            CrashGame::open(
                GameConfig::default(),
                "house",
                bank.clone(),
                Arc::new(ManualClock::new(0)),
                store.clone(),
                metrics.clone(),
            )
            .unwrap(),
        );
        let state = Arc::new(AppState {
            game,
            store,
            metrics,
            node_id: "test-node".to_string(),
            network: "testnet".to_string(),
            faucet: Some(bank),
        });
        (state, dir)
    }

    fn rid() -> Extension<RequestId> {
        Extension(RequestId("test".to_string()))
    }

    #[tokio::test]
    async fn test_commit_round_endpoint_opens_a_round() {
        let (state, _dir) = test_state();
        let seed_hash = hex::encode(hash_seed(&[7u8; 32]));

        let resp = commit_round(
            State(state.clone()),
            rid(),
            Json(CommitRoundRequest {
                operator: "house".to_string(),
                seed_hash,
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.0.round_id, 1);
        assert_eq!(state.game.current_round_id(), 1);
    }

    #[tokio::test]
    async fn test_commit_round_endpoint_rejects_strangers() {
        let (state, _dir) = test_state();
        let seed_hash = hex::encode(hash_seed(&[7u8; 32]));

        let err = commit_round(
            State(state),
            rid(),
            Json(CommitRoundRequest {
                operator: "mallory".to_string(),
                seed_hash,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.code, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_commit_round_endpoint_rejects_malformed_hash() {
        let (state, _dir) = test_state();
        let err = commit_round(
            State(state),
            rid(),
            Json(CommitRoundRequest {
                operator: "house".to_string(),
                seed_hash: "not-hex".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_config_endpoint_applies_limits() {
        let (state, _dir) = test_state();

        let resp = update_config(
            State(state.clone()),
            rid(),
            Json(UpdateConfigRequest {
                operator: "house".to_string(),
                min_bet: Some(500),
                max_bet: None,
                betting_duration: Some(45),
                round_duration: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.0.min_bet, 500);
        assert_eq!(resp.0.betting_duration, 45);
        assert_eq!(state.game.game_config().min_bet, 500);
    }

    #[tokio::test]
    async fn test_transfer_operator_endpoint_hands_over_commit_rights() {
        let (state, _dir) = test_state();

        transfer_operator(
            State(state.clone()),
            rid(),
            Json(TransferOperatorRequest {
                operator: "house".to_string(),
                new_operator: "house2".to_string(),
            }),
        )
        .await
        .unwrap();

        let seed_hash = hex::encode(hash_seed(&[7u8; 32]));
        let err = commit_round(
            State(state.clone()),
            rid(),
            Json(CommitRoundRequest {
                operator: "house".to_string(),
                seed_hash: seed_hash.clone(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        commit_round(
            State(state),
            rid(),
            Json(CommitRoundRequest {
                operator: "house2".to_string(),
                seed_hash,
            }),
        )
        .await
        .unwrap();
    }
}
