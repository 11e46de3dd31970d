//! The crash game engine.
//!
//! All mutating operations serialize on one state lock and apply their
//! effects all-or-nothing. Inbound value (the stake debit) is the only
//! fallible step of `place_bet` and runs before any ledger mutation.
//! Outbound value is gated instead: every payout path plans its outflows
//! read-only, verifies escrow covers them while still holding the state
//! lock, and only then resolves bets and transfers. Escrow debits never
//! happen outside the lock, so a passed coverage check cannot be
//! invalidated and a resolved bet is always paid. Payouts still run
//! strictly after ledger mutation so a reentrant transfer can never
//! re-trigger one. Concurrent callers racing
//! `start_round`/`reveal_and_settle` resolve to exactly one winner; the
//! losers get a typed phase error, logged at debug.

use crate::bank::{BankError, TokenBank, BURN_SINK, ESCROW_ACCOUNT};
use crate::clock::TickSource;
use crate::config::{GameConfig, BPS_DENOMINATOR};
use crate::engine::commitment::{self, Seed, SeedHash};
use crate::engine::events::{EventBus, GameEvent};
use crate::engine::multiplier;
use crate::engine::round::{Bet, Round, RoundPhase};
use crate::errors::{GameError, GameResult};
use crate::metrics::EngineMetrics;
use crate::store::RoundStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Read-model view of a round's public metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundInfo {
    pub round_id: u64,
    pub seed_hash: SeedHash,
    pub revealed_seed: Option<Seed>,
    pub betting_end_tick: u64,
    pub start_tick: u64,
    pub crash_multiplier: u64,
    pub phase: RoundPhase,
}

/// Read-model view of a round's aggregate money flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoundStats {
    pub total_staked: u64,
    pub total_paid_out: u64,
    pub player_count: u64,
}

/// Receipt for a successful manual cashout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashoutReceipt {
    pub round_id: u64,
    pub multiplier: u64,
    pub payout: u64,
}

/// Result of a successful `reveal_and_settle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub round_id: u64,
    pub crash_multiplier: u64,
    pub auto_cashout_wins: usize,
    pub burned: u64,
    pub settler_reward: u64,
}

fn round_view(round: &Round) -> RoundInfo {
    RoundInfo {
        round_id: round.id,
        seed_hash: round.seed_hash,
        revealed_seed: round.revealed_seed,
        betting_end_tick: round.betting_end_tick,
        start_tick: round.start_tick,
        crash_multiplier: round.crash_multiplier,
        phase: round.phase,
    }
}

fn round_stats(round: &Round) -> RoundStats {
    RoundStats {
        total_staked: round.total_staked,
        total_paid_out: round.total_paid_out,
        player_count: round.players.len() as u64,
    }
}

struct EngineState {
    current: Option<Round>,
    next_round_id: u64,
}

/// Round lifecycle, bet ledger and settlement accountant in one place.
///
/// The "current" round is the single owned value this struct swaps; prior
/// rounds are immutable history in the [`RoundStore`].
pub struct CrashGame {
    operator: RwLock<String>,
    config: RwLock<GameConfig>,
    state: Mutex<EngineState>,
    store: RoundStore,
    bank: Arc<dyn TokenBank>,
    clock: Arc<dyn TickSource>,
    events: EventBus,
    metrics: Arc<EngineMetrics>,
    total_burned: AtomicU64,
}

impl CrashGame {
    /// Open the engine over a (possibly pre-existing) round store.
    pub fn open(
        config: GameConfig,
        operator: impl Into<String>,
        bank: Arc<dyn TokenBank>,
        clock: Arc<dyn TickSource>,
        store: RoundStore,
        metrics: Arc<EngineMetrics>,
    ) -> GameResult<Self> {
        let next_round_id = store.next_round_id()?;
        let total_burned = store.total_burned()?;

        Ok(Self {
            operator: RwLock::new(operator.into()),
            config: RwLock::new(config),
            state: Mutex::new(EngineState {
                current: None,
                next_round_id,
            }),
            store,
            bank,
            clock,
            events: EventBus::default(),
            metrics,
            total_burned: AtomicU64::new(total_burned),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn operator(&self) -> String {
        self.operator.read().expect("operator lock poisoned").clone()
    }

    pub fn now_tick(&self) -> u64 {
        self.clock.now_tick()
    }

    pub fn game_config(&self) -> GameConfig {
        self.config.read().expect("config lock poisoned").clone()
    }

    fn ensure_operator(&self, caller: &str) -> GameResult<()> {
        let operator = self.operator.read().expect("operator lock poisoned");
        if caller != *operator {
            return Err(GameError::Unauthorized(caller.to_string()));
        }
        Ok(())
    }

    /// Escrow debits all run under the state lock, so a coverage check
    /// made while holding it cannot be invalidated before the transfer.
    fn ensure_escrow_covers(&self, needed: u64) -> GameResult<()> {
        let available = self.bank.balance(ESCROW_ACCOUNT);
        if available < needed {
            return Err(GameError::Bank(BankError::InsufficientFunds {
                account: ESCROW_ACCOUNT.to_string(),
                needed,
                available,
            }));
        }
        Ok(())
    }

    // ---- mutating operations -------------------------------------------

    /// Open a new round under a seed commitment. Operator-only: the
    /// committer is whoever holds the secret.
    pub fn commit_round(&self, caller: &str, seed_hash: SeedHash) -> GameResult<u64> {
        self.ensure_operator(caller)?;

        let betting_duration = self.config.read().expect("config lock poisoned").betting_duration;
        let mut state = self.state.lock().expect("state lock poisoned");

        if let Some(round) = &state.current {
            if !round.phase.is_terminal() {
                return Err(GameError::RoundAlreadyOpen);
            }
        }

        let round_id = state.next_round_id;
        let now = self.clock.now_tick();
        let betting_end_tick = now + betting_duration;

        // Persist the cursor first so a failed write changes nothing.
        self.store.set_next_round_id(round_id + 1)?;
        state.current = Some(Round::commit(round_id, seed_hash, betting_end_tick));
        state.next_round_id = round_id + 1;

        self.metrics.rounds_committed.inc();
        self.metrics.current_round_id.set(round_id as i64);
        info!(round_id, betting_end_tick, "round committed");

        self.events.publish(GameEvent::RoundCommitted {
            round_id,
            seed_hash: hex::encode(seed_hash),
            betting_end_tick,
        });

        Ok(round_id)
    }

    /// Move the round from Betting to Active once the window is over.
    /// Permissionless; under a race exactly one caller succeeds.
    pub fn start_round(&self) -> GameResult<u64> {
        let mut state = self.state.lock().expect("state lock poisoned");
        let round = state.current.as_mut().ok_or(GameError::WrongPhase)?;

        if round.phase != RoundPhase::Betting {
            return Err(GameError::WrongPhase);
        }
        let now = self.clock.now_tick();
        if now < round.betting_end_tick {
            return Err(GameError::BettingNotOver);
        }

        round.start_tick = now;
        round.phase = RoundPhase::Active;
        let round_id = round.id;

        info!(round_id, start_tick = now, "round started");
        self.events.publish(GameEvent::RoundStarted {
            round_id,
            start_tick: now,
        });

        Ok(round_id)
    }

    /// Place a bet for the current round. The stake is debited into escrow
    /// before the ledger records anything, so a failed debit changes nothing.
    pub fn place_bet(&self, player: &str, amount: u64, auto_cashout: u64) -> GameResult<()> {
        let config = self.config.read().expect("config lock poisoned").clone();
        let mut state = self.state.lock().expect("state lock poisoned");
        let round = state.current.as_mut().ok_or(GameError::WrongPhase)?;

        if round.phase != RoundPhase::Betting {
            return Err(GameError::WrongPhase);
        }
        if self.clock.now_tick() >= round.betting_end_tick {
            return Err(GameError::BettingOver);
        }
        if amount < config.min_bet || amount > config.max_bet {
            return Err(GameError::InvalidBet);
        }
        if auto_cashout != 0 && auto_cashout < config.min_cashout {
            return Err(GameError::InvalidBet);
        }
        if round.bets.contains_key(player) {
            return Err(GameError::AlreadyBet);
        }

        // Only fallible step; everything after is pure bookkeeping.
        self.bank.transfer(player, ESCROW_ACCOUNT, amount)?;

        round.bets.insert(player.to_string(), Bet::new(amount, auto_cashout));
        round.players.push(player.to_string());
        round.total_staked += amount;
        let round_id = round.id;

        self.metrics.bets_placed.inc();
        self.metrics.staked_units.inc_by(amount);
        debug!(round_id, player, amount, auto_cashout, "bet placed");

        self.events.publish(GameEvent::BetPlaced {
            round_id,
            player: player.to_string(),
            amount,
            auto_cashout,
        });

        Ok(())
    }

    /// Cash out at the live multiplier. Safe before the crash point is
    /// known: the live curve is deterministic and monotone in the tick, so
    /// any cashout strictly before the still-secret crash tick stays valid
    /// once the seed is revealed.
    pub fn cash_out(&self, player: &str) -> GameResult<CashoutReceipt> {
        let config = self.config.read().expect("config lock poisoned").clone();
        let mut state = self.state.lock().expect("state lock poisoned");
        let round = state.current.as_mut().ok_or(GameError::WrongPhase)?;

        if round.phase != RoundPhase::Active {
            return Err(GameError::WrongPhase);
        }

        let elapsed = self.clock.now_tick().saturating_sub(round.start_tick);
        let current = multiplier::live_multiplier(&config, elapsed);

        let bet = round.bets.get_mut(player).ok_or(GameError::NoBet)?;
        if bet.settled || bet.cashed_out_at != 0 {
            return Err(GameError::AlreadyCashedOut);
        }
        if current < config.min_cashout {
            return Err(GameError::MultiplierTooLow);
        }

        let payout = multiplier::payout(&config, bet.amount, current);

        // Escrow coverage is checked under the state lock, which
        // serializes every escrow debit: once it passes, the credit
        // cannot fail and the bet may safely resolve. Without the check
        // a failed credit would strand a bet marked settled.
        self.ensure_escrow_covers(payout)?;

        bet.cashed_out_at = current;
        bet.settled = true;
        round.total_paid_out += payout;
        let round_id = round.id;

        self.bank.transfer(ESCROW_ACCOUNT, player, payout)?;

        self.metrics.cashouts.inc();
        self.metrics.paid_out_units.inc_by(payout);
        info!(round_id, player, multiplier = current, payout, "cashed out");

        self.events.publish(GameEvent::CashedOut {
            round_id,
            player: player.to_string(),
            multiplier: current,
            payout,
        });

        Ok(CashoutReceipt {
            round_id,
            multiplier: current,
            payout,
        })
    }

    /// Verify the revealed seed, derive the crash point and settle every
    /// outstanding bet exactly once. Permissionless: the caller earns
    /// `settle_reward_bps` of the forfeited stakes.
    pub fn reveal_and_settle(&self, caller: &str, seed: Seed) -> GameResult<SettlementOutcome> {
        let config = self.config.read().expect("config lock poisoned").clone();
        let mut state = self.state.lock().expect("state lock poisoned");
        let round = state.current.as_mut().ok_or(GameError::WrongPhase)?;

        if round.phase != RoundPhase::Active {
            return Err(GameError::WrongPhase);
        }
        let now = self.clock.now_tick();
        if now < round.start_tick + config.round_duration {
            return Err(GameError::GameNotOver);
        }
        if !commitment::verify_reveal(&round.seed_hash, &seed) {
            return Err(GameError::InvalidSeed);
        }

        let round_id = round.id;
        let crash = multiplier::crash_multiplier(&config, &seed, round_id);

        // Plan the settlement read-only first. Every outflow is known
        // before anything mutates, so escrow coverage gates the whole
        // operation: either the full settlement happens or nothing does.
        let mut wins: Vec<(String, u64, u64)> = Vec::new();
        let mut forfeited: u64 = 0;
        for player in round.players.iter() {
            let bet = round.bets.get(player).expect("players and bets stay in sync");
            if bet.settled {
                continue;
            }
            if bet.auto_cashout != 0 && bet.auto_cashout <= crash {
                let payout = multiplier::payout(&config, bet.amount, bet.auto_cashout);
                wins.push((player.clone(), bet.auto_cashout, payout));
            } else {
                forfeited += bet.amount;
            }
        }

        let settler_reward =
            (forfeited as u128 * config.settle_reward_bps as u128 / BPS_DENOMINATOR as u128) as u64;
        let burned = forfeited - settler_reward;
        let winners_total: u64 = wins.iter().map(|(_, _, p)| *p).sum();
        self.ensure_escrow_covers(winners_total + forfeited)?;

        // All preconditions hold; from here the settlement is total.
        round.revealed_seed = Some(seed);
        round.crash_multiplier = crash;
        round.crash_tick = round.start_tick + multiplier::ticks_to_reach(&config, crash);

        let Round {
            bets,
            total_paid_out,
            ..
        } = &mut *round;
        for (player, cashed_out_at, payout) in &wins {
            let bet = bets.get_mut(player).expect("players and bets stay in sync");
            bet.cashed_out_at = *cashed_out_at;
            bet.settled = true;
            *total_paid_out += *payout;
        }
        // Everything still unsettled is a forfeit.
        for bet in bets.values_mut() {
            bet.settled = true;
        }

        round.phase = RoundPhase::Settled;
        let total_burned = self.total_burned.fetch_add(burned, Ordering::SeqCst) + burned;

        // Persist before moving value; a failed write is logged, not
        // allowed to wedge an already-correct settlement.
        if let Err(e) = self.store.put_round(round) {
            warn!(round_id, error = %e, "failed to persist settled round");
        }
        if let Err(e) = self.store.set_total_burned(total_burned) {
            warn!(round_id, error = %e, "failed to persist burn total");
        }

        for (player, _, payout) in &wins {
            self.bank.transfer(ESCROW_ACCOUNT, player, *payout)?;
        }
        self.bank.transfer(ESCROW_ACCOUNT, caller, settler_reward)?;
        self.bank.transfer(ESCROW_ACCOUNT, BURN_SINK, burned)?;

        self.metrics.rounds_settled.inc();
        self.metrics.burned_units.inc_by(burned);
        self.metrics.paid_out_units.inc_by(winners_total);
        info!(
            round_id,
            crash_multiplier = crash,
            burned,
            settler = caller,
            settler_reward,
            "round settled"
        );

        self.events.publish(GameEvent::RoundCrashed {
            round_id,
            crash_multiplier: crash,
            seed: hex::encode(seed),
        });
        for (player, multiplier, payout) in &wins {
            self.events.publish(GameEvent::CashedOut {
                round_id,
                player: player.clone(),
                multiplier: *multiplier,
                payout: *payout,
            });
        }
        self.events.publish(GameEvent::RoundSettled {
            round_id,
            burned,
            settler: caller.to_string(),
            settler_reward,
        });

        Ok(SettlementOutcome {
            round_id,
            crash_multiplier: crash,
            auto_cashout_wins: wins.len(),
            burned,
            settler_reward,
        })
    }

    /// Fail-safe against a committer who never reveals: once the round has
    /// stalled past the reveal deadline plus grace, anyone may return every
    /// unresolved stake in full. No burn, no settler reward.
    pub fn emergency_refund(&self, caller: &str) -> GameResult<u64> {
        let config = self.config.read().expect("config lock poisoned").clone();
        let mut state = self.state.lock().expect("state lock poisoned");
        let round = state.current.as_mut().ok_or(GameError::WrongPhase)?;

        let deadline = match round.phase {
            RoundPhase::Betting => {
                round.betting_end_tick + config.round_duration + config.refund_grace_ticks
            }
            RoundPhase::Active => {
                round.start_tick + config.round_duration + config.refund_grace_ticks
            }
            _ => return Err(GameError::WrongPhase),
        };
        if self.clock.now_tick() < deadline {
            return Err(GameError::RoundNotCrashed);
        }

        let round_id = round.id;

        // Unsettled stakes sit in escrow by construction, but the refund
        // goes through the same plan-check-apply shape as settlement.
        let mut refunds: Vec<(String, u64)> = Vec::new();
        for player in round.players.iter() {
            let bet = round.bets.get(player).expect("players and bets stay in sync");
            if !bet.settled {
                refunds.push((player.clone(), bet.amount));
            }
        }
        self.ensure_escrow_covers(refunds.iter().map(|(_, a)| *a).sum())?;

        let Round {
            bets,
            total_paid_out,
            ..
        } = &mut *round;
        for (player, amount) in &refunds {
            let bet = bets.get_mut(player).expect("players and bets stay in sync");
            // A refund is a cashout at exactly 1.00x.
            bet.cashed_out_at = config.multiplier_precision;
            bet.settled = true;
            *total_paid_out += amount;
        }

        round.phase = RoundPhase::Refunded;
        if let Err(e) = self.store.put_round(round) {
            warn!(round_id, error = %e, "failed to persist refunded round");
        }

        let mut refunded_total = 0;
        for (player, amount) in &refunds {
            self.bank.transfer(ESCROW_ACCOUNT, player, *amount)?;
            refunded_total += amount;
        }

        self.metrics.rounds_refunded.inc();
        self.metrics.paid_out_units.inc_by(refunded_total);
        warn!(round_id, refunded_total, "round emergency-refunded");

        self.events.publish(GameEvent::RoundSettled {
            round_id,
            burned: 0,
            settler: caller.to_string(),
            settler_reward: 0,
        });

        Ok(refunded_total)
    }

    // ---- operator config setters ---------------------------------------

    pub fn set_min_bet(&self, caller: &str, min_bet: u64) -> GameResult<()> {
        self.update_config(caller, |config| config.min_bet = min_bet)
    }

    pub fn set_max_bet(&self, caller: &str, max_bet: u64) -> GameResult<()> {
        self.update_config(caller, |config| config.max_bet = max_bet)
    }

    pub fn set_betting_duration(&self, caller: &str, ticks: u64) -> GameResult<()> {
        self.update_config(caller, |config| config.betting_duration = ticks)
    }

    pub fn set_round_duration(&self, caller: &str, ticks: u64) -> GameResult<()> {
        self.update_config(caller, |config| config.round_duration = ticks)
    }

    /// Hand the operator role over. The old operator loses commit and
    /// config rights immediately; any seeds it still holds can of course
    /// still be revealed, since reveal is permissionless.
    pub fn transfer_operator(&self, caller: &str, new_operator: &str) -> GameResult<()> {
        self.ensure_operator(caller)?;
        if new_operator.is_empty() {
            return Err(GameError::InvalidConfig(
                "operator must not be empty".to_string(),
            ));
        }

        let mut operator = self.operator.write().expect("operator lock poisoned");
        info!(old = %*operator, new = new_operator, "operator transferred");
        *operator = new_operator.to_string();
        Ok(())
    }

    fn update_config(&self, caller: &str, apply: impl FnOnce(&mut GameConfig)) -> GameResult<()> {
        self.ensure_operator(caller)?;

        let mut config = self.config.write().expect("config lock poisoned");
        let mut candidate = config.clone();
        apply(&mut candidate);
        candidate
            .validate()
            .map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        *config = candidate;
        Ok(())
    }

    // ---- queries --------------------------------------------------------

    /// Id of the most recently committed round; 0 before the first commit.
    pub fn current_round_id(&self) -> u64 {
        self.state.lock().expect("state lock poisoned").next_round_id - 1
    }

    /// Snapshot of the current round, if any.
    pub fn current_round(&self) -> Option<Round> {
        self.state
            .lock()
            .expect("state lock poisoned")
            .current
            .clone()
    }

    pub fn round_info(&self, round_id: u64) -> GameResult<Option<RoundInfo>> {
        self.lookup_round(round_id, round_view)
    }

    pub fn round_stats(&self, round_id: u64) -> GameResult<Option<RoundStats>> {
        self.lookup_round(round_id, round_stats)
    }

    pub fn round_players(&self, round_id: u64) -> GameResult<Option<Vec<String>>> {
        self.lookup_round(round_id, |round| round.players.clone())
    }

    pub fn bet(&self, round_id: u64, player: &str) -> GameResult<Option<Bet>> {
        Ok(self
            .lookup_round(round_id, |round| round.bets.get(player).cloned())?
            .flatten())
    }

    /// Live multiplier of the active round; 0 in every other phase.
    pub fn current_multiplier(&self) -> u64 {
        let state = self.state.lock().expect("state lock poisoned");
        match &state.current {
            Some(round) if round.phase == RoundPhase::Active => {
                let config = self.config.read().expect("config lock poisoned");
                let elapsed = self.clock.now_tick().saturating_sub(round.start_tick);
                multiplier::live_multiplier(&config, elapsed)
            }
            _ => 0,
        }
    }

    /// Process-wide burned total across all settled rounds.
    pub fn total_burned(&self) -> u64 {
        self.total_burned.load(Ordering::SeqCst)
    }

    fn lookup_round<T>(&self, round_id: u64, view: impl Fn(&Round) -> T) -> GameResult<Option<T>> {
        {
            let state = self.state.lock().expect("state lock poisoned");
            if let Some(round) = &state.current {
                if round.id == round_id {
                    return Ok(Some(view(round)));
                }
            }
        }
        Ok(self.store.get_round(round_id)?.as_ref().map(view))
    }
}
