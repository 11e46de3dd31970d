//! Background round driver.
//!
//! The croupier is the off-chain operator role: it draws a secret seed,
//! commits its hash before betting opens, starts the round when the window
//! closes, and reveals the preimage once the round has run its course.
//! Runs as a detached tokio task polling off the engine's own clock, so a
//! competing external settler racing it is harmless: one of them wins the
//! phase guard and the other logs a debug line.

use crate::config::CroupierConfig;
use crate::engine::commitment::{self, Seed};
use crate::engine::round::RoundPhase;
use crate::engine::CrashGame;
use crate::errors::GameError;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Secret seed held for one round, keyed by round id so a restartless
/// reconfiguration can never reveal the wrong preimage.
struct PendingSeed {
    round_id: u64,
    seed: Seed,
}

pub struct Croupier {
    game: Arc<CrashGame>,
    config: CroupierConfig,
    pending: Mutex<Option<PendingSeed>>,
    running: Arc<AtomicBool>,
}

impl Croupier {
    pub fn new(game: Arc<CrashGame>, config: CroupierConfig) -> Arc<Self> {
        Arc::new(Self {
            game,
            config,
            pending: Mutex::new(None),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn spawn(game: Arc<CrashGame>, config: CroupierConfig) -> Arc<Self> {
        let croupier = Self::new(game, config);

        let worker = croupier.clone();
        tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_millis(worker.config.poll_interval_ms));
            info!(operator = %worker.config.operator_id, "croupier running");

            while worker.running.load(Ordering::SeqCst) {
                tick.tick().await;
                worker.step();
            }
        });

        croupier
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// One poll: look at the current round and push it forward if due.
    fn step(&self) {
        let config = self.game.game_config();
        let now = self.game.now_tick();

        match self.game.current_round() {
            None => self.commit_fresh_round(),
            Some(round) => match round.phase {
                RoundPhase::Betting if now >= round.betting_end_tick => {
                    if let Err(e) = self.game.start_round() {
                        log_drive_error("start_round", &e);
                    }
                }
                RoundPhase::Active if now >= round.start_tick + config.round_duration => {
                    self.reveal(round.id);
                }
                RoundPhase::Settled | RoundPhase::Refunded => self.commit_fresh_round(),
                _ => {}
            },
        }
    }

    fn commit_fresh_round(&self) {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let seed_hash = commitment::hash_seed(&seed);

        match self.game.commit_round(&self.config.operator_id, seed_hash) {
            Ok(round_id) => {
                *self.pending.lock().expect("pending lock poisoned") =
                    Some(PendingSeed { round_id, seed });
                debug!(round_id, "croupier committed next round");
            }
            Err(e) => log_drive_error("commit_round", &e),
        }
    }

    fn reveal(&self, round_id: u64) {
        let seed = {
            let pending = self.pending.lock().expect("pending lock poisoned");
            match pending.as_ref() {
                Some(p) if p.round_id == round_id => p.seed,
                _ => {
                    // Seed lost (restart mid-round). The public
                    // emergencyRefund path is the recovery mechanism.
                    warn!(round_id, "no seed held for active round; cannot reveal");
                    return;
                }
            }
        };

        match self.game.reveal_and_settle(&self.config.operator_id, seed) {
            Ok(outcome) => {
                self.pending.lock().expect("pending lock poisoned").take();
                info!(
                    round_id,
                    crash_multiplier = outcome.crash_multiplier,
                    burned = outcome.burned,
                    "croupier settled round"
                );
            }
            Err(e) => log_drive_error("reveal_and_settle", &e),
        }
    }
}

fn log_drive_error(operation: &str, error: &GameError) {
    if error.is_expected_race() {
        debug!(operation, %error, "lost a drive race");
    } else {
        warn!(operation, %error, "drive step failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::InMemoryBank;
    use crate::clock::ManualClock;
    use crate::config::GameConfig;
    use crate::metrics::EngineMetrics;
    use crate::store::RoundStore;
    use tempfile::TempDir;

    fn test_game(clock: Arc<ManualClock>) -> (Arc<CrashGame>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RoundStore::open(dir.path()).unwrap();
        let game = CrashGame::open(
            GameConfig::default(),
            "croupier",
            Arc::new(InMemoryBank::new()),
            clock,
            store,
            Arc::new(EngineMetrics::new().unwrap()),
        )
        .unwrap();
        (Arc::new(game), dir)
    }

    #[tokio::test]
    async fn test_croupier_drives_a_full_round() {
        let clock = Arc::new(ManualClock::new(1_000));
        let (game, _dir) = test_game(clock.clone());
        let croupier = Croupier::new(game.clone(), CroupierConfig::default());
        let config = game.game_config();

        // Commit.
        croupier.step();
        let round = game.current_round().unwrap();
        assert_eq!(round.phase, RoundPhase::Betting);

        // Window still open: step is a no-op.
        croupier.step();
        assert_eq!(game.current_round().unwrap().phase, RoundPhase::Betting);

        // Start.
        clock.advance(config.betting_duration);
        croupier.step();
        assert_eq!(game.current_round().unwrap().phase, RoundPhase::Active);

        // Reveal and settle.
        clock.advance(config.round_duration);
        croupier.step();
        let settled = game.current_round().unwrap();
        assert_eq!(settled.phase, RoundPhase::Settled);
        assert!(settled.crash_multiplier >= config.min_cashout);
        assert!(settled.revealed_seed.is_some());

        // And immediately opens the next round.
        croupier.step();
        assert_eq!(game.current_round().unwrap().id, settled.id + 1);

        croupier.stop();
    }
}
