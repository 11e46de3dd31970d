//! Engine events for external observers.
//!
//! Collaborators (round feeds, the WebSocket stream, indexers) subscribe
//! here instead of polling internal state. Publishing never blocks the
//! settlement path; slow subscribers lag on their own broadcast channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Everything the engine announces, mirroring the on-wire event surface.
/// Hashes and seeds are hex-encoded for observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    RoundCommitted {
        round_id: u64,
        seed_hash: String,
        betting_end_tick: u64,
    },
    RoundStarted {
        round_id: u64,
        start_tick: u64,
    },
    BetPlaced {
        round_id: u64,
        player: String,
        amount: u64,
        auto_cashout: u64,
    },
    CashedOut {
        round_id: u64,
        player: String,
        multiplier: u64,
        payout: u64,
    },
    RoundCrashed {
        round_id: u64,
        crash_multiplier: u64,
        seed: String,
    },
    RoundSettled {
        round_id: u64,
        burned: u64,
        settler: String,
        settler_reward: u64,
    },
}

/// Broadcast fan-out for [`GameEvent`].
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. A send with no subscribers is
    /// not an error; the engine does not care who is listening.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1_024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(GameEvent::RoundStarted {
            round_id: 3,
            start_tick: 99,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            GameEvent::RoundStarted {
                round_id: 3,
                start_tick: 99,
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new(16);
        bus.publish(GameEvent::RoundStarted {
            round_id: 1,
            start_tick: 0,
        });
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = GameEvent::CashedOut {
            round_id: 2,
            player: "alice".to_string(),
            multiplier: 250,
            payout: 2_500,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cashed_out");
        assert_eq!(json["payout"], 2_500);
    }
}
