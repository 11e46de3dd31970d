//! Error taxonomy for the crash engine.
//!
//! Every precondition violation is rejected synchronously with one of these
//! named variants and no state mutation. Callers match on the variant, not
//! on message text, and decide themselves whether to retry (e.g. re-poll
//! until `BettingNotOver` clears).

use crate::bank::BankError;
use thiserror::Error;

/// Engine-level errors surfaced verbatim to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("operation not valid in the current round phase")]
    WrongPhase,

    #[error("betting window has closed")]
    BettingOver,

    #[error("betting window has not closed yet")]
    BettingNotOver,

    #[error("round has not run its full duration yet")]
    GameNotOver,

    #[error("a round is already open")]
    RoundAlreadyOpen,

    #[error("round has not passed its reveal deadline")]
    RoundNotCrashed,

    #[error("bet amount or auto-cashout threshold out of bounds")]
    InvalidBet,

    #[error("player already has a bet in this round")]
    AlreadyBet,

    #[error("player has no bet in this round")]
    NoBet,

    #[error("bet is already cashed out")]
    AlreadyCashedOut,

    #[error("current multiplier is below the cashout minimum")]
    MultiplierTooLow,

    #[error("revealed seed does not match the committed hash")]
    InvalidSeed,

    #[error("caller {0} is not the operator")]
    Unauthorized(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error("storage error: {0}")]
    Store(String),
}

impl From<crate::store::StoreError> for GameError {
    fn from(e: crate::store::StoreError) -> Self {
        GameError::Store(e.to_string())
    }
}

impl GameError {
    /// Stable machine-readable code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::WrongPhase => "WRONG_PHASE",
            GameError::BettingOver => "BETTING_OVER",
            GameError::BettingNotOver => "BETTING_NOT_OVER",
            GameError::GameNotOver => "GAME_NOT_OVER",
            GameError::RoundAlreadyOpen => "ROUND_ALREADY_OPEN",
            GameError::RoundNotCrashed => "ROUND_NOT_CRASHED",
            GameError::InvalidBet => "INVALID_BET",
            GameError::AlreadyBet => "ALREADY_BET",
            GameError::NoBet => "NO_BET",
            GameError::AlreadyCashedOut => "ALREADY_CASHED_OUT",
            GameError::MultiplierTooLow => "MULTIPLIER_TOO_LOW",
            GameError::InvalidSeed => "INVALID_SEED",
            GameError::Unauthorized(_) => "UNAUTHORIZED",
            GameError::InvalidConfig(_) => "INVALID_CONFIG",
            GameError::Bank(_) => "TRANSFER_FAILED",
            GameError::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Phase/timing races on the permissionless calls are expected under
    /// concurrency; they are logged at debug, everything else at warn.
    pub fn is_expected_race(&self) -> bool {
        matches!(
            self,
            GameError::WrongPhase
                | GameError::BettingNotOver
                | GameError::GameNotOver
                | GameError::RoundNotCrashed
        )
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(GameError::AlreadyBet.code(), "ALREADY_BET");
        assert_eq!(GameError::InvalidSeed.code(), "INVALID_SEED");
        assert_eq!(
            GameError::Unauthorized("mallory".to_string()).code(),
            "UNAUTHORIZED"
        );
    }

    #[test]
    fn test_race_classification() {
        assert!(GameError::WrongPhase.is_expected_race());
        assert!(GameError::BettingNotOver.is_expected_race());
        assert!(!GameError::AlreadyBet.is_expected_race());
        assert!(!GameError::InvalidSeed.is_expected_race());
    }
}
