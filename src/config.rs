//! Configuration management with validation and defaults
//!
//! Game parameters follow the deployed contract's knobs; node-level
//! sections cover the server, storage and croupier the same way the rest
//! of the system is configured: serde structs with rich defaults and an
//! explicit validation pass before anything starts.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Basis-point denominator used for house edge and settler reward.
pub const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Per-deployment game parameters. Mutable at runtime only through the
/// operator-gated setters on the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Minimum stake per bet, in token units.
    pub min_bet: u64,
    /// Maximum stake per bet, in token units.
    pub max_bet: u64,
    /// Length of the betting window, in ticks.
    pub betting_duration: u64,
    /// Length of the active phase before settlement is allowed, in ticks.
    pub round_duration: u64,
    /// Extra ticks past the reveal deadline before emergencyRefund opens.
    pub refund_grace_ticks: u64,
    /// House retention from the fair payout curve, in basis points.
    pub house_edge_bps: u64,
    /// Share of forfeited stakes paid to whoever settles, in basis points.
    pub settle_reward_bps: u64,
    /// Lowest multiplier a cashout (manual or auto) may resolve at.
    pub min_cashout: u64,
    /// Hard cap on the crash multiplier.
    pub max_multiplier: u64,
    /// Fixed-point scale: 100 = two decimal digits (1.00x == 100).
    pub multiplier_precision: u64,
    /// Live-curve slope: multiplier units gained per elapsed tick.
    pub growth_per_tick: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_bet: 100,
            max_bet: 1_000_000,
            betting_duration: 30,
            round_duration: 60,
            refund_grace_ticks: 120,
            house_edge_bps: 300,
            settle_reward_bps: 100,
            min_cashout: 101,
            max_multiplier: 10_000,
            multiplier_precision: 100,
            growth_per_tick: 6,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_bet == 0 {
            return Err(invalid("min_bet", "must be positive"));
        }
        if self.max_bet < self.min_bet {
            return Err(invalid("max_bet", "must be >= min_bet"));
        }
        if self.betting_duration == 0 {
            return Err(invalid("betting_duration", "must be positive"));
        }
        if self.round_duration == 0 {
            return Err(invalid("round_duration", "must be positive"));
        }
        if self.multiplier_precision == 0 {
            return Err(invalid("multiplier_precision", "must be positive"));
        }
        if self.min_cashout <= self.multiplier_precision {
            return Err(invalid("min_cashout", "must be above 1.00x"));
        }
        if self.max_multiplier < self.min_cashout {
            return Err(invalid("max_multiplier", "must be >= min_cashout"));
        }
        if self.house_edge_bps >= BPS_DENOMINATOR {
            return Err(invalid("house_edge_bps", "must be below 10000"));
        }
        if self.settle_reward_bps > BPS_DENOMINATOR {
            return Err(invalid("settle_reward_bps", "must be at most 10000"));
        }
        if self.growth_per_tick == 0 {
            return Err(invalid("growth_per_tick", "must be positive"));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Round history persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./DB/crashd_data".to_string(),
        }
    }
}

/// Background round-driver settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CroupierConfig {
    /// Set false to drive rounds externally (tests, manual operation).
    pub enabled: bool,
    /// How often the croupier re-checks round state, in milliseconds.
    pub poll_interval_ms: u64,
    /// Account credited with the settler reward when the croupier settles.
    pub operator_id: String,
}

impl Default for CroupierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 500,
            operator_id: "croupier".to_string(),
        }
    }
}

/// Top-level node configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub game: GameConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub croupier: CroupierConfig,
}

impl NodeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        if self.croupier.poll_interval_ms == 0 {
            return Err(invalid("croupier.poll_interval_ms", "must be positive"));
        }
        if self.croupier.operator_id.is_empty() {
            return Err(invalid("croupier.operator_id", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bet_bounds() {
        let config = GameConfig {
            min_bet: 1_000,
            max_bet: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_min_cashout_at_or_below_one() {
        let config = GameConfig {
            min_cashout: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_partial_toml() {
        let config: NodeConfig = toml::from_str(
            r#"
            [game]
            min_bet = 50
            house_edge_bps = 200

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.game.min_bet, 50);
        assert_eq!(config.game.house_edge_bps, 200);
        assert_eq!(config.game.max_bet, GameConfig::default().max_bet);
        assert_eq!(config.server.port, 9000);
    }
}
