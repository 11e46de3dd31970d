//! Prometheus metrics for the engine and its API.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Counters and gauges covering the round lifecycle and money flow.
pub struct EngineMetrics {
    registry: Registry,

    pub rounds_committed: IntCounter,
    pub rounds_settled: IntCounter,
    pub rounds_refunded: IntCounter,
    pub bets_placed: IntCounter,
    pub cashouts: IntCounter,

    pub staked_units: IntCounter,
    pub paid_out_units: IntCounter,
    pub burned_units: IntCounter,

    pub current_round_id: IntGauge,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let rounds_committed =
            IntCounter::new("crashd_rounds_committed_total", "Rounds committed")?;
        let rounds_settled = IntCounter::new("crashd_rounds_settled_total", "Rounds settled")?;
        let rounds_refunded =
            IntCounter::new("crashd_rounds_refunded_total", "Rounds emergency-refunded")?;
        let bets_placed = IntCounter::new("crashd_bets_placed_total", "Bets placed")?;
        let cashouts = IntCounter::new("crashd_cashouts_total", "Manual cashouts")?;
        let staked_units =
            IntCounter::new("crashd_staked_units_total", "Token units staked")?;
        let paid_out_units =
            IntCounter::new("crashd_paid_out_units_total", "Token units paid out")?;
        let burned_units =
            IntCounter::new("crashd_burned_units_total", "Token units burned")?;
        let current_round_id =
            IntGauge::new("crashd_current_round_id", "Id of the current round")?;

        registry.register(Box::new(rounds_committed.clone()))?;
        registry.register(Box::new(rounds_settled.clone()))?;
        registry.register(Box::new(rounds_refunded.clone()))?;
        registry.register(Box::new(bets_placed.clone()))?;
        registry.register(Box::new(cashouts.clone()))?;
        registry.register(Box::new(staked_units.clone()))?;
        registry.register(Box::new(paid_out_units.clone()))?;
        registry.register(Box::new(burned_units.clone()))?;
        registry.register(Box::new(current_round_id.clone()))?;

        Ok(Self {
            registry,
            rounds_committed,
            rounds_settled,
            rounds_refunded,
            bets_placed,
            cashouts,
            staked_units,
            paid_out_units,
            burned_units,
            current_round_id,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_encode() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.bets_placed.inc();
        metrics.staked_units.inc_by(500);
        metrics.current_round_id.set(3);

        let text = metrics.encode();
        assert!(text.contains("crashd_bets_placed_total 1"));
        assert!(text.contains("crashd_staked_units_total 500"));
        assert!(text.contains("crashd_current_round_id 3"));
    }
}
