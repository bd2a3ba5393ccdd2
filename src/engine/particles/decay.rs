// Decay engine: exponential half-life decay applied once per tick.
//
// The factor is fixed per tick, 0.5^(tick_period / half_life), rather than
// computed from the real time since each particle was last touched. Late or
// skipped ticks therefore slow decay down; that drift is tolerated.

use crate::atoms::constants::EVENT_DECAY;
use crate::atoms::error::EngineResult;
use crate::engine::state::EngineState;
use crate::engine::store::DecayOutcome;
use log::info;
use serde_json::json;
use std::time::Duration;

pub fn decay_factor(tick_period: Duration, half_life: Duration) -> f64 {
    if half_life.is_zero() {
        return 0.0;
    }
    0.5_f64.powf(tick_period.as_secs_f64() / half_life.as_secs_f64())
}

/// Decay every active particle, prune at the floor, enforce the population cap.
/// The tick period is the configured tick interval.
pub fn run_decay(state: &EngineState) -> EngineResult<DecayOutcome> {
    let cfg = &state.config;
    let factor = decay_factor(cfg.agent.tick_interval(), cfg.particles.decay_half_life());
    let outcome = state
        .store
        .decay_particles(factor, cfg.particles.min_strength, cfg.particles.max_count)?;

    if outcome.pruned > 0 || outcome.capped > 0 {
        info!(
            "[decay] factor={:.4} decayed={} pruned={} capped={}",
            factor, outcome.decayed, outcome.pruned, outcome.capped
        );
        state.record(
            EVENT_DECAY,
            json!({
                "factor": factor,
                "decayed": outcome.decayed,
                "pruned": outcome.pruned,
                "capped": outcome.capped,
            }),
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_half_life_halves() {
        let f = decay_factor(Duration::from_secs(3600), Duration::from_secs(3600));
        assert!((f - 0.5).abs() < 1e-12);
    }

    #[test]
    fn default_tick_against_default_half_life() {
        // 5 minutes against 12 hours: 144 ticks per half-life.
        let f = decay_factor(Duration::from_millis(300_000), Duration::from_millis(43_200_000));
        assert!((f.powi(144) - 0.5).abs() < 1e-9);
        assert!(f < 1.0 && f > 0.99);
    }

    #[test]
    fn factor_is_monotone_non_increasing_in_strength() {
        let f = decay_factor(Duration::from_secs(60), Duration::from_secs(600));
        for s in [1.0, 0.5, 0.06, 0.0] {
            assert!(s * f <= s);
        }
    }
}
