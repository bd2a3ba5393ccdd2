// Poetry Engine — Readiness scorer
//
// A weighted [0,1] heuristic over the active particle set:
//   count        active / (min_particles × 4)
//   diversity    distinct categories / 5
//   connections  live links / (active × 2)
//   time         time since last poem / max poem wait
//   randomness   fresh uniform draw per evaluation
// Each component is clamped to [0,1] before weighting and the weighted sum
// is clamped to 1. Below `min_particles` everything is exactly zero.

use crate::atoms::constants::EVENT_POEM_COMPLETE;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Particle, ReadinessBreakdown, ReadinessComponents};
use crate::engine::config::ReadinessConfig;
use crate::engine::state::EngineState;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;

/// Number of categories at which diversity saturates.
const DIVERSITY_SATURATION: f64 = 5.0;

/// Links per particle at which connectivity saturates.
const LINKS_PER_PARTICLE: f64 = 2.0;

/// Multiple of `min_particles` at which the count component saturates.
const COUNT_SATURATION_FACTOR: f64 = 4.0;

fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// `since_last_poem == None` (never) saturates time pressure.
pub fn time_pressure(since_last_poem: Option<chrono::Duration>, max_poem_wait: Duration) -> f64 {
    match since_last_poem {
        None => 1.0,
        Some(_) if max_poem_wait.is_zero() => 1.0,
        Some(d) => unit(d.num_milliseconds() as f64 / max_poem_wait.as_millis() as f64),
    }
}

/// Links from active particles to other active particles. Links to
/// particles that have since decayed or been consumed are ignored.
pub fn live_connection_count(particles: &[Particle]) -> usize {
    let active: HashSet<i64> = particles.iter().map(|p| p.id).collect();
    particles
        .iter()
        .flat_map(|p| p.connections.iter())
        .filter(|l| active.contains(&l.id))
        .count()
}

/// Score `particles` against `cfg`. Pure apart from the `rng` draw.
pub fn evaluate<R: Rng>(
    particles: &[Particle],
    since_last_poem: Option<chrono::Duration>,
    cfg: &ReadinessConfig,
    max_poem_wait: Duration,
    rng: &mut R,
) -> ReadinessBreakdown {
    let weights = cfg.weights;
    let zero = ReadinessBreakdown {
        score: 0.0,
        threshold: cfg.score_threshold,
        components: ReadinessComponents::default(),
        weights,
    };

    let n = particles.len();
    if n == 0 || n < cfg.min_particles {
        return zero;
    }

    let categories: HashSet<_> = particles.iter().map(|p| p.category).collect();
    let components = ReadinessComponents {
        count: unit(n as f64 / (cfg.min_particles.max(1) as f64 * COUNT_SATURATION_FACTOR)),
        diversity: unit(categories.len() as f64 / DIVERSITY_SATURATION),
        connections: unit(live_connection_count(particles) as f64 / (n as f64 * LINKS_PER_PARTICLE)),
        time_pressure: time_pressure(since_last_poem, max_poem_wait),
        randomness: rng.random::<f64>(),
    };

    let weighted = components.count * weights.count
        + components.diversity * weights.diversity
        + components.connections * weights.connections
        + components.time_pressure * weights.time_pressure
        + components.randomness * weights.randomness;

    ReadinessBreakdown { score: unit(weighted), components, ..zero }
}

/// Evaluate against the live store.
pub fn evaluate_readiness(state: &EngineState) -> EngineResult<ReadinessBreakdown> {
    let particles = state.store.active_particles()?;
    let since = state.time_since(EVENT_POEM_COMPLETE)?;
    Ok(evaluate(
        &particles,
        since,
        &state.config.readiness,
        state.config.agent.max_poem_wait(),
        &mut rand::rng(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::{ParticleCategory, ParticleLink, ReadinessWeights};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn p(id: i64, category: ParticleCategory, links: &[i64]) -> Particle {
        Particle {
            id,
            label: format!("p{}", id),
            category,
            content: String::new(),
            strength: 0.9,
            source: "test".into(),
            connections: links.iter().map(|&id| ParticleLink { id, weight: 1.0 }).collect(),
            consumed_by: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn six_particles() -> Vec<Particle> {
        use ParticleCategory::*;
        vec![
            p(1, Weather, &[2, 3]),
            p(2, Weather, &[1, 3]),
            p(3, Season, &[1, 2]),
            p(4, Season, &[5]),
            p(5, Research, &[4]),
            p(6, Research, &[99]), // stale target
        ]
    }

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn below_minimum_is_all_zero() {
        let cfg = ReadinessConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let b = evaluate(&six_particles()[..4], None, &cfg, DAY, &mut rng);
        assert_eq!(b.score, 0.0);
        assert_eq!(b.components, ReadinessComponents::default());
        assert!(evaluate(&[], None, &cfg, DAY, &mut rng).score == 0.0);
    }

    #[test]
    fn zero_regardless_of_weights() {
        let cfg = ReadinessConfig {
            weights: ReadinessWeights { count: 9.0, diversity: 9.0, connections: 9.0, time_pressure: 9.0, randomness: 9.0 },
            min_particles: 10,
            ..Default::default()
        };
        let b = evaluate(&six_particles(), None, &cfg, DAY, &mut StdRng::seed_from_u64(1));
        assert_eq!(b.score, 0.0);
    }

    #[test]
    fn components_match_formula() {
        let cfg = ReadinessConfig::default();
        let half_day = chrono::Duration::hours(12);
        let b = evaluate(&six_particles(), Some(half_day), &cfg, DAY, &mut StdRng::seed_from_u64(3));
        let c = b.components;
        assert!((c.count - 6.0 / 20.0).abs() < 1e-12);
        assert!((c.diversity - 3.0 / 5.0).abs() < 1e-12);
        // 8 live links out of 9; the link to #99 is stale.
        assert!((c.connections - 8.0 / 12.0).abs() < 1e-12);
        assert!((c.time_pressure - 0.5).abs() < 1e-9);
        assert!((0.0..1.0).contains(&c.randomness));
        let expected = c.count * 0.25 + c.diversity * 0.25 + c.connections * 0.25 + 0.5 * 0.15 + c.randomness * 0.1;
        assert!((b.score - expected).abs() < 1e-12);
    }

    #[test]
    fn score_is_capped_at_one() {
        let cfg = ReadinessConfig {
            weights: ReadinessWeights { count: 1.0, diversity: 1.0, connections: 1.0, time_pressure: 1.0, randomness: 1.0 },
            ..Default::default()
        };
        let b = evaluate(&six_particles(), None, &cfg, DAY, &mut StdRng::seed_from_u64(5));
        assert_eq!(b.score, 1.0);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let cfg = ReadinessConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for hours in [-5i64, 0, 1, 24, 1000] {
            let b = evaluate(&six_particles(), Some(chrono::Duration::hours(hours)), &cfg, DAY, &mut rng);
            assert!((0.0..=1.0).contains(&b.score));
            for v in [b.components.count, b.components.diversity, b.components.connections, b.components.time_pressure] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn time_pressure_saturates_at_max_wait() {
        assert_eq!(time_pressure(Some(chrono::Duration::days(1)), DAY), 1.0);
        assert_eq!(time_pressure(Some(chrono::Duration::days(3)), DAY), 1.0);
        assert_eq!(time_pressure(None, DAY), 1.0);
        assert_eq!(time_pressure(Some(chrono::Duration::zero()), DAY), 0.0);
    }
}
