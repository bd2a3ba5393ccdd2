// Connection graph builder.
//
// A new particle's label + content is reduced to a keyword set and compared
// with every active particle; any overlap becomes a link weighted by the
// number of shared keywords. Links are a point-in-time snapshot stored on the
// new particle and never recomputed, so targets may later decay away.
// Consumers filter links against the current active set.

use crate::atoms::error::EngineResult;
use crate::atoms::types::{NewParticle, Particle, ParticleLink};
use crate::engine::store::AgentStore;
use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "it", "of", "in", "to", "and", "or", "for", "on", "at", "by", "with",
    "from", "this", "that", "was", "are", "be", "has", "had", "have", "not", "but", "its", "as",
    "into", "about",
];

/// Lower-case, drop everything but ASCII letters/digits/whitespace, then keep
/// tokens longer than two characters that are not stop words.
pub fn extract_keywords(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn particle_keywords(label: &str, content: &str) -> HashSet<String> {
    extract_keywords(&format!("{} {}", label, content))
}

/// Links from a keyword set to every particle in `active` sharing at least
/// one keyword. Weight = overlap count.
pub fn find_connections(keywords: &HashSet<String>, active: &[Particle]) -> Vec<ParticleLink> {
    if keywords.is_empty() {
        return Vec::new();
    }
    active
        .iter()
        .filter_map(|p| {
            let overlap = particle_keywords(&p.label, &p.content).intersection(keywords).count();
            (overlap > 0).then(|| ParticleLink { id: p.id, weight: overlap as f64 })
        })
        .collect()
}

/// Insert `particle` with its connection snapshot against the current active set.
pub fn insert_with_connections(store: &AgentStore, particle: &NewParticle) -> EngineResult<i64> {
    let active = store.active_particles()?;
    let keywords = particle_keywords(&particle.label, &particle.content);
    let links = find_connections(&keywords, &active);
    store.insert_particle(particle, &links)
}
