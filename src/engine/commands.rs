// Poetry Engine — Boundary operations
// Thin wrappers a presentation layer (HTTP, CLI) calls into. Input checks
// live here and surface as `Validation` / `NotFound`; all other logic lives
// in the engine modules.

use crate::atoms::constants::{EVENT_POEM_COMPLETE, EVENT_TICK};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{
    AgentEvent, Feedback, GeneratedPoem, Particle, Poem, Rating, ReadinessBreakdown, Reference,
    ReferenceKind, TriggerKind, VoicePrinciples,
};
use crate::engine::particles::ingest;
use crate::engine::poems;
use crate::engine::readiness::evaluate_readiness;
use crate::engine::scheduler::{Scheduler, SchedulerSnapshot};
use crate::engine::state::EngineState;
use log::info;
use serde::Serialize;

const DEFAULT_POEM_PAGE: usize = 20;
const DEFAULT_EVENT_LIMIT: usize = 50;
const DEFAULT_REFERENCE_LIMIT: usize = 50;
const DEFAULT_VOICE_HISTORY: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub scheduler: SchedulerSnapshot,
    /// Latest completed tick in the log; survives restarts, unlike the snapshot.
    pub last_tick_at: Option<String>,
    pub last_poem_at: Option<String>,
    pub particle_count: usize,
    pub poem_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoemWithFeedback {
    #[serde(flatten)]
    pub poem: Poem,
    pub feedback: Vec<Feedback>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleOverview {
    pub particles: Vec<Particle>,
    pub readiness: ReadinessBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceOverview {
    pub current: Option<VoicePrinciples>,
    pub history: Vec<VoicePrinciples>,
}

fn require_poem(state: &EngineState, id: i64) -> EngineResult<Poem> {
    state
        .store
        .get_poem(id)?
        .ok_or_else(|| EngineError::not_found(format!("poem {}", id)))
}

// ── Agent ──────────────────────────────────────────────────────────────

pub fn agent_status(scheduler: &Scheduler) -> EngineResult<AgentStatus> {
    let store = &scheduler.state().store;
    Ok(AgentStatus {
        scheduler: scheduler.snapshot(),
        last_tick_at: store.last_event(EVENT_TICK)?.map(|e| e.created_at),
        last_poem_at: store.last_event(EVENT_POEM_COMPLETE)?.map(|e| e.created_at),
        particle_count: store.count_active_particles()?,
        poem_count: store.count_poems()?,
    })
}

/// Write a poem now, outside the tick loop.
pub async fn agent_trigger(state: &EngineState) -> EngineResult<GeneratedPoem> {
    info!("[commands] Manual trigger");
    poems::generate_poem(state, TriggerKind::Manual).await
}

/// Streaming manual trigger: fragments go to `sink` as they arrive.
pub async fn agent_trigger_streaming<F>(state: &EngineState, sink: F) -> EngineResult<GeneratedPoem>
where
    F: FnMut(&str) + Send,
{
    info!("[commands] Manual trigger (streaming)");
    poems::generate_poem_streaming(state, TriggerKind::Manual, sink).await
}

// ── Poems ──────────────────────────────────────────────────────────────

pub fn poems_list(
    state: &EngineState,
    limit: Option<usize>,
    offset: Option<usize>,
) -> EngineResult<Vec<PoemWithFeedback>> {
    let poems = state
        .store
        .list_poems(limit.unwrap_or(DEFAULT_POEM_PAGE), offset.unwrap_or(0))?;
    poems
        .into_iter()
        .map(|poem| {
            let feedback = state.store.feedback_for_poem(poem.id)?;
            Ok(PoemWithFeedback { poem, feedback })
        })
        .collect()
}

pub fn poem_get(state: &EngineState, id: i64) -> EngineResult<PoemWithFeedback> {
    let poem = require_poem(state, id)?;
    let feedback = state.store.feedback_for_poem(id)?;
    Ok(PoemWithFeedback { poem, feedback })
}

/// Rate a poem (`up`, `down`, `favorite`, `none`). Repeating the current
/// rating clears it. Returns the rating now in effect.
pub fn poem_rate(state: &EngineState, id: i64, rating: &str) -> EngineResult<Option<Rating>> {
    let requested = Rating::parse_choice(rating).map_err(EngineError::Validation)?;
    state.store.set_poem_rating(id, requested)
}

/// Attach a note to a poem and digest it into particles in the background.
pub fn poem_add_feedback(state: &EngineState, id: i64, note: &str) -> EngineResult<i64> {
    let note = note.trim();
    if note.is_empty() {
        return Err(EngineError::validation("feedback note is required"));
    }
    let poem = require_poem(state, id)?;
    let feedback_id = state.store.insert_feedback(id, note)?;
    ingest::spawn_feedback_extraction(state, poem.body, note.to_string());
    Ok(feedback_id)
}

// ── References ─────────────────────────────────────────────────────────

pub fn reference_add(
    state: &EngineState,
    title: Option<&str>,
    body: &str,
    source_type: Option<&str>,
) -> EngineResult<i64> {
    let body = body.trim();
    if body.is_empty() {
        return Err(EngineError::validation("reference body is required"));
    }
    let title = title.map(str::trim).unwrap_or("");
    let kind = match source_type {
        Some(raw) => raw.parse::<ReferenceKind>().map_err(EngineError::Validation)?,
        None => ReferenceKind::Other,
    };
    let id = state.store.insert_reference(title, body, kind)?;
    ingest::spawn_reference_extraction(state, title, body.to_string());
    Ok(id)
}

pub fn reference_list(state: &EngineState, limit: Option<usize>) -> EngineResult<Vec<Reference>> {
    state.store.list_references(limit.unwrap_or(DEFAULT_REFERENCE_LIMIT))
}

// ── Particles, voice, log ──────────────────────────────────────────────

pub fn particles_list(state: &EngineState) -> EngineResult<ParticleOverview> {
    Ok(ParticleOverview {
        particles: state.store.active_particles()?,
        readiness: evaluate_readiness(state)?,
    })
}

pub fn voice_get(state: &EngineState) -> EngineResult<VoiceOverview> {
    Ok(VoiceOverview {
        current: state.store.current_voice_principles()?,
        history: state.store.voice_history(DEFAULT_VOICE_HISTORY)?,
    })
}

pub fn recent_events(state: &EngineState, limit: Option<usize>) -> EngineResult<Vec<AgentEvent>> {
    state.store.recent_events(limit.unwrap_or(DEFAULT_EVENT_LIMIT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::ParticleCategory;
    use crate::engine::config::Config;
    use crate::engine::testing::{harness, settle};

    #[tokio::test]
    async fn rating_rejects_unknown_values() {
        let h = harness(Config::default());
        let poem = agent_trigger(&h.state).await.unwrap();
        let err = poem_rate(&h.state, poem.id, "sideways").unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(poem_rate(&h.state, poem.id, "up").unwrap(), Some(Rating::Up));
        assert_eq!(poem_rate(&h.state, poem.id, "UP").unwrap(), None);
    }

    #[test]
    fn rating_unknown_poem_is_not_found() {
        let h = harness(Config::default());
        assert!(matches!(poem_rate(&h.state, 7, "down").unwrap_err(), EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn feedback_requires_note_and_poem() {
        let h = harness(Config::default());
        assert!(matches!(
            poem_add_feedback(&h.state, 1, "  ").unwrap_err(),
            EngineError::Validation(_)
        ));
        assert!(matches!(
            poem_add_feedback(&h.state, 1, "lovely").unwrap_err(),
            EngineError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn feedback_is_listed_and_digested() {
        let h = harness(Config::default());
        let poem = agent_trigger(&h.state).await.unwrap();
        poem_add_feedback(&h.state, poem.id, "more salt, less fog").unwrap();
        settle().await;

        let listed = poems_list(&h.state, None, None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].feedback[0].note, "more salt, less fog");

        let digested = h
            .state
            .store
            .active_particles()
            .unwrap()
            .into_iter()
            .filter(|p| p.source == "user-feedback")
            .count();
        assert_eq!(digested, 2);
    }

    #[tokio::test]
    async fn reference_needs_body_and_spawns_extraction() {
        let h = harness(Config::default());
        assert!(matches!(
            reference_add(&h.state, Some("t"), "   ", None).unwrap_err(),
            EngineError::Validation(_)
        ));

        reference_add(&h.state, Some("Tides"), "The sea keeps time.", Some("article")).unwrap();
        settle().await;

        let refs = reference_list(&h.state, None).unwrap();
        assert_eq!(refs[0].source_type, ReferenceKind::Article);
        let overview = particles_list(&h.state).unwrap();
        assert!(overview
            .particles
            .iter()
            .any(|p| p.category == ParticleCategory::Reference && p.source == "reference: Tides"));
    }

    #[tokio::test]
    async fn reference_rejects_unknown_source_type() {
        let h = harness(Config::default());
        let err = reference_add(&h.state, Some("Tides"), "The sea keeps time.", Some("essay")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("essay")));
        assert!(reference_list(&h.state, None).unwrap().is_empty());

        reference_add(&h.state, None, "untitled notes", Some(" Poem ")).unwrap();
        reference_add(&h.state, None, "more notes", None).unwrap();
        settle().await;
        let kinds: Vec<_> = reference_list(&h.state, None)
            .unwrap()
            .into_iter()
            .map(|r| r.source_type)
            .collect();
        assert!(kinds.contains(&ReferenceKind::Poem));
        assert!(kinds.contains(&ReferenceKind::Other));
    }

    #[tokio::test]
    async fn status_reports_store_counts() {
        let h = harness(Config::default());
        agent_trigger(&h.state).await.unwrap();
        let scheduler = Scheduler::new(h.state.clone());
        let status = agent_status(&scheduler).unwrap();
        assert!(!status.scheduler.running);
        assert!(status.last_poem_at.is_some());
        assert_eq!(status.poem_count, 1);
        assert!(voice_get(&h.state).unwrap().current.is_none());
        assert!(!recent_events(&h.state, Some(5)).unwrap().is_empty());
    }
}
