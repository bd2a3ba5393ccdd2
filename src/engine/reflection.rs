// Poetry Engine — Reflection cycle
//
// Self-critique: after every poem (spawned, never awaited by the generator),
// the model rereads the poem and its source particles. The first few
// suggestion bullets come back as feedback particles, so the next poem
// hears them.
//
// Voice reflection: every N poems or after a maximum wait (and only when at
// least one poem has been written since the last version), the model rewrites
// its voice principles from recent poems, critiques and reader notes. Each
// version points at the one it replaces.

use crate::atoms::constants::{
    EVENT_SELF_CRITIQUE, EVENT_SELF_CRITIQUE_ERROR, EVENT_VOICE_REFLECTION,
    MAX_SUGGESTION_PARTICLES, REFLECTION_RECENT_CRITIQUES, REFLECTION_RECENT_FEEDBACK,
    REFLECTION_RECENT_POEMS, SOURCE_SELF_CRITIQUE, STRENGTH_SELF_CRITIQUE, SUGGESTION_LABEL_CHARS,
};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{GenerateOptions, NewParticle, Particle, ParticleCategory};
use crate::engine::config::VoiceConfig;
use crate::engine::parse::{bullet_lines, parse_critique, parse_voice};
use crate::engine::particles::insert_with_connections;
use crate::engine::prompts::{self, ReflectionContext};
use crate::engine::state::{elapsed_exceeds, EngineState};
use log::{info, warn};
use serde_json::json;

/// Critique one poem and store the result. Returns the critique id.
pub async fn critique_poem(
    state: &EngineState,
    poem_id: i64,
    title: &str,
    body: &str,
    particles: &[Particle],
) -> EngineResult<i64> {
    let prompt = prompts::self_critique_prompt(title, body, particles);
    let options = GenerateOptions::with_temperature(state.config.voice.critique_temperature);
    let raw = state.generator.generate(&prompt, &options).await?;

    let sections = parse_critique(&raw);
    let critique_id = state.store.insert_critique(poem_id, &sections)?;

    let suggestions = bullet_lines(&sections.suggestions);
    let mut created = 0;
    for text in suggestions.iter().take(MAX_SUGGESTION_PARTICLES) {
        insert_with_connections(
            &state.store,
            &NewParticle {
                label: text.chars().take(SUGGESTION_LABEL_CHARS).collect(),
                category: ParticleCategory::Feedback,
                content: text.clone(),
                strength: STRENGTH_SELF_CRITIQUE,
                source: SOURCE_SELF_CRITIQUE.to_string(),
            },
        )?;
        created += 1;
    }

    info!("[reflection] Critiqued poem {} ({} suggestion particles)", poem_id, created);
    state.record(
        EVENT_SELF_CRITIQUE,
        json!({ "poemId": poem_id, "title": title, "suggestionParticles": created }),
    );
    Ok(critique_id)
}

/// Fire-and-forget self-critique. Failures are logged from inside the task.
pub fn spawn_self_critique(
    state: &EngineState,
    poem_id: i64,
    title: String,
    body: String,
    particles: Vec<Particle>,
) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = critique_poem(&state, poem_id, &title, &body, &particles).await {
            warn!("[reflection] Self-critique of poem {} failed: {}", poem_id, e);
            state.record(
                EVENT_SELF_CRITIQUE_ERROR,
                json!({ "poemId": poem_id, "error": e.to_string() }),
            );
        }
    });
}

/// Poems written since the current voice-principles version (all poems if
/// there is none yet).
pub fn poems_since_last_reflection(state: &EngineState) -> EngineResult<i64> {
    let current = state.store.current_voice_principles()?;
    state
        .store
        .count_poems_since(current.as_ref().map(|v| v.created_at.as_str()))
}

/// Reflection gate: enough new poems or waited long enough, and never with
/// nothing new to reflect on.
pub fn reflection_due(
    poems_since: i64,
    since_last_reflection: Option<chrono::Duration>,
    cfg: &VoiceConfig,
) -> bool {
    if poems_since <= 0 {
        return false;
    }
    poems_since >= cfg.reflect_every_n_poems
        || elapsed_exceeds(since_last_reflection, cfg.reflect_max_wait())
}

/// Write a new voice-principles version. Returns its id.
pub async fn do_voice_reflection(state: &EngineState) -> EngineResult<i64> {
    let store = &state.store;
    let current = store.current_voice_principles()?;
    let poems = store.list_poems(REFLECTION_RECENT_POEMS, 0)?;
    let critiques = store.recent_critiques(REFLECTION_RECENT_CRITIQUES)?;
    let feedback = store.recent_feedback(REFLECTION_RECENT_FEEDBACK)?;
    let poem_count = store.count_poems()?;

    let prompt = prompts::voice_reflection_prompt(&ReflectionContext {
        current_principles: current.as_ref().map(|v| v.principles.as_str()),
        poems: &poems,
        critiques: &critiques,
        feedback: &feedback,
        poem_count,
    });
    let options = GenerateOptions::with_temperature(state.config.voice.critique_temperature);
    let raw = state.generator.generate(&prompt, &options).await?;
    let principles = parse_voice(&raw);

    let source_ids: Vec<i64> = poems.iter().map(|p| p.id).collect();
    let id = store.insert_voice_principles(
        &principles,
        poem_count,
        &source_ids,
        current.as_ref().map(|v| v.id),
    )?;

    info!("[reflection] Voice principles v{} written from {} poems", id, source_ids.len());
    store.log_event(
        EVENT_VOICE_REFLECTION,
        json!({ "poemCount": poem_count, "principlesLength": principles.len(), "versionId": id }),
    )?;
    Ok(id)
}
