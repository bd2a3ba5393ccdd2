// Poetry Engine — Interest & research cycle
//
// generate_interest: the model looks at the current particles and names a
//                    topic it wants to explore next.
// do_research:       one interest is searched on the web and the findings
//                    are distilled into research particles.
// Both are gated by jittered intervals in the scheduler.

use crate::atoms::constants::{
    EVENT_INTEREST_GENERATED, EVENT_RESEARCH_COMPLETE, EVENT_RESEARCH_EMPTY,
    EVENT_RESEARCH_ERROR, MAX_TOPIC_CHARS, MIN_PARTICLES_FOR_INTEREST, STRENGTH_RESEARCH,
};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{GenerateOptions, Interest, ParticleCategory, SearchResult};
use crate::engine::particles::ingest::insert_bullet_particles;
use crate::engine::prompts;
use crate::engine::state::EngineState;
use log::{info, warn};
use serde_json::json;

const INTEREST_ORIGIN: &str = "agent";

/// What a research pass did.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchOutcome {
    /// No interests to research.
    Idle,
    /// The search returned nothing usable.
    Empty { topic: String },
    Complete { topic: String, particles: usize },
    Failed { topic: String, error: String },
}

/// Clean up a model reply into a topic, or `None` if it isn't usable.
pub fn accept_topic(reply: &str) -> Option<String> {
    let topic = reply.trim().trim_matches(|c: char| "\"'“”*".contains(c)).trim();
    (!topic.is_empty() && topic.chars().count() < MAX_TOPIC_CHARS).then(|| topic.to_string())
}

/// Ask for a new topic. Needs a minimum particle population; returns the
/// new interest id when one was stored.
pub async fn generate_interest(state: &EngineState) -> EngineResult<Option<i64>> {
    let particles = state.store.active_particles()?;
    if particles.len() < MIN_PARTICLES_FOR_INTEREST {
        return Ok(None);
    }

    let reply = state
        .generator
        .generate(&prompts::interest_prompt(&particles), &GenerateOptions::default())
        .await?;
    let Some(topic) = accept_topic(&reply) else {
        warn!("[research] Discarding unusable interest reply ({} chars)", reply.len());
        return Ok(None);
    };

    let id = state.store.insert_interest(&topic, INTEREST_ORIGIN, 1.0)?;
    info!("[research] New interest: {}", topic);
    state.store.log_event(EVENT_INTEREST_GENERATED, json!({ "topic": topic }))?;
    Ok(Some(id))
}

/// First unresearched interest, else the strongest.
pub fn pick_interest(interests: &[Interest]) -> Option<&Interest> {
    interests
        .iter()
        .find(|i| i.research_notes.is_none())
        .or_else(|| interests.first())
}

/// `title: description` blocks separated by blank lines.
pub fn format_findings(results: &[SearchResult], max: usize) -> String {
    results
        .iter()
        .take(max)
        .map(|r| format!("{}: {}", r.title, r.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

async fn research_topic(state: &EngineState, interest: &Interest) -> EngineResult<Option<usize>> {
    let results = state.search.search(&interest.topic).await?;
    let findings = format_findings(&results, state.config.search.max_results);
    if findings.trim().is_empty() {
        return Ok(None);
    }

    let digest = state
        .generator
        .generate(
            &prompts::research_digest_prompt(&interest.topic, &findings),
            &GenerateOptions::default(),
        )
        .await?;
    state.store.update_interest_research(interest.id, &digest)?;

    let count = insert_bullet_particles(
        state,
        &digest,
        ParticleCategory::Research,
        STRENGTH_RESEARCH,
        &format!("research: {}", interest.topic),
    )?;
    Ok(Some(count))
}

/// Research one interest. Failures are caught and logged as
/// `research_error`; only store failures while picking propagate.
pub async fn do_research(state: &EngineState) -> EngineResult<ResearchOutcome> {
    let interests = state.store.active_interests()?;
    let Some(target) = pick_interest(&interests) else {
        return Ok(ResearchOutcome::Idle);
    };
    let topic = target.topic.clone();

    let outcome = match research_topic(state, target).await {
        Ok(None) => {
            state.record(EVENT_RESEARCH_EMPTY, json!({ "topic": topic }));
            ResearchOutcome::Empty { topic }
        }
        Ok(Some(particles)) => {
            info!("[research] '{}' → {} particles", topic, particles);
            state.record(
                EVENT_RESEARCH_COMPLETE,
                json!({ "topic": topic, "particleCount": particles }),
            );
            ResearchOutcome::Complete { topic, particles }
        }
        Err(e) => {
            warn!("[research] '{}' failed: {}", topic, e);
            state.record(EVENT_RESEARCH_ERROR, json!({ "topic": topic, "error": e.to_string() }));
            ResearchOutcome::Failed { topic, error: e.to_string() }
        }
    };
    Ok(outcome)
}
