// Poetry Engine — Generation pipeline
//
// prepare  → gather particles, feedback, reader ratings, weather, season,
//            voice principles; build the request
// generate → one model call (blocking) or a fragment stream
// persist  → parse, insert the poem, mark every offered particle consumed,
//            log completion, spawn the self-critique
//
// Reading the active set and marking it consumed are separate steps with a
// model call in between. Two concurrent runs can therefore both see the same
// particles; the consumption update only claims rows that are still
// unclaimed, so each particle ends up attributed to exactly one poem.

use crate::atoms::constants::{
    EVENT_POEM_COMPLETE, EVENT_POEM_ERROR, EVENT_POEM_START, PROMPT_RATED_POEMS,
    PROMPT_RECENT_FEEDBACK,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{
    GenerateOptions, GeneratedPoem, NewPoem, Particle, ParticleRef, TriggerKind,
};
use crate::engine::parse::parse_poem;
use crate::engine::prompts::{self, PoemContext};
use crate::engine::reflection;
use crate::engine::season;
use crate::engine::state::EngineState;
use futures::StreamExt;
use log::{info, warn};
use serde_json::json;

/// A built request plus the context that gets stored with the poem.
struct PreparedPoem {
    prompt: String,
    particles: Vec<Particle>,
    weather: Option<String>,
    season: String,
    time_of_day: String,
}

async fn prepare(state: &EngineState, trigger: TriggerKind) -> EngineResult<PreparedPoem> {
    let store = &state.store;
    let particles = store.active_particles()?;
    let feedback = store.recent_feedback(PROMPT_RECENT_FEEDBACK)?;
    let rated = store.recent_rated_poems(PROMPT_RATED_POEMS)?;
    let voice = store.current_voice_principles()?;

    let (liked, disliked): (Vec<_>, Vec<_>) = rated
        .iter()
        .filter_map(|p| p.rating.map(|r| (r, p.title.clone())))
        .partition(|(r, _)| r.is_positive());
    let liked = liked.into_iter().map(|(_, t)| t).collect();
    let disliked = disliked.into_iter().map(|(_, t)| t).collect();

    // Weather is optional context.
    let weather = match state.weather.fetch_weather().await {
        Ok(report) => Some(report.context_line()),
        Err(e) => {
            warn!("[poems] Weather unavailable, writing without it: {}", e);
            None
        }
    };

    let loc = &state.config.location;
    let (season, time_of_day) = season::current_moment(loc.lat, &loc.timezone);

    let prompt = prompts::poem_prompt(&PoemContext {
        particles: &particles,
        feedback: &feedback,
        liked,
        disliked,
        weather: weather.as_deref(),
        season: Some(season),
        time_of_day: Some(time_of_day),
        voice_principles: voice.as_ref().map(|v| v.principles.as_str()),
    });

    state.store.log_event(
        EVENT_POEM_START,
        json!({ "triggeredBy": trigger.as_str(), "particleCount": particles.len() }),
    )?;
    info!("[poems] Generating ({}) from {} particles", trigger.as_str(), particles.len());

    Ok(PreparedPoem {
        prompt,
        particles,
        weather,
        season: season.to_string(),
        time_of_day: time_of_day.to_string(),
    })
}

fn persist(
    state: &EngineState,
    prepared: PreparedPoem,
    raw: &str,
    trigger: TriggerKind,
) -> EngineResult<GeneratedPoem> {
    let parsed = parse_poem(raw);
    let snapshot: Vec<ParticleRef> = prepared.particles.iter().map(ParticleRef::from).collect();

    let poem_id = state.store.insert_poem(&NewPoem {
        title: parsed.title.clone(),
        body: parsed.body.clone(),
        thinking: vec![parsed.thinking.clone()],
        particles: snapshot,
        triggered_by: trigger,
        weather_context: prepared.weather,
        season: Some(prepared.season),
        time_of_day: Some(prepared.time_of_day),
    })?;

    let ids: Vec<i64> = prepared.particles.iter().map(|p| p.id).collect();
    let marked = state.store.mark_particles_consumed(&ids, poem_id)?;
    if marked < ids.len() {
        warn!(
            "[poems] Poem {}: {} of {} particles were already consumed by a concurrent poem",
            poem_id,
            ids.len() - marked,
            ids.len()
        );
    }

    state
        .store
        .log_event(EVENT_POEM_COMPLETE, json!({ "poemId": poem_id, "title": parsed.title }))?;
    info!("[poems] Stored poem {} '{}'", poem_id, parsed.title);

    reflection::spawn_self_critique(
        state,
        poem_id,
        parsed.title.clone(),
        parsed.body.clone(),
        prepared.particles,
    );

    Ok(GeneratedPoem {
        id: poem_id,
        title: parsed.title,
        body: parsed.body,
        thinking: parsed.thinking,
        particle_count: ids.len(),
    })
}

fn log_failure(state: &EngineState, trigger: TriggerKind, err: &EngineError) {
    warn!("[poems] Generation failed: {}", err);
    state.record(
        EVENT_POEM_ERROR,
        json!({ "triggeredBy": trigger.as_str(), "error": err.to_string() }),
    );
}

/// Run the whole pipeline with a single blocking model call.
pub async fn generate_poem(state: &EngineState, trigger: TriggerKind) -> EngineResult<GeneratedPoem> {
    let result = async {
        let prepared = prepare(state, trigger).await?;
        let raw = state
            .generator
            .generate(&prepared.prompt, &GenerateOptions::default())
            .await?;
        persist(state, prepared, &raw, trigger)
    }
    .await;
    if let Err(e) = &result {
        log_failure(state, trigger, e);
    }
    result
}

/// Streaming variant: every fragment is handed to `on_chunk` as it arrives;
/// the reassembled text is persisted exactly as in `generate_poem`.
pub async fn generate_poem_streaming<F>(
    state: &EngineState,
    trigger: TriggerKind,
    mut on_chunk: F,
) -> EngineResult<GeneratedPoem>
where
    F: FnMut(&str) + Send,
{
    let result = async {
        let prepared = prepare(state, trigger).await?;
        let mut stream = state
            .generator
            .generate_stream(&prepared.prompt, &GenerateOptions::default())
            .await?;
        let mut raw = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            on_chunk(&fragment);
            raw.push_str(&fragment);
        }
        persist(state, prepared, &raw, trigger)
    }
    .await;
    if let Err(e) = &result {
        log_failure(state, trigger, e);
    }
    result
}
