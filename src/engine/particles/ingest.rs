// Particle ingestion: every path that creates particles.
//
//   season / weather      — direct, no model call
//   references, feedback  — model call → `- LABEL: description` bullets
//
// Extraction from user input runs as a spawned background task: the caller
// returns as soon as the reference / note is stored, and failures only reach
// the agent log.

use crate::atoms::constants::{
    EVENT_PARTICLE_EXTRACTION, EVENT_PARTICLE_EXTRACTION_ERROR, EVENT_SEASON_PARTICLES,
    EVENT_WEATHER_ERROR, EVENT_WEATHER_FETCH, SOURCE_SYSTEM, SOURCE_USER_FEEDBACK, SOURCE_WEATHER,
    STRENGTH_REFERENCE, STRENGTH_SEASON, STRENGTH_USER_FEEDBACK, STRENGTH_WEATHER,
};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{GenerateOptions, NewParticle, ParticleCategory, WeatherReport};
use crate::engine::parse::parse_bullet_pairs;
use crate::engine::particles::graph::insert_with_connections;
use crate::engine::prompts;
use crate::engine::season;
use crate::engine::state::EngineState;
use log::{info, warn};
use serde_json::json;

pub fn season_particle(season: &str, time_of_day: &str) -> NewParticle {
    NewParticle {
        label: format!("{} {}", season, time_of_day),
        category: ParticleCategory::Season,
        content: format!(
            "It is {} in {}. The world carries the quality of this moment.",
            time_of_day, season
        ),
        strength: STRENGTH_SEASON,
        source: SOURCE_SYSTEM.to_string(),
    }
}

pub fn weather_particle(report: &WeatherReport) -> NewParticle {
    NewParticle {
        label: report.description.clone(),
        category: ParticleCategory::Weather,
        content: format!(
            "The sky is {}. Temperature: {}C. Wind: {}km/h. Humidity: {}%.",
            report.description, report.temperature, report.wind, report.humidity
        ),
        strength: STRENGTH_WEATHER,
        source: SOURCE_WEATHER.to_string(),
    }
}

/// Insert a particle for the current season and time of day.
pub fn create_season_particles(state: &EngineState) -> EngineResult<i64> {
    let loc = &state.config.location;
    let (season, tod) = season::current_moment(loc.lat, &loc.timezone);
    let id = insert_with_connections(&state.store, &season_particle(season, tod))?;
    state
        .store
        .log_event(EVENT_SEASON_PARTICLES, json!({ "season": season, "timeOfDay": tod }))?;
    Ok(id)
}

/// Fetch the weather and insert it as a particle. A failed fetch is logged
/// as `weather_error` and is not an error for the caller.
pub async fn create_weather_particles(state: &EngineState) -> EngineResult<Option<i64>> {
    let report = match state.weather.fetch_weather().await {
        Ok(r) => r,
        Err(e) => {
            warn!("[weather] Fetch failed: {}", e);
            state.record(EVENT_WEATHER_ERROR, json!({ "error": e.to_string() }));
            return Ok(None);
        }
    };
    let id = insert_with_connections(&state.store, &weather_particle(&report))?;
    state.store.log_event(
        EVENT_WEATHER_FETCH,
        json!({
            "description": report.description,
            "temperature": report.temperature,
            "wind": report.wind,
            "humidity": report.humidity,
        }),
    )?;
    Ok(Some(id))
}

/// Insert every `- LABEL: description` pair in `reply` as a particle.
/// Returns how many were inserted.
pub fn insert_bullet_particles(
    state: &EngineState,
    reply: &str,
    category: ParticleCategory,
    strength: f64,
    source: &str,
) -> EngineResult<usize> {
    let pairs = parse_bullet_pairs(reply);
    for (label, content) in &pairs {
        insert_with_connections(
            &state.store,
            &NewParticle {
                label: label.clone(),
                category,
                content: content.clone(),
                strength,
                source: source.to_string(),
            },
        )?;
    }
    Ok(pairs.len())
}

/// Ask the model to break `text` into particles and store them.
pub async fn extract_particles_from_text(
    state: &EngineState,
    text: &str,
    source: &str,
    category: ParticleCategory,
) -> EngineResult<usize> {
    let reply = state
        .generator
        .generate(&prompts::extraction_prompt(text, source), &GenerateOptions::default())
        .await?;
    let count = insert_bullet_particles(state, &reply, category, STRENGTH_REFERENCE, source)?;
    info!("[particles] Extracted {} {} particles from {}", count, category, source);
    state.record(
        EVENT_PARTICLE_EXTRACTION,
        json!({ "source": source, "category": category.as_str(), "count": count }),
    );
    Ok(count)
}

/// Digest a reader's note on a poem into feedback particles.
pub async fn extract_feedback_particles(
    state: &EngineState,
    poem_body: &str,
    note: &str,
) -> EngineResult<usize> {
    let reply = state
        .generator
        .generate(&prompts::feedback_digest_prompt(poem_body, note), &GenerateOptions::default())
        .await?;
    let count = insert_bullet_particles(
        state,
        &reply,
        ParticleCategory::Feedback,
        STRENGTH_USER_FEEDBACK,
        SOURCE_USER_FEEDBACK,
    )?;
    state.record(
        EVENT_PARTICLE_EXTRACTION,
        json!({ "source": SOURCE_USER_FEEDBACK, "category": "feedback", "count": count }),
    );
    Ok(count)
}

fn log_extraction_failure(state: &EngineState, source: &str, err: &dyn std::fmt::Display) {
    warn!("[particles] Extraction from {} failed: {}", source, err);
    state.record(
        EVENT_PARTICLE_EXTRACTION_ERROR,
        json!({ "source": source, "error": err.to_string() }),
    );
}

/// Fire-and-forget reference digestion.
pub fn spawn_reference_extraction(state: &EngineState, title: &str, body: String) {
    let state = state.clone();
    let title = if title.trim().is_empty() { "untitled" } else { title.trim() };
    let source = format!("reference: {}", title);
    tokio::spawn(async move {
        if let Err(e) =
            extract_particles_from_text(&state, &body, &source, ParticleCategory::Reference).await
        {
            log_extraction_failure(&state, &source, &e);
        }
    });
}

/// Fire-and-forget feedback digestion.
pub fn spawn_feedback_extraction(state: &EngineState, poem_body: String, note: String) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = extract_feedback_particles(&state, &poem_body, &note).await {
            log_extraction_failure(&state, SOURCE_USER_FEEDBACK, &e);
        }
    });
}
