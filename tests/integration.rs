// End-to-end behaviour of the agent against in-process collaborators.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use poetry_bot::atoms::constants::{
    EVENT_AUTONOMOUS_POEM, EVENT_POEM_COMPLETE, EVENT_TICK, EVENT_TICK_ERROR, EVENT_VOICE_REFLECTION,
};
use poetry_bot::atoms::error::{EngineError, EngineResult};
use poetry_bot::atoms::traits::{Notifier, TextGenerator, TextStream, WeatherSource, WebSearch};
use poetry_bot::atoms::types::{
    GenerateOptions, NewParticle, ParticleCategory, ParticleLink, ReadinessWeights, SearchResult,
    WeatherReport,
};
use poetry_bot::engine::commands;
use poetry_bot::engine::config::Config;
use poetry_bot::engine::readiness::evaluate_readiness;
use poetry_bot::engine::scheduler::Scheduler;
use poetry_bot::engine::state::EngineState;
use poetry_bot::engine::store::AgentStore;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Fakes ──────────────────────────────────────────────────────────────

struct ScriptedModel;

#[async_trait]
impl TextGenerator for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> EngineResult<String> {
        // Yield so concurrent callers interleave the way a slow model would.
        tokio::task::yield_now().await;
        let reply = if prompt.contains("STRENGTHS:") {
            "STRENGTHS:\nClear.\n\nWEAKNESSES:\nFlat.\n\nSUGGESTIONS:\n- Cut the adjectives\n\nASSESSMENT:\nFine."
        } else if prompt.contains("VOICE PRINCIPLES:") {
            "VOICE PRINCIPLES:\n- Plain words"
        } else if prompt.contains("Respond with just the topic") {
            "the migration of eels"
        } else if prompt.contains("LABEL: description") {
            "- SILVER EEL: crossing the dark Atlantic"
        } else {
            "THINKING:\nrain on tin\n\nTITLE:\nTin Roof\n\nPOEM:\nRain counts\nthe hours aloud."
        };
        Ok(reply.to_string())
    }

    async fn generate_stream(&self, prompt: &str, options: &GenerateOptions) -> EngineResult<TextStream> {
        let text = self.generate(prompt, options).await?;
        Ok(stream::iter(vec![Ok(text)]).boxed())
    }
}

/// Panics on the first `panics` calls, then reports rain.
struct FlakyWeather {
    calls: AtomicUsize,
    panics: usize,
}

#[async_trait]
impl WeatherSource for FlakyWeather {
    async fn fetch_weather(&self) -> EngineResult<WeatherReport> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.panics {
            panic!("weather backend exploded");
        }
        Ok(WeatherReport { description: "rain".into(), temperature: 11.0, wind: 5.0, humidity: 90.0 })
    }
}

struct OneHitSearch;

#[async_trait]
impl WebSearch for OneHitSearch {
    async fn search(&self, _topic: &str) -> EngineResult<Vec<SearchResult>> {
        Ok(vec![SearchResult { title: "Eels".into(), description: "They spawn in the Sargasso Sea.".into() }])
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<String>>);

#[async_trait]
impl Notifier for Inbox {
    async fn send_notification(&self, title: &str, _message: &str) -> EngineResult<()> {
        self.0.lock().push(title.to_string());
        Ok(())
    }
}

struct Offline;

#[async_trait]
impl Notifier for Offline {
    async fn send_notification(&self, _title: &str, _message: &str) -> EngineResult<()> {
        Err(EngineError::provider("ntfy", "unreachable"))
    }
}

fn engine(config: Config, weather_panics: usize, notifier: Arc<dyn Notifier>) -> EngineState {
    EngineState::new(
        Arc::new(AgentStore::open_in_memory().unwrap()),
        Arc::new(config),
        Arc::new(ScriptedModel),
        Arc::new(FlakyWeather { calls: AtomicUsize::new(0), panics: weather_panics }),
        Arc::new(OneHitSearch),
        notifier,
    )
}

fn particle(label: &str, category: ParticleCategory) -> NewParticle {
    NewParticle {
        label: label.into(),
        category,
        content: format!("{} in the evening", label),
        strength: 0.9,
        source: "test".into(),
    }
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

// ── Scheduler ──────────────────────────────────────────────────────────

#[tokio::test]
async fn forced_tick_writes_when_max_wait_has_passed() {
    let mut config = Config::default();
    config.readiness.weights = ReadinessWeights {
        count: 0.0,
        diversity: 0.0,
        connections: 0.0,
        time_pressure: 1.0,
        randomness: 0.0,
    };
    let inbox = Arc::new(Inbox::default());
    let state = engine(config, 0, inbox.clone());
    let store = &state.store;

    // Six particles over three categories with eight live links.
    let cats = [ParticleCategory::Weather, ParticleCategory::Season, ParticleCategory::Reference];
    let link_counts = [0, 1, 2, 2, 2, 1];
    let mut ids: Vec<i64> = Vec::new();
    for (i, n) in link_counts.iter().enumerate() {
        let links: Vec<ParticleLink> =
            ids.iter().rev().take(*n).map(|&id| ParticleLink { id, weight: 1.0 }).collect();
        ids.push(store.insert_particle(&particle(&format!("p{}", i), cats[i % 3]), &links).unwrap());
    }
    let active = store.active_particles().unwrap();
    assert_eq!(poetry_bot::engine::readiness::live_connection_count(&active), 8);
    let max_wait = chrono::Duration::milliseconds(state.config.agent.max_poem_wait_ms as i64);
    store
        .log_event_at(EVENT_POEM_COMPLETE, json!({}), chrono::Utc::now() - max_wait)
        .unwrap();

    let readiness = evaluate_readiness(&state).unwrap();
    assert_eq!(readiness.components.time_pressure, 1.0);
    assert_eq!(readiness.score, 1.0);

    let scheduler = Scheduler::new(state.clone());
    let report = scheduler.tick_once().await.expect("tick succeeds");
    assert!(report.forced);
    let poem_id = report.poem_id.expect("poem written");

    for id in &ids {
        assert_eq!(store.get_particle(*id).unwrap().unwrap().consumed_by, Some(poem_id));
    }
    assert!(store.active_particles().unwrap().iter().all(|p| !ids.contains(&p.id)));
    assert_eq!(store.count_events(EVENT_AUTONOMOUS_POEM).unwrap(), 1);
    assert_eq!(store.count_events(EVENT_TICK).unwrap(), 1);
    assert_eq!(scheduler.snapshot().readiness_score, report.readiness_score);

    settle().await;
    assert_eq!(inbox.0.lock().as_slice(), ["New poem: Tin Roof"]);
}

#[tokio::test]
async fn reflection_skipped_without_new_poems() {
    let mut config = Config::default();
    config.readiness.score_threshold = 2.0;
    let state = engine(config, 0, Arc::new(Inbox::default()));
    let store = &state.store;

    store.insert_voice_principles("- Be brief", 0, &[], None).unwrap();
    store
        .log_event_at(EVENT_VOICE_REFLECTION, json!({}), chrono::Utc::now() - chrono::Duration::days(30))
        .unwrap();
    store.log_event(EVENT_POEM_COMPLETE, json!({})).unwrap();

    let scheduler = Scheduler::new(state.clone());
    let report = scheduler.tick_once().await.expect("tick succeeds");
    assert!(!report.forced);
    assert_eq!(report.poem_id, None);
    assert_eq!(store.count_events(EVENT_VOICE_REFLECTION).unwrap(), 1);
    assert_eq!(store.voice_history(10).unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent() {
    let state = engine(Config::default(), 0, Arc::new(Inbox::default()));
    let scheduler = Scheduler::new(state.clone());

    assert!(scheduler.start());
    assert!(!scheduler.start());
    assert!(scheduler.is_running());

    // Ticks at 5s, 300s and 600s.
    tokio::time::sleep(Duration::from_secs(606)).await;
    assert_eq!(state.store.count_events(EVENT_TICK).unwrap(), 3);

    scheduler.stop();
    assert!(!scheduler.is_running());
    tokio::time::sleep(Duration::from_secs(900)).await;
    assert_eq!(state.store.count_events(EVENT_TICK).unwrap(), 3);

    assert!(scheduler.start());
    scheduler.stop();
}

#[tokio::test]
async fn panicking_tick_is_recorded_and_the_next_tick_runs() {
    let state = engine(Config::default(), 1, Arc::new(Offline));
    let scheduler = Scheduler::new(state.clone());

    assert!(scheduler.tick_once().await.is_none());
    assert_eq!(state.store.count_events(EVENT_TICK_ERROR).unwrap(), 1);

    let report = scheduler.tick_once().await.expect("second tick succeeds");
    assert!(report.forced);
    assert_eq!(state.store.count_events(EVENT_TICK).unwrap(), 1);

    // Notification failure is logged, never surfaced.
    settle().await;
    assert_eq!(state.store.count_events("notification_error").unwrap(), 1);
}

// ── Generation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_triggers_never_double_consume() {
    let state = engine(Config::default(), 0, Arc::new(Inbox::default()));
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(state.store.insert_particle(&particle(&format!("q{}", i), ParticleCategory::Interest), &[]).unwrap());
    }

    let (a, b) = tokio::join!(commands::agent_trigger(&state), commands::agent_trigger(&state));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.id, b.id);

    let by_a: HashSet<i64> = state.store.particles_for_poem(a.id).unwrap().iter().map(|p| p.id).collect();
    let by_b: HashSet<i64> = state.store.particles_for_poem(b.id).unwrap().iter().map(|p| p.id).collect();
    assert!(by_a.is_disjoint(&by_b));
    for id in ids {
        let owner = state.store.get_particle(id).unwrap().unwrap().consumed_by;
        assert!(owner == Some(a.id) || owner == Some(b.id));
    }
}

#[tokio::test]
async fn sparse_particles_score_zero() {
    let state = engine(Config::default(), 0, Arc::new(Inbox::default()));
    for i in 0..4 {
        state.store.insert_particle(&particle(&format!("r{}", i), ParticleCategory::Research), &[]).unwrap();
    }
    let overview = commands::particles_list(&state).unwrap();
    assert_eq!(overview.particles.len(), 4);
    assert_eq!(overview.readiness.score, 0.0);
    assert_eq!(overview.readiness.components.time_pressure, 0.0);
}
