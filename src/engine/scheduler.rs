// Poetry Engine — Tick scheduler
//
// One `Scheduler` per process. `start` is idempotent: a second call while a
// loop is running is a no-op. Each tick runs these steps in order:
//
//   1. decay                                  every tick
//   2. weather / season particles             fixed intervals
//   3. interest / research                    intervals redrawn each tick
//   4. readiness
//   5. force = time since last poem ≥ max wait
//   6. generate (score > threshold or force) + best-effort notification
//   7. voice reflection when due
//   8. `tick` event
//
// The agent log is the only clock: every gate is "time since the latest
// event of type X". The tick body runs in its own task; an error or panic
// becomes a `tick_error` event and the next tick still fires.

use crate::atoms::constants::{
    EVENT_AUTONOMOUS_POEM, EVENT_INTEREST_ERROR, EVENT_INTEREST_GENERATED,
    EVENT_NOTIFICATION_ERROR, EVENT_POEM_COMPLETE, EVENT_RESEARCH_COMPLETE, EVENT_SEASON_PARTICLES,
    EVENT_TICK, EVENT_TICK_ERROR, EVENT_VOICE_REFLECTION, EVENT_VOICE_REFLECTION_ERROR,
    EVENT_WEATHER_FETCH, NOTIFICATION_BODY_CHARS,
};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{GeneratedPoem, TriggerKind};
use crate::engine::particles::{ingest, run_decay};
use crate::engine::poems::generate_poem;
use crate::engine::readiness::evaluate_readiness;
use crate::engine::reflection::{do_voice_reflection, poems_since_last_reflection, reflection_due};
use crate::engine::research::{do_research, generate_interest};
use crate::engine::state::{elapsed_exceeds, EngineState};
use crate::engine::store::now_timestamp;
use log::{error, info, warn};
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Ticking,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub running: bool,
    pub phase: Phase,
    pub last_tick: Option<String>,
    pub readiness_score: f64,
}

/// What one successful tick did.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub readiness_score: f64,
    pub forced: bool,
    pub poem_id: Option<i64>,
    pub particle_count: usize,
}

pub struct Scheduler {
    state: EngineState,
    running: AtomicBool,
    ticking: AtomicBool,
    last_tick: Mutex<Option<String>>,
    readiness_score: Mutex<f64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Uniform draw in [min_ms, max_ms].
pub fn random_interval(min_ms: u64, max_ms: u64) -> Duration {
    if min_ms >= max_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}

/// Force a poem once the wait since the last one reaches `max_wait`.
/// No poem ever counts as waiting forever.
pub fn force_due(since_last_poem: Option<chrono::Duration>, max_wait: Duration) -> bool {
    match since_last_poem {
        None => true,
        Some(d) => d.to_std().map(|d| d >= max_wait).unwrap_or(false),
    }
}

fn notification_body(body: &str) -> String {
    body.chars().take(NOTIFICATION_BODY_CHARS).collect()
}

/// Best-effort push for a new poem, off the tick's critical path.
fn spawn_notification(state: &EngineState, poem: &GeneratedPoem) {
    let state = state.clone();
    let title = format!("New poem: {}", poem.title);
    let message = notification_body(&poem.body);
    tokio::spawn(async move {
        if let Err(e) = state.notifier.send_notification(&title, &message).await {
            warn!("[notify] {}", e);
            state.record(EVENT_NOTIFICATION_ERROR, json!({ "error": e.to_string() }));
        }
    });
}

/// The tick body. Steps run strictly in sequence.
pub async fn run_tick(state: &EngineState) -> EngineResult<TickReport> {
    let cfg = &state.config;

    run_decay(state)?;

    if elapsed_exceeds(state.time_since(EVENT_WEATHER_FETCH)?, cfg.agent.weather_interval()) {
        ingest::create_weather_particles(state).await?;
    }

    if elapsed_exceeds(state.time_since(EVENT_SEASON_PARTICLES)?, cfg.agent.season_interval()) {
        ingest::create_season_particles(state)?;
    }

    let interest_gate = random_interval(cfg.agent.interest_min_ms, cfg.agent.interest_max_ms);
    if elapsed_exceeds(state.time_since(EVENT_INTEREST_GENERATED)?, interest_gate) {
        if let Err(e) = generate_interest(state).await {
            warn!("[research] Interest generation failed: {}", e);
            state.record(EVENT_INTEREST_ERROR, json!({ "error": e.to_string() }));
        }
    }

    let research_gate = random_interval(cfg.agent.research_min_ms, cfg.agent.research_max_ms);
    if elapsed_exceeds(state.time_since(EVENT_RESEARCH_COMPLETE)?, research_gate) {
        do_research(state).await?;
    }

    let readiness = evaluate_readiness(state)?;
    let forced = force_due(state.time_since(EVENT_POEM_COMPLETE)?, cfg.agent.max_poem_wait());

    let mut poem_id = None;
    if readiness.score > readiness.threshold || forced {
        info!(
            "[scheduler] Writing (score {:.3} vs {:.3}, forced={})",
            readiness.score, readiness.threshold, forced
        );
        // Failures are logged by the pipeline; the tick carries on.
        if let Ok(poem) = generate_poem(state, TriggerKind::Autonomous).await {
            state.record(
                EVENT_AUTONOMOUS_POEM,
                json!({ "poemId": poem.id, "readinessScore": readiness.score, "forced": forced }),
            );
            spawn_notification(state, &poem);
            poem_id = Some(poem.id);
        }
    }

    let poems_since = poems_since_last_reflection(state)?;
    if reflection_due(poems_since, state.time_since(EVENT_VOICE_REFLECTION)?, &cfg.voice) {
        if let Err(e) = do_voice_reflection(state).await {
            warn!("[reflection] Voice reflection failed: {}", e);
            state.record(EVENT_VOICE_REFLECTION_ERROR, json!({ "error": e.to_string() }));
        }
    }

    let particle_count = state.store.count_active_particles()?;
    state.store.log_event(
        EVENT_TICK,
        json!({ "readinessScore": readiness.score, "particleCount": particle_count }),
    )?;

    Ok(TickReport { readiness_score: readiness.score, forced, poem_id, particle_count })
}

impl Scheduler {
    pub fn new(state: EngineState) -> Arc<Self> {
        Arc::new(Scheduler {
            state,
            running: AtomicBool::new(false),
            ticking: AtomicBool::new(false),
            last_tick: Mutex::new(None),
            readiness_score: Mutex::new(0.0),
            handle: Mutex::new(None),
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Start the loop. Returns `false` (and does nothing) if already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("[scheduler] Already running");
            return false;
        }

        let agent = &self.state.config.agent;
        let period = agent.tick_interval();
        let first_delay = agent.first_tick_delay();
        info!("[scheduler] Started, ticking every {}s", period.as_secs());

        let me = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            tokio::time::sleep(first_delay).await;
            me.tick_once().await;

            let mut interval = tokio::time::interval_at(started + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                me.tick_once().await;
            }
        });
        *self.handle.lock() = Some(handle);
        true
    }

    /// Cancel the loop and reset the start guard.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
        self.running.store(false, Ordering::SeqCst);
        self.ticking.store(false, Ordering::SeqCst);
        info!("[scheduler] Stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            running: self.is_running(),
            phase: if self.ticking.load(Ordering::SeqCst) { Phase::Ticking } else { Phase::Idle },
            last_tick: self.last_tick.lock().clone(),
            readiness_score: *self.readiness_score.lock(),
        }
    }

    /// Run one tick now. Errors and panics inside the tick are recorded as
    /// `tick_error` and reported as `None`.
    pub async fn tick_once(&self) -> Option<TickReport> {
        self.ticking.store(true, Ordering::SeqCst);
        *self.last_tick.lock() = Some(now_timestamp());

        let state = self.state.clone();
        let joined = tokio::spawn(async move { run_tick(&state).await }).await;

        let report = match joined {
            Ok(Ok(report)) => {
                *self.readiness_score.lock() = report.readiness_score;
                Some(report)
            }
            Ok(Err(e)) => {
                error!("[scheduler] Tick failed: {}", e);
                self.state.record(EVENT_TICK_ERROR, json!({ "error": e.to_string() }));
                None
            }
            Err(join_err) => {
                error!("[scheduler] Tick panicked: {}", join_err);
                self.state.record(EVENT_TICK_ERROR, json!({ "error": join_err.to_string() }));
                None
            }
        };

        self.ticking.store(false, Ordering::SeqCst);
        report
    }
}
