// ── Poetry Atoms: Constants ────────────────────────────────────────────────
// All named constants for the crate live here: event-type keys for the
// agent log, initial particle strengths per ingestion path, and parser bounds.

// ── Agent log event types ──────────────────────────────────────────────────
// The event log is the scheduler's only clock. Renaming any of these keys
// resets the corresponding interval for existing databases.
pub const EVENT_TICK: &str = "tick";
pub const EVENT_TICK_ERROR: &str = "tick_error";
pub const EVENT_DECAY: &str = "decay";
pub const EVENT_WEATHER_FETCH: &str = "weather_fetch";
pub const EVENT_WEATHER_ERROR: &str = "weather_error";
pub const EVENT_SEASON_PARTICLES: &str = "season_particles";
pub const EVENT_INTEREST_GENERATED: &str = "interest_generated";
pub const EVENT_INTEREST_ERROR: &str = "interest_error";
pub const EVENT_RESEARCH_COMPLETE: &str = "research_complete";
pub const EVENT_RESEARCH_EMPTY: &str = "research_empty";
pub const EVENT_RESEARCH_ERROR: &str = "research_error";
pub const EVENT_POEM_START: &str = "poem_generation_start";
pub const EVENT_POEM_COMPLETE: &str = "poem_generation_complete";
pub const EVENT_POEM_ERROR: &str = "poem_generation_error";
pub const EVENT_AUTONOMOUS_POEM: &str = "autonomous_poem";
pub const EVENT_NOTIFICATION_ERROR: &str = "notification_error";
pub const EVENT_SELF_CRITIQUE: &str = "self_critique";
pub const EVENT_SELF_CRITIQUE_ERROR: &str = "self_critique_error";
pub const EVENT_VOICE_REFLECTION: &str = "voice_reflection";
pub const EVENT_VOICE_REFLECTION_ERROR: &str = "voice_reflection_error";
pub const EVENT_PARTICLE_EXTRACTION: &str = "particle_extraction";
pub const EVENT_PARTICLE_EXTRACTION_ERROR: &str = "particle_extraction_error";

// ── Initial particle strengths ─────────────────────────────────────────────
pub(crate) const STRENGTH_WEATHER: f64 = 0.8;
pub(crate) const STRENGTH_SEASON: f64 = 0.6;
pub(crate) const STRENGTH_REFERENCE: f64 = 0.9;
pub(crate) const STRENGTH_USER_FEEDBACK: f64 = 1.0;
pub(crate) const STRENGTH_RESEARCH: f64 = 0.85;
pub(crate) const STRENGTH_SELF_CRITIQUE: f64 = 0.7;

// ── Particle sources ───────────────────────────────────────────────────────
pub(crate) const SOURCE_SYSTEM: &str = "system";
pub(crate) const SOURCE_WEATHER: &str = "open-meteo";
pub(crate) const SOURCE_USER_FEEDBACK: &str = "user-feedback";
pub(crate) const SOURCE_SELF_CRITIQUE: &str = "self-critique";

// ── Response parsing ───────────────────────────────────────────────────────
/// Title used when a response carries no usable title.
pub const UNTITLED: &str = "Untitled";
/// A first line must be shorter than this (in chars) to be promoted to title.
pub(crate) const TITLE_HEURISTIC_MAX_CHARS: usize = 60;
/// Self-critique converts at most this many suggestion bullets into particles.
pub(crate) const MAX_SUGGESTION_PARTICLES: usize = 3;
/// Label length (chars) for particles derived from suggestion text.
pub(crate) const SUGGESTION_LABEL_CHARS: usize = 40;
/// Interest topics at or above this length (chars) are rejected.
pub(crate) const MAX_TOPIC_CHARS: usize = 200;
/// Interest generation needs at least this many active particles.
pub(crate) const MIN_PARTICLES_FOR_INTEREST: usize = 3;

// ── Prompt context sizes ───────────────────────────────────────────────────
pub(crate) const PROMPT_RECENT_FEEDBACK: usize = 5;
pub(crate) const PROMPT_RATED_POEMS: usize = 10;
pub(crate) const PROMPT_INTEREST_PARTICLES: usize = 20;
pub(crate) const REFLECTION_RECENT_POEMS: usize = 10;
pub(crate) const REFLECTION_RECENT_CRITIQUES: usize = 10;
pub(crate) const REFLECTION_RECENT_FEEDBACK: usize = 10;
/// Critique strengths/weaknesses are cut to this many chars in reflection prompts.
pub(crate) const REFLECTION_CRITIQUE_CHARS: usize = 300;

// ── Notifications ──────────────────────────────────────────────────────────
/// Notification bodies carry at most this many chars of the poem.
pub(crate) const NOTIFICATION_BODY_CHARS: usize = 200;
