// ── Poetry Atoms: Pure Data Types ──────────────────────────────────────────
// Durable entities (particles, poems, feedback, interests, critiques, voice
// principles, agent events) and the value types exchanged with collaborators.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// Particles
// ═══════════════════════════════════════════════════════════════════════════

/// Where a particle came from. Diversity scoring counts distinct values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParticleCategory {
    Weather,
    Season,
    Interest,
    Reference,
    Feedback,
    Research,
}

impl ParticleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleCategory::Weather => "weather",
            ParticleCategory::Season => "season",
            ParticleCategory::Interest => "interest",
            ParticleCategory::Reference => "reference",
            ParticleCategory::Feedback => "feedback",
            ParticleCategory::Research => "research",
        }
    }
}

impl std::fmt::Display for ParticleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ParticleCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weather" => Ok(ParticleCategory::Weather),
            "season" => Ok(ParticleCategory::Season),
            "interest" => Ok(ParticleCategory::Interest),
            "reference" => Ok(ParticleCategory::Reference),
            "feedback" => Ok(ParticleCategory::Feedback),
            "research" => Ok(ParticleCategory::Research),
            other => Err(format!("unknown particle category '{}'", other)),
        }
    }
}

/// One edge of the connection snapshot stored on a particle.
/// The target may since have decayed away; consumers filter by the active set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ParticleLink {
    pub id: i64,
    pub weight: f64,
}

/// An atomic, decaying unit of observed context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub id: i64,
    pub label: String,
    pub category: ParticleCategory,
    pub content: String,
    pub strength: f64,
    pub source: String,
    pub connections: Vec<ParticleLink>,
    /// Set once a poem has consumed this particle; never cleared.
    pub consumed_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Particle {
    pub fn is_active(&self) -> bool {
        self.consumed_by.is_none() && self.strength > 0.0
    }
}

/// Input for inserting a particle; connections are derived at insert time.
#[derive(Debug, Clone)]
pub struct NewParticle {
    pub label: String,
    pub category: ParticleCategory,
    pub content: String,
    pub strength: f64,
    pub source: String,
}

/// The id/label/category triple frozen into a poem's particle snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticleRef {
    pub id: i64,
    pub label: String,
    pub category: ParticleCategory,
}

impl From<&Particle> for ParticleRef {
    fn from(p: &Particle) -> Self {
        ParticleRef { id: p.id, label: p.label.clone(), category: p.category }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Poems
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Manual,
    Autonomous,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Manual => "manual",
            TriggerKind::Autonomous => "autonomous",
        }
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(TriggerKind::Manual),
            "autonomous" => Ok(TriggerKind::Autonomous),
            other => Err(format!("unknown trigger kind '{}'", other)),
        }
    }
}

/// Reader rating. A poem holds at most one; "no rating" is `Option::None`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Up,
    Down,
    Favorite,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Up => "up",
            Rating::Down => "down",
            Rating::Favorite => "favorite",
        }
    }

    /// Liked ratings feed the "reader enjoyed" half of the preference summary.
    pub fn is_positive(&self) -> bool {
        matches!(self, Rating::Up | Rating::Favorite)
    }

    /// Parse a boundary value. `"none"` (or empty) clears the rating.
    pub fn parse_choice(s: &str) -> Result<Option<Rating>, String> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Some(Rating::Up)),
            "down" => Ok(Some(Rating::Down)),
            "favorite" => Ok(Some(Rating::Favorite)),
            "none" | "" => Ok(None),
            other => Err(format!(
                "invalid rating '{}': expected up, down, favorite or none",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poem {
    pub id: i64,
    pub title: String,
    pub body: String,
    /// Ordered thinking trace; the pipeline writes a one-element list.
    pub thinking: Vec<String>,
    pub particles: Vec<ParticleRef>,
    pub triggered_by: TriggerKind,
    pub weather_context: Option<String>,
    pub season: Option<String>,
    pub time_of_day: Option<String>,
    pub rating: Option<Rating>,
    pub created_at: String,
    pub updated_at: String,
}

/// Everything needed to insert a poem row.
#[derive(Debug, Clone)]
pub struct NewPoem {
    pub title: String,
    pub body: String,
    pub thinking: Vec<String>,
    pub particles: Vec<ParticleRef>,
    pub triggered_by: TriggerKind,
    pub weather_context: Option<String>,
    pub season: Option<String>,
    pub time_of_day: Option<String>,
}

/// Result of one run of the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPoem {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub thinking: String,
    pub particle_count: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// Feedback, references, interests
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub poem_id: i64,
    pub note: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Poem,
    Article,
    Other,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Poem => "poem",
            ReferenceKind::Article => "article",
            ReferenceKind::Other => "other",
        }
    }
}

impl std::str::FromStr for ReferenceKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "poem" => Ok(ReferenceKind::Poem),
            "article" => Ok(ReferenceKind::Article),
            "other" => Ok(ReferenceKind::Other),
            other => Err(format!(
                "invalid source type '{}': expected poem, article or other",
                other
            )),
        }
    }
}

/// A user-supplied text the agent reads and digests into particles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub source_type: ReferenceKind,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
    pub id: i64,
    pub topic: String,
    pub origin: String,
    /// `None` until the research cycle has digested this topic.
    pub research_notes: Option<String>,
    pub strength: f64,
    pub created_at: String,
    pub updated_at: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Reflection
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Critique {
    pub id: i64,
    pub poem_id: i64,
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    pub overall_assessment: String,
    pub created_at: String,
}

/// Parsed (not yet persisted) critique sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CritiqueSections {
    pub strengths: String,
    pub weaknesses: String,
    pub suggestions: String,
    pub overall_assessment: String,
}

/// One version of the agent's self-described aesthetic.
/// Versions form a linear chain through `supersedes_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicePrinciples {
    pub id: i64,
    pub principles: String,
    pub poem_count: i64,
    pub source_poem_ids: Vec<i64>,
    pub supersedes_id: Option<i64>,
    pub created_at: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Event log
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: i64,
    pub event_type: String,
    pub detail: serde_json::Value,
    pub created_at: String,
}

// ═══════════════════════════════════════════════════════════════════════════
// Readiness
// ═══════════════════════════════════════════════════════════════════════════

/// The five readiness inputs, each in [0,1] before weighting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ReadinessComponents {
    pub count: f64,
    pub diversity: f64,
    pub connections: f64,
    pub time_pressure: f64,
    pub randomness: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReadinessWeights {
    pub count: f64,
    pub diversity: f64,
    pub connections: f64,
    pub time_pressure: f64,
    pub randomness: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        ReadinessWeights {
            count: 0.25,
            diversity: 0.25,
            connections: 0.25,
            time_pressure: 0.15,
            randomness: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReadinessBreakdown {
    pub score: f64,
    pub threshold: f64,
    pub components: ReadinessComponents,
    pub weights: ReadinessWeights,
}

// ═══════════════════════════════════════════════════════════════════════════
// Collaborator value types
// ═══════════════════════════════════════════════════════════════════════════

/// Per-call overrides for the text generator.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f64>,
    pub model: Option<String>,
}

impl GenerateOptions {
    pub fn with_temperature(temperature: f64) -> Self {
        GenerateOptions { temperature: Some(temperature), model: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherReport {
    pub description: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// km/h.
    pub wind: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
}

impl WeatherReport {
    /// One-line summary used as poem weather context.
    pub fn context_line(&self) -> String {
        format!(
            "{}, {}C, wind {}km/h, humidity {}%",
            self.description, self.temperature, self.wind, self.humidity
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub description: String,
}
