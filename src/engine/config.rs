// Poetry Engine — Configuration
//
// Every section derives `Default` and is tagged `#[serde(default)]`, so a
// partial TOML file deep-merges over the built-in values: any key the user
// omits keeps its default, at any nesting depth.
//
// Durations are stored as milliseconds (matching the on-disk keys) and exposed
// through `Duration` accessors.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::ReadinessWeights;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub ollama: OllamaConfig,
    pub agent: AgentConfig,
    pub readiness: ReadinessConfig,
    pub particles: ParticleConfig,
    pub voice: VoiceConfig,
    pub ntfy: NtfyConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub lat: f64,
    pub lon: f64,
    /// IANA timezone name, e.g. "Europe/Lisbon".
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig { lat: 40.7128, lon: -74.006, timezone: "America/New_York".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub temperature: f64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            url: "http://localhost:11434".into(),
            model: "gemma3:4b".into(),
            temperature: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub tick_interval_ms: u64,
    /// Delay before the first tick so collaborators can finish starting up.
    pub first_tick_delay_ms: u64,
    pub weather_interval_ms: u64,
    pub season_interval_ms: u64,
    pub interest_min_ms: u64,
    pub interest_max_ms: u64,
    pub research_min_ms: u64,
    pub research_max_ms: u64,
    pub max_poem_wait_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            tick_interval_ms: 300_000,
            first_tick_delay_ms: 5_000,
            weather_interval_ms: 1_800_000,
            season_interval_ms: 3_600_000,
            interest_min_ms: 7_200_000,
            interest_max_ms: 21_600_000,
            research_min_ms: 3_600_000,
            research_max_ms: 14_400_000,
            max_poem_wait_ms: 86_400_000,
        }
    }
}

impl AgentConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn first_tick_delay(&self) -> Duration {
        Duration::from_millis(self.first_tick_delay_ms)
    }

    pub fn max_poem_wait(&self) -> Duration {
        Duration::from_millis(self.max_poem_wait_ms)
    }

    pub fn weather_interval(&self) -> Duration {
        Duration::from_millis(self.weather_interval_ms)
    }

    pub fn season_interval(&self) -> Duration {
        Duration::from_millis(self.season_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub score_threshold: f64,
    pub min_particles: usize,
    pub weights: ReadinessWeights,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            score_threshold: 0.7,
            min_particles: 5,
            weights: ReadinessWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub decay_half_life_ms: u64,
    pub min_strength: f64,
    /// Upper bound on the active population; the weakest excess is pruned.
    pub max_count: usize,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        ParticleConfig { decay_half_life_ms: 43_200_000, min_strength: 0.05, max_count: 200 }
    }
}

impl ParticleConfig {
    pub fn decay_half_life(&self) -> Duration {
        Duration::from_millis(self.decay_half_life_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub reflect_every_n_poems: i64,
    pub reflect_max_wait_ms: u64,
    pub critique_temperature: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            reflect_every_n_poems: 5,
            reflect_max_wait_ms: 604_800_000,
            critique_temperature: 0.6,
        }
    }
}

impl VoiceConfig {
    pub fn reflect_max_wait(&self) -> Duration {
        Duration::from_millis(self.reflect_max_wait_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NtfyConfig {
    pub enabled: bool,
    pub server: String,
    pub topic: String,
}

impl Default for NtfyConfig {
    fn default() -> Self {
        NtfyConfig { enabled: true, server: "https://ntfy.sh".into(), topic: "poetry-bot".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig { path: "data/poetry-bot.db".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { max_results: 5 }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults; an unreadable or malformed file is a startup error.
    pub fn load(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            info!("[config] {} not found — using defaults", path.display());
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        info!("[config] Loaded {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> EngineResult<Self> {
        let config: Config = toml::from_str(raw).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> EngineResult<()> {
        let a = &self.agent;
        if a.tick_interval_ms == 0 {
            return Err(EngineError::Config("agent.tick_interval_ms must be > 0".into()));
        }
        if a.interest_min_ms > a.interest_max_ms {
            return Err(EngineError::Config(
                "agent.interest_min_ms must not exceed agent.interest_max_ms".into(),
            ));
        }
        if a.research_min_ms > a.research_max_ms {
            return Err(EngineError::Config(
                "agent.research_min_ms must not exceed agent.research_max_ms".into(),
            ));
        }
        if self.particles.decay_half_life_ms == 0 {
            return Err(EngineError::Config("particles.decay_half_life_ms must be > 0".into()));
        }
        Ok(())
    }
}
