// Poetry Engine — Shared state
// `EngineState` bundles the store, the configuration and the four external
// collaborators. It is cheap to clone (every field is an `Arc`) so background
// tasks take their own copy.

use crate::atoms::error::EngineResult;
use crate::atoms::traits::{Notifier, TextGenerator, WeatherSource, WebSearch};
use crate::engine::config::Config;
use crate::engine::notify::NtfyNotifier;
use crate::engine::providers::OllamaProvider;
use crate::engine::store::{parse_timestamp, AgentStore};
use crate::engine::weather::OpenMeteoWeather;
use crate::engine::web::DuckDuckGoSearch;
use log::warn;
use std::sync::Arc;

#[derive(Clone)]
pub struct EngineState {
    pub store: Arc<AgentStore>,
    pub config: Arc<Config>,
    pub generator: Arc<dyn TextGenerator>,
    pub weather: Arc<dyn WeatherSource>,
    pub search: Arc<dyn WebSearch>,
    pub notifier: Arc<dyn Notifier>,
}

impl EngineState {
    pub fn new(
        store: Arc<AgentStore>,
        config: Arc<Config>,
        generator: Arc<dyn TextGenerator>,
        weather: Arc<dyn WeatherSource>,
        search: Arc<dyn WebSearch>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        EngineState { store, config, generator, weather, search, notifier }
    }

    /// Wire the production collaborators (Ollama, Open-Meteo, DuckDuckGo, ntfy).
    pub fn with_default_collaborators(store: Arc<AgentStore>, config: Config) -> Self {
        let generator = Arc::new(OllamaProvider::new(&config.ollama));
        let weather = Arc::new(OpenMeteoWeather::new(&config.location));
        let search = Arc::new(DuckDuckGoSearch::new(config.search.max_results));
        let notifier = Arc::new(NtfyNotifier::new(&config.ntfy));
        EngineState::new(store, Arc::new(config), generator, weather, search, notifier)
    }

    /// Time elapsed since the latest event of `event_type`.
    /// `None` means the event has never happened, which callers treat as
    /// infinitely long ago.
    pub fn time_since(&self, event_type: &str) -> EngineResult<Option<chrono::Duration>> {
        let last = self.store.last_event(event_type)?;
        Ok(last
            .and_then(|e| parse_timestamp(&e.created_at))
            .map(|at| chrono::Utc::now() - at))
    }

    /// Append to the agent log without failing the caller. Used on paths
    /// where the event is informational and the work itself already happened.
    pub fn record(&self, event_type: &str, detail: serde_json::Value) {
        if let Err(e) = self.store.log_event(event_type, detail) {
            warn!("[store] Failed to log '{}' event: {}", event_type, e);
        }
    }
}

/// `time_since` result compared against an interval: never-happened passes.
pub fn elapsed_exceeds(since: Option<chrono::Duration>, interval: std::time::Duration) -> bool {
    match since {
        None => true,
        Some(d) => d.to_std().map(|d| d > interval).unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn never_happened_always_exceeds() {
        assert!(elapsed_exceeds(None, Duration::from_secs(u64::MAX / 4)));
    }

    #[test]
    fn strict_comparison() {
        let ten = chrono::Duration::seconds(10);
        assert!(!elapsed_exceeds(Some(ten), Duration::from_secs(10)));
        assert!(elapsed_exceeds(Some(ten), Duration::from_secs(9)));
    }

    #[test]
    fn negative_elapsed_never_exceeds() {
        // Clock skew: an event stamped in the future.
        assert!(!elapsed_exceeds(Some(chrono::Duration::seconds(-5)), Duration::ZERO));
    }
}
