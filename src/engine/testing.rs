// In-process collaborator fakes shared by the engine's unit tests.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Notifier, TextGenerator, TextStream, WeatherSource, WebSearch};
use crate::atoms::types::{
    GenerateOptions, NewParticle, ParticleCategory, SearchResult, WeatherReport,
};
use crate::engine::config::Config;
use crate::engine::particles::insert_with_connections;
use crate::engine::state::EngineState;
use crate::engine::store::AgentStore;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) const POEM_REPLY: &str =
    "THINKING:\nThe fog and the salt belong together.\n\nTITLE:\nHarbor\n\nPOEM:\nThe fog lifts\nfrom the water.";
pub(crate) const CRITIQUE_REPLY: &str = "STRENGTHS:\nQuiet imagery.\n\nWEAKNESSES:\nToo short.\n\n\
SUGGESTIONS:\n- Let the last line breathe\n- Name one concrete object\n\nASSESSMENT:\nA sketch.";
pub(crate) const VOICE_REPLY: &str = "VOICE PRINCIPLES:\n- Stay close to weather\n- Prefer short lines";
pub(crate) const TOPIC_REPLY: &str = "how tides keep time";
pub(crate) const BULLET_REPLY: &str = "- SALT WIND: the sea carried inland\n- LOW TIDE: mud flats shining";

/// Canned reply chosen by the kind of request.
pub(crate) fn routed_reply(prompt: &str) -> &'static str {
    if prompt.contains("STRENGTHS:") {
        CRITIQUE_REPLY
    } else if prompt.contains("VOICE PRINCIPLES:") {
        VOICE_REPLY
    } else if prompt.contains("Respond with just the topic") {
        TOPIC_REPLY
    } else if prompt.contains("LABEL: description") {
        BULLET_REPLY
    } else {
        POEM_REPLY
    }
}

fn is_poem_request(prompt: &str) -> bool {
    prompt.contains("POEM:\n(the poem)")
}

#[derive(Default)]
pub(crate) struct RoutedGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail_poems: AtomicBool,
}

impl RoutedGenerator {
    pub fn poem_requests(&self) -> usize {
        self.prompts.lock().iter().filter(|p| is_poem_request(p)).count()
    }
}

#[async_trait]
impl TextGenerator for RoutedGenerator {
    fn name(&self) -> &str {
        "routed"
    }

    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> EngineResult<String> {
        self.prompts.lock().push(prompt.to_string());
        if is_poem_request(prompt) && self.fail_poems.load(Ordering::SeqCst) {
            return Err(EngineError::provider("routed", "model offline"));
        }
        Ok(routed_reply(prompt).to_string())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> EngineResult<TextStream> {
        let text = self.generate(prompt, options).await?;
        let fragments: Vec<EngineResult<String>> =
            text.split_inclusive('\n').map(|s| Ok(s.to_string())).collect();
        Ok(stream::iter(fragments).boxed())
    }
}

pub(crate) struct FixedWeather(pub Option<WeatherReport>);

pub(crate) fn drizzle() -> WeatherReport {
    WeatherReport { description: "light drizzle".into(), temperature: 9.0, wind: 12.0, humidity: 88.0 }
}

#[async_trait]
impl WeatherSource for FixedWeather {
    async fn fetch_weather(&self) -> EngineResult<WeatherReport> {
        self.0
            .clone()
            .ok_or_else(|| EngineError::provider("weather", "unavailable"))
    }
}

pub(crate) struct FixedSearch(pub Vec<SearchResult>);

#[async_trait]
impl WebSearch for FixedSearch {
    async fn search(&self, _topic: &str) -> EngineResult<Vec<SearchResult>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_notification(&self, title: &str, message: &str) -> EngineResult<()> {
        self.sent.lock().push((title.to_string(), message.to_string()));
        Ok(())
    }
}

pub(crate) struct Harness {
    pub state: EngineState,
    pub generator: Arc<RoutedGenerator>,
    pub notifier: Arc<RecordingNotifier>,
}

/// In-memory engine with fakes: drizzle weather, one search hit.
pub(crate) fn harness(config: Config) -> Harness {
    let generator = Arc::new(RoutedGenerator::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let search = FixedSearch(vec![SearchResult {
        title: "Tide tables".into(),
        description: "The moon pulls the water twice a day.".into(),
    }]);
    let state = EngineState::new(
        Arc::new(AgentStore::open_in_memory().expect("in-memory store")),
        Arc::new(config),
        generator.clone(),
        Arc::new(FixedWeather(Some(drizzle()))),
        Arc::new(search),
        notifier.clone(),
    );
    Harness { state, generator, notifier }
}

pub(crate) fn seed(state: &EngineState, label: &str, category: ParticleCategory, content: &str) -> i64 {
    insert_with_connections(
        &state.store,
        &NewParticle {
            label: label.into(),
            category,
            content: content.into(),
            strength: 0.9,
            source: "test".into(),
        },
    )
    .expect("seed particle")
}

/// Give background tasks a chance to finish.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
