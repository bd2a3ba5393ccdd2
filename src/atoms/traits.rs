// ── Poetry Atoms: Collaborator Traits ──────────────────────────────────────
// The narrow contracts the core consumes. Concrete implementations live in
// engine/ (Ollama, Open-Meteo, DuckDuckGo, ntfy); tests supply in-process
// fakes. Every method is fallible; callers decide whether a failure is fatal.

use crate::atoms::error::EngineResult;
use crate::atoms::types::{GenerateOptions, SearchResult, WeatherReport};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

/// A finite, non-restartable sequence of generated text fragments.
pub type TextStream = BoxStream<'static, EngineResult<String>>;

/// Text generation endpoint (local or remote).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Request/response generation. Returns the full response text.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> EngineResult<String>;

    /// Streaming generation. The default delivers the blocking result as a
    /// single fragment, which keeps simple backends and fakes honest.
    async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> EngineResult<TextStream> {
        let text = self.generate(prompt, options).await?;
        Ok(stream::once(async move { Ok(text) }).boxed())
    }
}

/// Current conditions at the configured location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_weather(&self) -> EngineResult<WeatherReport>;
}

/// External web search. An empty result list is a valid outcome.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, topic: &str) -> EngineResult<Vec<SearchResult>>;
}

/// Best-effort push notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(&self, title: &str, message: &str) -> EngineResult<()>;
}
