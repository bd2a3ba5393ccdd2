// Poetry Engine — Ollama provider
// Talks to a local (or remote) Ollama server over `/api/generate`.
//   blocking  — `stream: false`, full text in the `response` field
//   streaming — `stream: true`, newline-delimited JSON objects, one fragment
//               per line, terminated by an object with `done: true`

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{TextGenerator, TextStream};
use crate::atoms::types::GenerateOptions;
use crate::engine::config::OllamaConfig;
use crate::engine::http::{send_with_retry, CircuitBreaker};
use async_trait::async_trait;
use futures::StreamExt;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Circuit breaker shared across all Ollama requests.
static OLLAMA_CIRCUIT: LazyLock<CircuitBreaker> = LazyLock::new(|| CircuitBreaker::new(5, 60));

/// Buffered fragments between the reader task and the consumer.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// One object of the `/api/generate` reply (whole reply or one NDJSON line).
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Self {
        OllamaProvider {
            // No total timeout: long generations are expected.
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    fn request_body(&self, prompt: &str, options: &GenerateOptions, stream: bool) -> serde_json::Value {
        json!({
            "model": options.model.as_deref().unwrap_or(&self.model),
            "prompt": prompt,
            "stream": stream,
            "options": { "temperature": options.temperature.unwrap_or(self.temperature) },
        })
    }

    async fn post(&self, body: &serde_json::Value) -> EngineResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);
        send_with_retry(&OLLAMA_CIRCUIT, "ollama", || self.client.post(&url).json(body)).await
    }
}

/// Decode one NDJSON line from raw bytes. Blank lines yield `None`.
fn decode_line(line: &[u8]) -> Option<EngineResult<GenerateChunk>> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(
        serde_json::from_slice::<GenerateChunk>(line)
            .map_err(EngineError::from)
            .and_then(|chunk| match chunk.error {
                Some(err) => Err(EngineError::provider("ollama", err)),
                None => Ok(chunk),
            }),
    )
}

/// Reassembles NDJSON lines from arbitrarily split network chunks. Bytes are
/// only decoded once a whole line is present, so a multi-byte character cut
/// across two chunks survives intact.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and decode every line it completes.
    fn push(&mut self, bytes: &[u8]) -> Vec<EngineResult<GenerateChunk>> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.extend(decode_line(&line));
        }
        lines
    }

    /// Decode whatever is left once the body ends without a final newline.
    fn finish(&mut self) -> Option<EngineResult<GenerateChunk>> {
        decode_line(&std::mem::take(&mut self.pending))
    }
}

/// Hand one decoded line to the consumer. Returns `false` once the stream is
/// over: a `done` object, an error, or a dropped receiver.
async fn forward(tx: &mpsc::Sender<EngineResult<String>>, decoded: EngineResult<GenerateChunk>) -> bool {
    match decoded {
        Ok(part) => {
            if !part.response.is_empty() && tx.send(Ok(part.response)).await.is_err() {
                return false;
            }
            !part.done
        }
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> EngineResult<String> {
        info!("[ollama] generate model={} prompt_chars={}", self.model, prompt.len());
        let body = self.request_body(prompt, options, false);
        let response = self.post(&body).await?;
        let chunk: GenerateChunk = response.json().await?;
        if let Some(err) = chunk.error {
            return Err(EngineError::provider("ollama", err));
        }
        Ok(chunk.response)
    }

    async fn generate_stream(&self, prompt: &str, options: &GenerateOptions) -> EngineResult<TextStream> {
        info!("[ollama] stream model={} prompt_chars={}", self.model, prompt.len());
        let body = self.request_body(prompt, options, true);
        let response = self.post(&body).await?;

        let (tx, rx) = mpsc::channel::<EngineResult<String>>(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(EngineError::Network(e))).await;
                        return;
                    }
                };
                for decoded in lines.push(&chunk) {
                    if !forward(&tx, decoded).await {
                        return;
                    }
                }
            }

            if let Some(decoded) = lines.finish() {
                if decoded.is_err() {
                    warn!("[ollama] Stream ended on an undecodable or error line");
                }
                forward(&tx, decoded).await;
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}
