// Poetry Engine — Text-generation providers
// Each backend implements `TextGenerator`; the rest of the engine only ever
// holds an `Arc<dyn TextGenerator>`.

pub mod ollama;

pub use ollama::OllamaProvider;
