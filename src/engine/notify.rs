// Poetry Engine — Push notifications via ntfy
// POST {server}/{topic} with the message as the body and the title header.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::Notifier;
use crate::engine::config::NtfyConfig;
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use std::time::Duration;

pub struct NtfyNotifier {
    client: Client,
    config: NtfyConfig,
}

impl NtfyNotifier {
    pub fn new(config: &NtfyConfig) -> Self {
        NtfyNotifier {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            config: config.clone(),
        }
    }

    fn topic_url(&self) -> String {
        format!("{}/{}", self.config.server.trim_end_matches('/'), self.config.topic)
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn send_notification(&self, title: &str, message: &str) -> EngineResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        // Single attempt: delivery is best-effort.
        let response = self
            .client
            .post(self.topic_url())
            .header("Title", title)
            .header("Priority", "3")
            .body(message.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(EngineError::provider(
                "ntfy",
                format!("HTTP {}", response.status().as_u16()),
            ));
        }
        info!("[notify] Sent '{}'", title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_url_joins_cleanly() {
        let n = NtfyNotifier::new(&NtfyConfig {
            enabled: true,
            server: "https://ntfy.example/".into(),
            topic: "verses".into(),
        });
        assert_eq!(n.topic_url(), "https://ntfy.example/verses");
    }

    #[tokio::test]
    async fn disabled_notifier_is_silent_success() {
        let n = NtfyNotifier::new(&NtfyConfig {
            enabled: false,
            server: "http://127.0.0.1:1".into(),
            topic: "x".into(),
        });
        assert!(n.send_notification("t", "m").await.is_ok());
    }
}
