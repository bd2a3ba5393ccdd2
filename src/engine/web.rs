// Poetry Engine — Web search (DuckDuckGo HTML endpoint, no API key)
// Returns title + snippet pairs for the research cycle.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::WebSearch;
use crate::atoms::types::SearchResult;
use crate::engine::http::{send_with_retry, CircuitBreaker};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static SEARCH_CIRCUIT: LazyLock<CircuitBreaker> = LazyLock::new(|| CircuitBreaker::new(3, 300));

static RESULT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result").expect("static selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__a").expect("static selector"));
static SNIPPET_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").expect("static selector"));

pub struct DuckDuckGoSearch {
    client: Client,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(max_results: usize) -> Self {
        DuckDuckGoSearch {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            max_results,
        }
    }
}

fn element_text(el: scraper::ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel)
        .next()
        .map(|e| e.text().collect::<String>())
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract up to `limit` results from a DuckDuckGo HTML results page.
/// Entries without a title are skipped.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_SEL)
        .filter_map(|el| {
            let title = element_text(el, &TITLE_SEL);
            if title.is_empty() {
                return None;
            }
            Some(SearchResult { title, description: element_text(el, &SNIPPET_SEL) })
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, topic: &str) -> EngineResult<Vec<SearchResult>> {
        let url = url::Url::parse_with_params(SEARCH_URL, &[("q", topic)])
            .map_err(|e| EngineError::Other(e.to_string()))?;
        let response =
            send_with_retry(&SEARCH_CIRCUIT, "duckduckgo", || self.client.get(url.clone())).await?;
        let html = response.text().await?;
        let results = parse_results(&html, self.max_results);
        info!("[web] search '{}' → {} results", topic, results.len());
        Ok(results)
    }
}
