// Shared request plumbing for the Ollama, Open-Meteo, DuckDuckGo and ntfy
// clients. Transient failures are retried on a doubling delay; a service
// that keeps failing is short-circuited for a while.
//
// There is no whole-request timeout: a slow generation simply takes as long
// as the transport allows.

use crate::atoms::error::{EngineError, EngineResult};
use log::warn;
use rand::Rng;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// How many times, and how patiently, a request is re-sent.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub first_delay_ms: u64,
    pub ceiling_ms: u64,
    /// Upper bound on a server's `Retry-After`.
    pub retry_after_limit_secs: u64,
}

pub const DEFAULT_POLICY: RetryPolicy = RetryPolicy {
    retries: 3,
    first_delay_ms: 1_000,
    ceiling_ms: 30_000,
    retry_after_limit_secs: 60,
};

const MIN_DELAY_MS: u64 = 100;

impl RetryPolicy {
    /// Un-jittered wait before re-send number `nth` (0-based).
    fn delay_ms(&self, nth: u32, retry_after: Option<u64>) -> u64 {
        let doubled = self
            .first_delay_ms
            .saturating_mul(2u64.saturating_pow(nth))
            .min(self.ceiling_ms);
        retry_after
            .map(|secs| (secs.min(self.retry_after_limit_secs) * 1000).max(doubled))
            .unwrap_or(doubled)
    }
}

/// Spread `ms` by up to a quarter either way.
fn spread(ms: u64) -> u64 {
    let quarter = (ms / 4) as i64;
    let offset = if quarter == 0 {
        0
    } else {
        rand::rng().random_range(-quarter..=quarter)
    };
    (ms as i64 + offset).max(MIN_DELAY_MS as i64) as u64
}

fn worth_retrying(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504 | 529)
}

/// Seconds form of `Retry-After`; HTTP dates are ignored.
fn retry_after_secs(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Per-service failure counter. Once `limit` failures in a row pile up, calls
/// are refused for `pause_secs`; the next call after that goes through.
pub struct CircuitBreaker {
    failures: AtomicU32,
    opened_at: AtomicU64,
    limit: u32,
    pause_secs: u64,
}

impl CircuitBreaker {
    pub const fn new(limit: u32, pause_secs: u64) -> Self {
        Self {
            failures: AtomicU32::new(0),
            opened_at: AtomicU64::new(0),
            limit,
            pause_secs,
        }
    }

    fn admit(&self, service: &str) -> EngineResult<()> {
        let failures = self.failures.load(Ordering::Relaxed);
        if failures < self.limit {
            return Ok(());
        }
        let waited = now_secs().saturating_sub(self.opened_at.load(Ordering::Relaxed));
        match self.pause_secs.checked_sub(waited) {
            Some(left) if left > 0 => Err(EngineError::provider(
                service,
                format!("{} failed {} times in a row; paused for another {}s", service, failures, left),
            )),
            _ => Ok(()),
        }
    }

    fn succeeded(&self) {
        self.failures.store(0, Ordering::Relaxed);
        self.opened_at.store(0, Ordering::Relaxed);
    }

    fn failed(&self, service: &str) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.limit {
            self.opened_at.store(now_secs(), Ordering::Relaxed);
            warn!(
                "[http] {} paused for {}s after {} failures",
                service, self.pause_secs, failures
            );
        }
    }
}

/// Send whatever `build` produces under [`DEFAULT_POLICY`]. `build` runs once
/// per attempt since sending consumes the builder. The successful response
/// is handed back unread so streaming callers can take the body as it comes.
pub async fn send_with_retry<F>(
    breaker: &CircuitBreaker,
    service: &str,
    build: F,
) -> EngineResult<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    send_with_policy(&DEFAULT_POLICY, breaker, service, build).await
}

pub async fn send_with_policy<F>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    service: &str,
    build: F,
) -> EngineResult<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    breaker.admit(service)?;

    let mut server_wait: Option<u64> = None;
    let mut failure = String::new();

    for attempt in 0..=policy.retries {
        if attempt > 0 {
            let wait = Duration::from_millis(spread(policy.delay_ms(attempt - 1, server_wait.take())));
            warn!(
                "[http] {}: {} (attempt {} of {} in {}ms)",
                service,
                failure,
                attempt + 1,
                policy.retries + 1,
                wait.as_millis()
            );
            tokio::time::sleep(wait).await;
        }

        let response = match build().send().await {
            Ok(response) => response,
            Err(e) => {
                breaker.failed(service);
                failure = format!("request failed: {}", e);
                continue;
            }
        };

        let status = response.status();
        if status.is_success() {
            breaker.succeeded();
            return Ok(response);
        }

        server_wait = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(retry_after_secs);
        let body = response.text().await.unwrap_or_default();
        failure = format!("HTTP {}: {}", status.as_u16(), body.chars().take(200).collect::<String>());
        breaker.failed(service);

        if !worth_retrying(status.as_u16()) {
            break;
        }
    }

    Err(EngineError::provider(service, failure))
}
