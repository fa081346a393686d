//! HTTP health probes for feed URLs
//!
//! A probe is a HEAD request following redirects; any status below 400
//! counts as available. Timeouts and connection errors are retried a
//! bounded number of times with jittered exponential backoff; HTTP error
//! statuses are an answer, not a transient fault, so they are not retried.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use feedvault_core::SourceRecord;

/// Jitter added to each backoff delay, in milliseconds
const BACKOFF_JITTER_MS: u64 = 250;

/// Health probe configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt, for transient failures only
    pub max_retries: u32,
    /// Base backoff delay in milliseconds, doubled per retry
    pub backoff_ms: u64,
    /// Worker cap for the probe fan-out
    pub max_concurrent: usize,
    /// User-Agent header sent with every probe
    pub user_agent: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            backoff_ms: 500,
            max_concurrent: 8,
            user_agent: format!("feedvault/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Errors from probe setup
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Outcome of probing one feed URL
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Reachable with a non-error status
    pub available: bool,
    /// HTTP status, when a response arrived at all
    pub status_code: Option<u16>,
    /// Wall time of the successful attempt
    pub response_time_ms: Option<u64>,
    /// What went wrong, when nothing arrived
    pub error: Option<String>,
}

impl HealthReport {
    fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            status_code: None,
            response_time_ms: None,
            error: Some(error.into()),
        }
    }
}

/// Build the shared probe client
pub fn create_client(config: &HealthConfig) -> Result<Client, HealthError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| HealthError::ClientBuild(e.to_string()))
}

/// Backoff delay before retry number `attempt` (0-based)
fn backoff_delay(config: &HealthConfig, attempt: u32) -> Duration {
    use rand::Rng;
    let base = config.backoff_ms.saturating_mul(1 << attempt.min(16));
    let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
    Duration::from_millis(base + jitter)
}

/// Transient faults are worth retrying; anything else is an answer
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Probe a single URL, retrying transient failures
pub async fn probe_url(client: &Client, url: &str, config: &HealthConfig) -> HealthReport {
    let mut attempt = 0;
    loop {
        let start = Instant::now();
        match client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                let available = status.as_u16() < 400;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                if available {
                    debug!("probe of {url}: HTTP {status} in {elapsed_ms}ms");
                } else {
                    debug!("probe of {url} returned HTTP {status}");
                }
                return HealthReport {
                    available,
                    status_code: Some(status.as_u16()),
                    response_time_ms: Some(elapsed_ms),
                    error: None,
                };
            }
            Err(e) if is_transient(&e) && attempt < config.max_retries => {
                let delay = backoff_delay(config, attempt);
                debug!(
                    "transient probe failure for {url} (attempt {}): {e}, retrying in {:?}",
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_timeout() => {
                warn!("probe of {url} timed out after {}s", config.timeout_secs);
                return HealthReport::unavailable(format!(
                    "timeout after {}s",
                    config.timeout_secs
                ));
            }
            Err(e) => {
                warn!("probe of {url} failed: {e}");
                return HealthReport::unavailable(format!("request error: {e}"));
            }
        }
    }
}

/// Probe one record's URL
///
/// A record with a blank URL reports unavailable; that is a data problem
/// for validation to flag, not a failure of the run.
pub async fn probe_source(
    client: &Client,
    record: &SourceRecord,
    config: &HealthConfig,
) -> HealthReport {
    if record.url.trim().is_empty() {
        debug!("no URL for source {}", record.id);
        return HealthReport::unavailable("no URL provided");
    }
    probe_url(client, &record.url, config).await
}

/// Probe every record concurrently, bounded by the worker cap
///
/// Returns (id, report) pairs with no ordering guarantee.
pub async fn probe_all(
    records: &[SourceRecord],
    config: &HealthConfig,
) -> Result<Vec<(String, HealthReport)>, HealthError> {
    let client = create_client(config)?;

    let reports = stream::iter(records)
        .map(|record| {
            let client = client.clone();
            let config = config.clone();
            async move {
                let report = probe_source(&client, record, &config).await;
                (record.id.clone(), report)
            }
        })
        .buffer_unordered(config.max_concurrent.max(1))
        .collect()
        .await;

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HealthConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 2);
        assert!(config.user_agent.starts_with("feedvault/"));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let config = HealthConfig {
            backoff_ms: 500,
            ..HealthConfig::default()
        };
        let first = backoff_delay(&config, 0);
        let third = backoff_delay(&config, 2);

        assert!(first >= Duration::from_millis(500));
        assert!(first < Duration::from_millis(500 + BACKOFF_JITTER_MS));
        assert!(third >= Duration::from_millis(2000));
        assert!(third < Duration::from_millis(2000 + BACKOFF_JITTER_MS));
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_retries() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept connections but never respond, so every attempt times out
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(stream);
                });
            }
        });

        let config = HealthConfig {
            timeout_secs: 1,
            max_retries: 2,
            backoff_ms: 10,
            ..HealthConfig::default()
        };
        let client = create_client(&config).unwrap();
        let report = probe_url(&client, &format!("http://{addr}/feed"), &config).await;

        assert!(!report.available);
        assert_eq!(report.error.as_deref(), Some("timeout after 1s"));
        // First attempt plus max_retries, then the probe gives up
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_blank_url_reports_unavailable() {
        let mut record = blank_record();
        record.url = "   ".to_string();

        let client = create_client(&HealthConfig::default()).unwrap();
        let report = probe_source(&client, &record, &HealthConfig::default()).await;
        assert!(!report.available);
        assert_eq!(report.error.as_deref(), Some("no URL provided"));
        assert!(report.status_code.is_none());
    }

    fn blank_record() -> SourceRecord {
        serde_json::from_value(serde_json::json!({
            "id": "feed-a",
            "name": "Feed A",
            "url": "",
            "category": "malware",
            "format": "json"
        }))
        .unwrap()
    }
}
