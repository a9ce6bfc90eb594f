use std::sync::Arc;
use std::time::Duration;

use ragpipe_core::{Error, RawDocument, Result, ScrapeBackend};
use tracing::{debug, warn};

/// Retry knobs for one URL's fetch. The timeout bounds each attempt, not
/// the URL's lifetime; backoff is fixed, not exponential.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(15),
            backoff: Duration::from_secs(1),
        }
    }
}

/// Fetches page content through a [`ScrapeBackend`] with bounded retries.
///
/// Failure policy: a permanently unsupported source yields a single
/// placeholder document (never retried); exhausting all attempts on
/// transient failures yields an empty set, so one bad source can never
/// abort a batch.
#[derive(Clone)]
pub struct ContentFetcher {
    backend: Arc<dyn ScrapeBackend>,
    policy: RetryPolicy,
}

impl ContentFetcher {
    pub fn new(backend: Arc<dyn ScrapeBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn fetch(&self, url: &str) -> Result<Vec<RawDocument>> {
        let attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(
                self.policy.attempt_timeout,
                self.backend.scrape(url, self.policy.attempt_timeout),
            )
            .await;

            match outcome {
                Ok(Ok(docs)) if !docs.is_empty() => return Ok(docs),
                Ok(Ok(_)) => {
                    debug!(url, attempt, max = attempts, "no documents retrieved");
                }
                Ok(Err(Error::Unsupported(reason))) => {
                    warn!(url, %reason, "source unsupported, keeping placeholder");
                    return Ok(vec![RawDocument::unsupported(url, &reason)]);
                }
                Ok(Err(e)) => {
                    debug!(url, attempt, max = attempts, error = %e, "scrape attempt failed");
                }
                Err(_elapsed) => {
                    debug!(url, attempt, max = attempts, "scrape attempt timed out");
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        warn!(url, attempts, "all scrape attempts exhausted, dropping url");
        Ok(Vec::new())
    }
}
