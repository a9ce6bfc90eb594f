use std::time::Duration;
use ragpipe_core::{Error, Result};

pub mod chat;
pub mod chunker;
pub mod embedder;
pub mod fetcher;
pub mod firecrawl;
pub mod index;
pub mod pipeline;
pub mod search;

/// Shared HTTP client for every provider in a run.
///
/// Safety defaults: avoid "hang forever" on DNS/TLS/body stalls. Per-request
/// timeouts can still tighten this further.
pub fn default_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("ragpipe/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::Fetch(e.to_string()))
}

pub(crate) fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `RAGPIPE_*`-prefixed variable with a bare fallback, empty = unset.
pub(crate) fn env_or(primary: &str, fallback: &str) -> Option<String> {
    env_nonempty(primary).or_else(|| env_nonempty(fallback))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::EnvGuard;

    #[test]
    fn env_or_treats_blank_values_as_missing() {
        let _g1 = EnvGuard::set("RAGPIPE_TEST_PRIMARY", "   ");
        let _g2 = EnvGuard::set("RAGPIPE_TEST_FALLBACK", "value");
        assert_eq!(
            env_or("RAGPIPE_TEST_PRIMARY", "RAGPIPE_TEST_FALLBACK").as_deref(),
            Some("value")
        );
    }

    #[test]
    fn env_or_prefers_the_prefixed_name() {
        let _g1 = EnvGuard::set("RAGPIPE_TEST_PRIMARY2", "primary");
        let _g2 = EnvGuard::set("RAGPIPE_TEST_FALLBACK2", "fallback");
        assert_eq!(
            env_or("RAGPIPE_TEST_PRIMARY2", "RAGPIPE_TEST_FALLBACK2").as_deref(),
            Some("primary")
        );
    }
}
