use std::time::Duration;

use ragpipe_core::{Error, RawDocument, Result, ScrapeBackend};
use serde::Deserialize;

use crate::env_or;

fn firecrawl_api_key_from_env() -> Option<String> {
    env_or("RAGPIPE_FIRECRAWL_API_KEY", "FIRECRAWL_API_KEY")
}

/// Firecrawl rejects some site classes outright ("this website is no longer
/// supported"). That is a permanent condition, not a transport hiccup, and
/// the retry layer must be able to tell the two apart.
fn is_unsupported_message(msg: &str) -> bool {
    let m = msg.to_ascii_lowercase();
    m.contains("not supported") || m.contains("no longer supported")
}

#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: reqwest::Client,
    api_key: String,
}

impl FirecrawlClient {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = firecrawl_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured(
                "missing RAGPIPE_FIRECRAWL_API_KEY (or FIRECRAWL_API_KEY)".to_string(),
            )
        })?;
        Ok(Self { client, api_key })
    }

    fn endpoint() -> String {
        // Default: upstream Firecrawl v2 scrape endpoint. Overridable for
        // tests / enterprise proxies.
        crate::env_nonempty("RAGPIPE_FIRECRAWL_ENDPOINT")
            .unwrap_or_else(|| "https://api.firecrawl.dev/v2/scrape".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeResponse {
    success: bool,
    #[serde(default)]
    data: Option<FirecrawlScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<FirecrawlScrapeMetadata>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
}

#[async_trait::async_trait]
impl ScrapeBackend for FirecrawlClient {
    async fn scrape(&self, url: &str, timeout: Duration) -> Result<Vec<RawDocument>> {
        let body = serde_json::json!({
            "url": url,
            "formats": ["markdown"],
            "onlyMainContent": true,
            "timeout": timeout.as_millis() as u64,
        });

        let resp = self
            .client
            .post(Self::endpoint())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            // The unsupported-site rejection arrives as an HTTP error whose
            // body names the condition; everything else is transient.
            let text = resp.text().await.unwrap_or_default();
            if is_unsupported_message(&text) {
                return Err(Error::Unsupported(format!(
                    "{url}: website not supported by firecrawl"
                )));
            }
            return Err(Error::Fetch(format!("firecrawl scrape HTTP {status}")));
        }

        let parsed: FirecrawlScrapeResponse =
            resp.json().await.map_err(|e| Error::Fetch(e.to_string()))?;
        if !parsed.success {
            let reason = parsed.error.unwrap_or_default();
            if is_unsupported_message(&reason) {
                return Err(Error::Unsupported(format!(
                    "{url}: website not supported by firecrawl"
                )));
            }
            return Err(Error::Fetch(format!(
                "firecrawl scrape returned success=false: {reason}"
            )));
        }

        let data = parsed.data.unwrap_or(FirecrawlScrapeData {
            markdown: None,
            metadata: None,
        });
        let markdown = data.markdown.unwrap_or_default();
        if markdown.trim().is_empty() {
            // A successful call with no content counts as an empty attempt;
            // the caller decides whether to retry.
            return Ok(Vec::new());
        }

        let mut doc = RawDocument::new(url, markdown);
        if let Some(title) = data.metadata.and_then(|m| m.title) {
            doc.metadata.insert("title".to_string(), title);
        }
        Ok(vec![doc])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::EnvGuard;

    #[test]
    fn empty_api_key_is_treated_as_missing() {
        let _g1 = EnvGuard::set("RAGPIPE_FIRECRAWL_API_KEY", "");
        let _g2 = EnvGuard::unset("FIRECRAWL_API_KEY");
        assert!(firecrawl_api_key_from_env().is_none());
    }

    #[test]
    fn parses_minimal_scrape_response_shape() {
        let js = r##"
        { "success": true, "data": { "markdown": "# Hi", "metadata": { "title": "Hi" } } }
        "##;
        let parsed: FirecrawlScrapeResponse = serde_json::from_str(js).unwrap();
        assert!(parsed.success);
        let data = parsed.data.unwrap();
        assert_eq!(data.markdown.as_deref(), Some("# Hi"));
        assert_eq!(data.metadata.unwrap().title.as_deref(), Some("Hi"));
    }

    #[test]
    fn parses_failure_response_with_error_string() {
        let js = r#"{ "success": false, "error": "This website is no longer supported." }"#;
        let parsed: FirecrawlScrapeResponse = serde_json::from_str(js).unwrap();
        assert!(!parsed.success);
        assert!(is_unsupported_message(parsed.error.as_deref().unwrap()));
    }

    #[test]
    fn unsupported_detection_is_case_insensitive_and_narrow() {
        assert!(is_unsupported_message("Website Not Supported"));
        assert!(is_unsupported_message("this website is no longer supported"));
        assert!(!is_unsupported_message("internal server error"));
        assert!(!is_unsupported_message("rate limit exceeded"));
    }
}
