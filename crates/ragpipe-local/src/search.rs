use ragpipe_core::{Error, Result, SearchProvider, SearchQuery, SearchResponse, SearchResult};
use serde::Deserialize;

use crate::env_or;

fn timeout_ms_from_query(q: &SearchQuery) -> u64 {
    // Provider requests can hang indefinitely without an explicit timeout.
    // Keep a conservative cap even if callers pass something huge.
    q.timeout_ms.unwrap_or(20_000).clamp(1_000, 60_000)
}

fn exa_api_key_from_env() -> Option<String> {
    env_or("RAGPIPE_EXA_API_KEY", "EXA_API_KEY")
}

fn tavily_api_key_from_env() -> Option<String> {
    env_or("RAGPIPE_TAVILY_API_KEY", "TAVILY_API_KEY")
}

/// Search via the Exa API, asking the provider to attach a short summary
/// per result so the report can show one without an extra fetch.
#[derive(Debug, Clone)]
pub struct ExaSearchProvider {
    client: reqwest::Client,
    api_key: String,
}

impl ExaSearchProvider {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = exa_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured("missing RAGPIPE_EXA_API_KEY (or EXA_API_KEY)".to_string())
        })?;
        Ok(Self { client, api_key })
    }

    fn endpoint() -> String {
        // Docs: https://docs.exa.ai/reference/search
        crate::env_nonempty("RAGPIPE_EXA_ENDPOINT")
            .unwrap_or_else(|| "https://api.exa.ai/search".to_string())
    }
}

/// Search via the Tavily API. Tavily has no per-result publish date; its
/// `content` snippet maps to the summary field.
#[derive(Debug, Clone)]
pub struct TavilySearchProvider {
    client: reqwest::Client,
    api_key: String,
}

impl TavilySearchProvider {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = tavily_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured("missing RAGPIPE_TAVILY_API_KEY (or TAVILY_API_KEY)".to_string())
        })?;
        Ok(Self { client, api_key })
    }

    fn endpoint() -> String {
        crate::env_nonempty("RAGPIPE_TAVILY_ENDPOINT")
            .unwrap_or_else(|| "https://api.tavily.com/search".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    url: String,
    title: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    summary: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for ExaSearchProvider {
    fn name(&self) -> &'static str {
        "exa"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let max_results = q.max_results.unwrap_or(5).min(20);
        let timeout_ms = timeout_ms_from_query(q);

        let body = serde_json::json!({
            "query": q.query,
            "numResults": max_results,
            "contents": {
                "summary": { "query": "Main points and key takeaways" }
            },
        });

        let resp = self
            .client
            .post(Self::endpoint())
            .header("x-api-key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("exa search HTTP {status}")));
        }

        let parsed: ExaSearchResponse =
            resp.json().await.map_err(|e| Error::Search(e.to_string()))?;

        let results = parsed
            .results
            .into_iter()
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                published_date: r.published_date,
                summary: r.summary,
                source: "exa".to_string(),
            })
            .collect();

        Ok(SearchResponse {
            results,
            provider: "exa".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    title: Option<String>,
    content: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for TavilySearchProvider {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let max_results = q.max_results.unwrap_or(5).min(20);
        let timeout_ms = timeout_ms_from_query(q);

        let body = serde_json::json!({
            "query": q.query,
            "max_results": max_results,
            "include_answer": false,
            "include_raw_content": false,
            "search_depth": "basic",
        });

        let resp = self
            .client
            .post(Self::endpoint())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .json(&body)
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("tavily search HTTP {status}")));
        }

        let parsed: TavilySearchResponse =
            resp.json().await.map_err(|e| Error::Search(e.to_string()))?;

        let results = parsed
            .results
            .into_iter()
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                published_date: None,
                summary: r.content,
                source: "tavily".to_string(),
            })
            .collect();

        Ok(SearchResponse {
            results,
            provider: "tavily".to_string(),
        })
    }
}
