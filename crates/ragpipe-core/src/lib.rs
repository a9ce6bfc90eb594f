use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("source not supported: {0}")]
    Unsupported(String),
    #[error("no content retrieved from any source")]
    NoContent,
    #[error("cannot build an index from zero chunks")]
    EmptyIndex,
    #[error("index error: {0}")]
    Index(String),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Metadata key marking a placeholder document for a permanently
/// unfetchable URL.
pub const ERROR_METADATA_KEY: &str = "error";
/// Metadata value used with [`ERROR_METADATA_KEY`] for unsupported sources.
pub const UNSUPPORTED_MARKER: &str = "unsupported";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
    /// Timeout for the provider request.
    pub timeout_ms: Option<u64>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            timeout_ms: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: Option<String>,
    pub published_date: Option<String>,
    pub summary: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub provider: String,
}

/// One fragment of fetched page content. A single URL may yield several
/// fragments; each keeps the metadata its transport attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub source_url: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

impl RawDocument {
    pub fn new(source_url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Placeholder for a URL the transport permanently cannot serve.
    /// The pipeline indexes it instead of dropping the URL silently.
    pub fn unsupported(source_url: &str, reason: &str) -> Self {
        let mut doc = Self::new(
            source_url,
            format!("Content from {source_url} could not be retrieved: {reason}"),
        );
        doc.metadata
            .insert(ERROR_METADATA_KEY.to_string(), UNSUPPORTED_MARKER.to_string());
        doc
    }

    pub fn is_unsupported_placeholder(&self) -> bool {
        self.metadata.get(ERROR_METADATA_KEY).map(String::as_str) == Some(UNSUPPORTED_MARKER)
    }
}

/// A contiguous text segment cut from one [`RawDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_url: String,
    /// Position among the chunks of the same source document, from 0.
    pub chunk_index: usize,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One conversation turn; doubles as the chat wire shape and the
/// history-export record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Parse and validate a fetch target. Search providers occasionally return
/// non-web schemes; only http(s) URLs are fetchable here.
pub fn parse_http_url(s: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(s).map_err(|e| Error::InvalidUrl(format!("{s}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidUrl(format!("{s}: unsupported scheme {other}"))),
    }
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse>;
}

/// Raw content transport. One call, one attempt: retry policy lives in the
/// caller. Implementations must surface permanently unfetchable sources as
/// [`Error::Unsupported`] so callers can stop retrying.
#[async_trait::async_trait]
pub trait ScrapeBackend: Send + Sync {
    async fn scrape(&self, url: &str, timeout: Duration) -> Result<Vec<RawDocument>>;
}

#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; the output is index-aligned with the input
    /// and every vector has the model's fixed dimension.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("provider returned no vector".to_string()))
    }
}
