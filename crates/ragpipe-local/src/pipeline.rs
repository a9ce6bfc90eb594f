use std::sync::Arc;

use ragpipe_core::{Chunk, Embedder, EmbeddedChunk, Error, RawDocument, Result};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::chunker::TextSplitter;
use crate::fetcher::ContentFetcher;
use crate::index::ChunkIndex;

pub const DEFAULT_TOP_K: usize = 4;

/// Fetch → chunk → embed → index, then query-time similarity search.
///
/// The pipeline owns nothing across runs: every `build` produces a fresh
/// index that the caller drops with the run.
pub struct RetrievalPipeline {
    fetcher: ContentFetcher,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    top_k: usize,
}

impl RetrievalPipeline {
    pub fn new(fetcher: ContentFetcher, embedder: Arc<dyn Embedder>, splitter: TextSplitter) -> Self {
        Self {
            fetcher,
            embedder,
            splitter,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Fetches every URL concurrently, splits and embeds whatever survives,
    /// and bulk-loads the index.
    ///
    /// Per-URL failures are absorbed: a URL that yields nothing is dropped
    /// without touching its siblings. Only a globally empty document set
    /// (`NoContent`) or an embedding outage is fatal. Dropping the returned
    /// future aborts in-flight fetch tasks, so a cancelled build never
    /// leaks work or exposes a partial index.
    pub async fn build(&self, urls: &[String]) -> Result<ChunkIndex> {
        let mut tasks: JoinSet<(String, Result<Vec<RawDocument>>)> = JoinSet::new();
        for url in urls {
            let fetcher = self.fetcher.clone();
            let url = url.clone();
            tasks.spawn(async move {
                let fetched = fetcher.fetch(&url).await;
                (url, fetched)
            });
        }

        // Fan-in barrier: results are merged here, on the orchestrating
        // task, only after every fetch finished or timed out.
        let mut documents = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((url, Ok(docs))) => {
                    if docs.is_empty() {
                        debug!(%url, "url yielded no documents");
                    } else {
                        documents.extend(docs);
                    }
                }
                Ok((url, Err(e))) => {
                    warn!(%url, error = %e, "fetch failed, dropping url");
                }
                Err(join_err) => {
                    warn!(error = %join_err, "fetch task aborted");
                }
            }
        }

        if documents.is_empty() {
            return Err(Error::NoContent);
        }

        let chunks = self.splitter.split(&documents);
        if chunks.is_empty() {
            return Err(Error::NoContent);
        }
        debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            "chunked fetched content"
        );

        // One embed call per build; the embedder sub-batches as needed.
        // An embedding failure is fatal to the run, never retried here.
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();

        ChunkIndex::build(embedded)
    }

    /// Embeds the query text with the same embedder the index was built
    /// with and returns the `top_k` nearest chunks.
    pub async fn query(&self, index: &ChunkIndex, text: &str) -> Result<Vec<(Chunk, f32)>> {
        let vector = self.embedder.embed_one(text).await?;
        index.query(&vector, self.top_k)
    }
}
