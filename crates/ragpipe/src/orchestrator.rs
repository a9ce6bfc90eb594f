use std::sync::Arc;

use ragpipe_core::{
    parse_http_url, ChatMessage, Chunk, Result, SearchProvider, SearchQuery, SearchResult,
};
use ragpipe_local::chat::ChatClient;
use ragpipe_local::pipeline::RetrievalPipeline;
use tracing::{debug, info};

use crate::session::ChatSession;

pub const DEFAULT_NUM_RESULTS: usize = 5;

const NO_RESULTS_REPORT: &str = "No results found";
const NO_VALID_URLS_REPORT: &str = "No valid URLs found in search results";

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Answer the user's question \
using only the provided web passages. Cite the source URL for every claim you take from \
a passage, and say so plainly when the passages do not contain the answer.";

/// Top-level query flow: search, fetch/build, retrieve, format, and
/// optionally synthesize an answer.
pub struct QueryOrchestrator {
    search: Arc<dyn SearchProvider>,
    pipeline: RetrievalPipeline,
    chat: Option<ChatClient>,
    num_results: usize,
}

/// What one query produced. `report` is always printable; `chunks` and
/// `answer` are empty on the early-exit paths.
#[derive(Debug)]
pub struct QueryOutcome {
    pub report: String,
    pub chunks: Vec<Chunk>,
    pub answer: Option<String>,
}

impl QueryOutcome {
    fn stopped(report: impl Into<String>) -> Self {
        Self {
            report: report.into(),
            chunks: Vec::new(),
            answer: None,
        }
    }
}

impl QueryOrchestrator {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        pipeline: RetrievalPipeline,
        chat: Option<ChatClient>,
    ) -> Self {
        Self {
            search,
            pipeline,
            chat,
            num_results: DEFAULT_NUM_RESULTS,
        }
    }

    pub fn with_num_results(mut self, num_results: usize) -> Self {
        self.num_results = num_results.max(1);
        self
    }

    pub async fn answer(&self, session: &mut ChatSession, query: &str) -> Result<QueryOutcome> {
        // Snapshot before recording so the synthesis prompt carries prior
        // turns without duplicating the current one.
        let prior_turns: Vec<ChatMessage> = session.messages().to_vec();
        session.record_user(query);

        let response = self
            .search
            .search(&SearchQuery {
                query: query.to_string(),
                max_results: Some(self.num_results),
                timeout_ms: None,
            })
            .await?;

        if response.results.is_empty() {
            info!(provider = %response.provider, "search returned no results");
            return Ok(QueryOutcome::stopped(NO_RESULTS_REPORT));
        }
        info!(
            provider = %response.provider,
            results = response.results.len(),
            "search complete"
        );

        let urls: Vec<String> = response
            .results
            .iter()
            .filter_map(|r| parse_http_url(&r.url).ok())
            .map(|u| u.to_string())
            .collect();
        if urls.is_empty() {
            return Ok(QueryOutcome::stopped(NO_VALID_URLS_REPORT));
        }

        let report = format_search_results(&response.results);

        let index = self.pipeline.build(&urls).await?;
        debug!(chunks = index.len(), "index built");
        let hits = self.pipeline.query(&index, query).await?;
        let chunks: Vec<Chunk> = hits.into_iter().map(|(chunk, _)| chunk).collect();

        let answer = match &self.chat {
            Some(chat) => {
                let answer = self
                    .synthesize(chat, &prior_turns, query, &chunks)
                    .await?;
                session.record_assistant(&answer);
                Some(answer)
            }
            None => None,
        };

        Ok(QueryOutcome {
            report,
            chunks,
            answer,
        })
    }

    async fn synthesize(
        &self,
        chat: &ChatClient,
        prior_turns: &[ChatMessage],
        query: &str,
        chunks: &[Chunk],
    ) -> Result<String> {
        let mut context = String::new();
        for chunk in chunks {
            context.push_str(&format!("[source: {}]\n{}\n\n", chunk.source_url, chunk.text));
        }

        let mut messages = Vec::with_capacity(prior_turns.len() + 2);
        messages.push(ChatMessage::new("system", SYSTEM_PROMPT));
        messages.extend(prior_turns.iter().cloned());
        messages.push(ChatMessage::new(
            "user",
            format!("{query}\n\nWeb passages:\n\n{context}"),
        ));

        chat.complete(&messages).await
    }
}

/// Human-readable numbered report of the raw search results.
pub fn format_search_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_REPORT.to_string();
    }

    let mut out = String::from("### Search Results:\n\n");
    for (idx, result) in results.iter().enumerate() {
        let title = result.title.as_deref().unwrap_or("No title");
        let published = result
            .published_date
            .as_deref()
            .map(|d| format!(" (Published: {d})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "**{}.** [{title}]({}){published}\n",
            idx + 1,
            result.url
        ));
        match result.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(summary) => out.push_str(&format!("> **Summary:** {summary}\n\n")),
            None => out.push('\n'),
        }
    }
    out
}
