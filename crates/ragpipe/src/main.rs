use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;

use ragpipe::{ChatSession, QueryOrchestrator, SearchToolRegistry};
use ragpipe_local::chat::ChatClient;
use ragpipe_local::chunker::TextSplitter;
use ragpipe_local::embedder::TextEmbeddingsClient;
use ragpipe_local::fetcher::{ContentFetcher, RetryPolicy};
use ragpipe_local::firecrawl::FirecrawlClient;
use ragpipe_local::pipeline::RetrievalPipeline;

#[derive(Parser, Debug)]
#[command(name = "ragpipe", version)]
#[command(about = "Search the web, index what it finds, and answer from the passages", long_about = None)]
struct Cli {
    /// Search query; words are joined with spaces. Prompts when omitted.
    query: Vec<String>,

    /// Search tool to use (see `exa_search`, `tavily_search`). Defaults to
    /// the first one with credentials.
    #[arg(long, env = "RAGPIPE_SEARCH_TOOL")]
    tool: Option<String>,

    /// How many search results to request.
    #[arg(long, default_value_t = 5)]
    num_results: usize,

    /// How many passages to retrieve for the query.
    #[arg(long, default_value_t = 4)]
    top_k: usize,

    /// Chunk window size in characters.
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[arg(long, default_value_t = 500)]
    chunk_overlap: usize,

    /// Write the conversation history to this JSON file before exiting.
    #[arg(long)]
    save_history: Option<std::path::PathBuf>,
}

fn dotenv_enabled() -> bool {
    // Same escape hatch the tests use to stay hermetic.
    !matches!(
        std::env::var("RAGPIPE_DOTENV").unwrap_or_default().trim(),
        "0" | "false" | "off"
    )
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var("RAGPIPE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn read_query(cli: &Cli) -> Result<String> {
    let joined = cli.query.join(" ").trim().to_string();
    if !joined.is_empty() {
        return Ok(joined);
    }

    print!("Enter search query: ");
    std::io::stdout().flush().context("flush prompt")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("read query from stdin")?;
    let line = line.trim().to_string();
    if line.is_empty() {
        bail!("no query given");
    }
    Ok(line)
}

async fn run(cli: Cli) -> Result<()> {
    let query = read_query(&cli)?;

    let client = ragpipe_local::default_http_client()?;

    let registry = SearchToolRegistry::from_env(&client);
    let tool = registry.resolve(cli.tool.as_deref())?;
    debug!(tool = tool.name, "search tool selected");

    let embedder = TextEmbeddingsClient::from_env(client.clone())?;
    let scraper = FirecrawlClient::from_env(client.clone())?;

    // Answer synthesis degrades gracefully: without a chat provider the
    // retrieved passages are still printed.
    let chat = match ChatClient::from_env(client.clone()) {
        Ok(chat) => Some(chat),
        Err(e) => {
            debug!(error = %e, "answer synthesis disabled");
            None
        }
    };

    let splitter = TextSplitter::new(cli.chunk_size, cli.chunk_overlap)?;
    let fetcher = ContentFetcher::new(Arc::new(scraper), RetryPolicy::default());
    let pipeline =
        RetrievalPipeline::new(fetcher, Arc::new(embedder), splitter).with_top_k(cli.top_k);
    let orchestrator = QueryOrchestrator::new(tool.provider.clone(), pipeline, chat)
        .with_num_results(cli.num_results);

    let mut session = ChatSession::new();
    let outcome = orchestrator.answer(&mut session, &query).await?;

    println!("=== Search Results ===\n");
    println!("{}", outcome.report);

    if !outcome.chunks.is_empty() {
        println!("=== Retrieved Passages ===");
        for chunk in &outcome.chunks {
            println!("\n--- [{}]", chunk.source_url);
            println!("{}", chunk.text);
        }
    }

    if let Some(answer) = &outcome.answer {
        println!("\n=== Answer ===\n");
        println!("{answer}");
    }

    if let Some(path) = &cli.save_history {
        session.save(path)?;
        println!("\nConversation saved to {}", path.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if dotenv_enabled() {
        let _ = dotenvy::dotenv();
    }
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        // Short message for the user; the full chain stays on debug.
        eprintln!("error: {e:#}");
        debug!("{e:?}");
        std::process::exit(1);
    }
}
