//! Paper Digest - Entry Point
//!
//! Command-line browsing and summarization, plus a stdio JSON-RPC server.

use std::io::Write;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use paper_digest::formatters;
use paper_digest::models::{ResponseFormat, SortBy, SortOrder};
use paper_digest::server::DigestServer;
use paper_digest::{Config, PaperDigest, SearchRequest, SummaryEvent, SummaryRequest};

#[derive(Parser, Debug)]
#[command(name = "paper-digest")]
#[command(about = "Browse recent arXiv papers and stream AI summaries of them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest submissions
    Latest {
        /// Result offset
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size (at most 10)
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: ResponseFormat,
    },

    /// Keyword search; comma-separated terms are OR'ed
    Search {
        /// Search terms
        query: String,

        /// Restrict to one arXiv category (e.g. cs.CL)
        #[arg(long)]
        category: Option<String>,

        /// Result offset
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size (at most 10)
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Sort key
        #[arg(long, value_enum, default_value = "relevance")]
        sort: SortBy,

        /// Sort direction
        #[arg(long, value_enum, default_value = "descending")]
        order: SortOrder,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: ResponseFormat,
    },

    /// Stream a structured summary of one paper
    Summarize {
        /// arXiv identifier (e.g. 2501.01234)
        paper_id: String,

        /// Output format
        #[arg(long, value_enum, default_value_t)]
        format: ResponseFormat,
    },

    /// Inspect or clear caches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Serve JSON-RPC over stdin/stdout
    Serve,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CacheAction {
    /// Cache sizes
    Stats,
    /// Drop cached summaries
    Clear,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries results and JSON-RPC frames; logs go to stderr.
    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let config = Config::from_env()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = %config.provider.id,
        model = %config.provider.model,
        "Starting paper-digest"
    );

    let digest = PaperDigest::new(&config)?;

    match cli.command {
        Command::Latest { offset, limit, format } => {
            let page = digest.fetch_latest(offset, limit).await?;
            print_page(&page, offset, format)?;
        }
        Command::Search { query, category, offset, limit, sort, order, format } => {
            let mut request =
                SearchRequest::from_query(&query).page(offset, limit).sorted(sort, order);
            if let Some(category) = category {
                request = request.in_category(category);
            }
            let page = digest.search(&request).await?;
            print_page(&page, offset, format)?;
        }
        Command::Summarize { paper_id, format } => summarize(&digest, &paper_id, format).await?,
        Command::Cache { action: CacheAction::Stats } => {
            println!("{}", formatters::format_cache_stats_markdown(&digest.cache_stats()));
        }
        Command::Cache { action: CacheAction::Clear } => {
            digest.clear_summary_cache();
            println!("Summary cache cleared.");
        }
        Command::Serve => DigestServer::new(digest).run_stdio().await?,
    }

    Ok(())
}

fn print_page(
    page: &paper_digest::PaperPage,
    offset: usize,
    format: ResponseFormat,
) -> anyhow::Result<()> {
    if format.is_json() {
        println!("{}", serde_json::to_string_pretty(&formatters::compact_page(page))?);
    } else {
        println!("{}", formatters::format_page_markdown(page, offset));
    }
    Ok(())
}

/// Look the paper up, then stream its summary; live titles go to stderr.
async fn summarize(
    digest: &PaperDigest,
    paper_id: &str,
    format: ResponseFormat,
) -> anyhow::Result<()> {
    let paper = digest
        .get_paper(paper_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Paper not found: {paper_id}"))?;

    let request = SummaryRequest::from(&paper);
    let (tx, mut rx) = mpsc::channel(16);

    let progress = async {
        let mut stderr = std::io::stderr();
        while let Some(event) = rx.recv().await {
            if let SummaryEvent::Update(partial) = event {
                let _ = write!(
                    stderr,
                    "\r\x1b[2K[{} key points] {}",
                    partial.key_points.len(),
                    partial.title
                );
                let _ = stderr.flush();
            }
        }
        let _ = writeln!(stderr);
    };

    let (summary, ()) = tokio::join!(digest.stream_summarize(&request, tx), progress);
    let summary = summary?;

    if format.is_json() {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", formatters::format_summary_markdown(&summary));
    }
    Ok(())
}
