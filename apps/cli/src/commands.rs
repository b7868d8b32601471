//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use beacon_core::{IngestReport, Pipeline, PipelineContext, ProgressReporter, SilentProgress};
use beacon_shared::{
    AppConfig, QueryPair, RankedPassage, init_config, load_config, load_config_from,
};
use beacon_storage::{MetadataFilter, VectorStore};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Beacon: fresh web evidence for emergency-information answers.
#[derive(Parser)]
#[command(
    name = "beacon",
    version,
    about = "Search, crawl, and index web evidence, then retrieve reranked passages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.beacon/beacon.toml).
    #[arg(long, global = true, env = "BEACON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Search the web for a query and store pages not yet in the corpus.
    Ingest {
        /// Web search query.
        query: String,
    },

    /// Retrieve ranked passages from the corpus.
    Retrieve {
        /// Query for the similarity stage.
        semantic: String,

        /// Query for the rerank stage (defaults to the similarity query).
        #[arg(long)]
        rerank: Option<String>,

        /// Print passages as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run one turn: ingest the search query, then retrieve.
    Ask {
        /// Web search query, or "null" when no search is needed.
        #[arg(long)]
        search: String,

        /// Refined query for the rerank stage.
        #[arg(long)]
        rerank: Option<String>,
    },

    /// Show corpus statistics.
    Stats {
        /// List the stored documents for this URL instead.
        #[arg(long)]
        url: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config management subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file.
    Init,
    /// Print the resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "beacon=info",
        1 => "beacon=debug",
        _ => "beacon=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries command output.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Ingest { query } => cmd_ingest(config_path, &query).await,
        Command::Retrieve {
            semantic,
            rerank,
            json,
        } => cmd_retrieve(config_path, &semantic, rerank.as_deref(), json).await,
        Command::Ask { search, rerank } => {
            cmd_ask(config_path, &search, rerank.as_deref()).await
        }
        Command::Stats { url } => cmd_stats(config_path, url).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(&p)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn build_pipeline(config_path: Option<PathBuf>) -> Result<Pipeline> {
    let config = resolve_config(config_path)?;
    let ctx = PipelineContext::from_config(&config)
        .await
        .wrap_err("failed to initialise pipeline clients")?;
    Ok(Pipeline::new(ctx))
}

async fn cmd_ingest(config_path: Option<PathBuf>, query: &str) -> Result<()> {
    let pipeline = build_pipeline(config_path).await?;

    info!(query, "ingesting");
    let reporter = CliProgress::new();
    let report = pipeline.ingest(query, &reporter).await?;

    println!();
    println!("  Ingest complete");
    println!("  Candidates: {}", report.candidates);
    println!("  New URLs:   {}", report.new_urls);
    println!("  Crawled:    {}", report.crawled);
    println!("  Failed:     {}", report.failures.len());
    println!("  Stored:     {}", report.stored.len());
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    for failure in &report.failures {
        println!("    skipped {} ({})", failure.url, failure.cause);
    }
    println!();

    Ok(())
}

async fn cmd_retrieve(
    config_path: Option<PathBuf>,
    semantic: &str,
    rerank: Option<&str>,
    json: bool,
) -> Result<()> {
    let pipeline = build_pipeline(config_path).await?;
    let passages = pipeline.retrieve(semantic, rerank.unwrap_or(semantic)).await?;

    if json {
        print_json(&passages)?;
    } else {
        print_passages(&passages);
    }
    Ok(())
}

async fn cmd_ask(config_path: Option<PathBuf>, search: &str, rerank: Option<&str>) -> Result<()> {
    let turn = QueryPair::from_raw(Some(search), rerank);
    if turn.search.is_none() {
        return print_json(&[]);
    }

    let pipeline = build_pipeline(config_path).await?;
    let passages = pipeline.run_turn(&turn, &SilentProgress).await?;
    print_json(&passages)
}

async fn cmd_stats(config_path: Option<PathBuf>, url: Option<String>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let store = PipelineContext::open_store(&config).await?;

    if let Some(url) = url {
        let docs = store.get_metadata(&MetadataFilter::url(url.as_str())).await?;
        if docs.is_empty() {
            println!("  {url} is not in the corpus");
        }
        for doc in docs {
            println!("  {}  {}  {}", doc.id, doc.ingested_at.to_rfc3339(), doc.url);
        }
        return Ok(());
    }

    let count = store.count().await?;

    println!("  Collection: {}", store.collection());
    println!("  Store:      {}", config.store.path);
    println!("  Documents:  {count}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_json(passages: &[RankedPassage]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(passages)?);
    Ok(())
}

fn print_passages(passages: &[RankedPassage]) {
    if passages.is_empty() {
        println!("No passages found.");
        return;
    }

    for (rank, passage) in passages.iter().enumerate() {
        println!("{:>2}. [{:.3}] {}", rank + 1, passage.score, passage.document.url);
        println!("    {}", snippet(&passage.document.text, 200));
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _report: &IngestReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
