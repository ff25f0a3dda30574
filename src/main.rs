//! feedback-insights CLI.
//!
//! Usage:
//!   feedback-insights serve
//!   feedback-insights analyze --product Workers --pretty
//!   feedback-insights seed --csv demos/feedback.csv
//!   feedback-insights products

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use feedback_insights::clients::client_from_config;
use feedback_insights::config::{self, Config, RuntimeConfig};
use feedback_insights::feedback::ProductScope;
use feedback_insights::http::{HttpState, start_http_server};
use feedback_insights::insights::InsightEngine;
use feedback_insights::store::{FeedbackSource, SqliteFeedbackStore};

#[derive(Parser)]
#[command(name = "feedback-insights")]
#[command(about = "Sentiment insights over product feedback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Print insights for one product, or every product when omitted
    Analyze {
        #[arg(long)]
        product: Option<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Load feedback rows from a CSV file (product,source,comment[,created_at])
    Seed {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List products that have feedback
    Products,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // subscriber first so warnings from Config::load are visible
    config::load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(RuntimeConfig::load_from_env().log_level))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    let store = SqliteFeedbackStore::open(&config.store.database_path)
        .with_context(|| format!("opening {}", config.store.database_path))?;

    match cli.command {
        Commands::Serve => serve(config, store).await,
        Commands::Analyze { product, pretty } => analyze(&config, &store, product, pretty).await,
        Commands::Seed { csv } => seed(&store, csv),
        Commands::Products => products(&store).await,
    }
}

fn engine_for(config: &Config) -> InsightEngine {
    InsightEngine::new(client_from_config(&config.inference))
        .with_max_output_tokens(config.inference.max_output_tokens)
}

async fn serve(config: Config, store: SqliteFeedbackStore) -> Result<()> {
    info!("Starting feedback-insights HTTP API");
    let engine = engine_for(&config);
    let state = HttpState::new(config, Arc::new(store), engine);
    start_http_server(state).await?;
    Ok(())
}

async fn analyze(
    config: &Config,
    store: &SqliteFeedbackStore,
    product: Option<String>,
    pretty: bool,
) -> Result<()> {
    let scope = ProductScope::parse(product.as_deref());
    let records = store.fetch(&scope).await?;
    let response = engine_for(config).analyze_scope(&scope, &records).await;

    let out = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", out);
    Ok(())
}

fn seed(store: &SqliteFeedbackStore, csv: PathBuf) -> Result<()> {
    let file = std::fs::File::open(&csv).with_context(|| format!("opening {}", csv.display()))?;
    let inserted = store.seed_from_csv(file)?;
    println!("Seeded {} rows ({} total)", inserted, store.count()?);
    Ok(())
}

async fn products(store: &SqliteFeedbackStore) -> Result<()> {
    for product in store.products().await? {
        println!("{}", product);
    }
    Ok(())
}
