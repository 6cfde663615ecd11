//! recall CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config and create the layer data directory
//! - `status`: Show the effective configuration
//! - `classify`: Show how a query would be classified and routed
//! - `query`: Run the full retrieval pipeline and print the context
//! - `hops`: Run several sub-queries in order and combine their context

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "recall",
    about = "recall — context retrieval for AI coding assistants",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and the layer data directory
    Onboard,

    /// Show effective configuration
    Status,

    /// Classify a query and show the layers it routes to
    Classify {
        /// The query to classify
        query: String,
    },

    /// Retrieve fused context for a query
    Query {
        /// The query to answer
        query: String,

        /// Override the token budget for this query
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Retrieve and combine context for an ordered list of sub-queries
    Hops {
        /// Sub-queries, in order
        #[arg(required = true)]
        sub_queries: Vec<String>,

        /// Override the token budget for each hop
        #[arg(long)]
        max_tokens: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Classify { query } => commands::classify::run(&query).await?,
        Commands::Query {
            query,
            max_tokens,
            json,
        } => commands::query::run(&query, max_tokens, json).await?,
        Commands::Hops {
            sub_queries,
            max_tokens,
        } => commands::query::run_hops(&sub_queries, max_tokens).await?,
    }

    Ok(())
}
