//! judgebot CLI: the main entry point.
//!
//! Commands:
//! - `ask`    : Answer one question and exit
//! - `chat`   : Interactive question loop
//! - `ingest` : Download and index the Comprehensive Rules
//! - `search` : Query the rules index directly
//! - `tools`  : List the tools the agent can call
//! - `doctor` : Diagnose configuration, providers and the rules index
//! - `onboard`: Write the default config file

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use judgebot_config::{AppConfig, LogFormat};
use tracing_subscriber::EnvFilter;

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "judgebot",
    about = "judgebot - Magic: The Gathering rules and deckbuilding assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.judgebot/config.toml
    #[arg(long, global = true, env = "JUDGEBOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Ask questions interactively; each question starts a fresh conversation
    Chat,

    /// Download the Comprehensive Rules and rebuild the search index
    Ingest {
        /// Download from this URL instead of the configured one
        #[arg(long, conflicts_with = "file")]
        source: Option<String>,

        /// Read this local file instead of downloading
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Search the rules index without involving the model
    Search {
        /// What to look for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Number of rules to return
        #[arg(short, default_value_t = 5)]
        k: usize,
    },

    /// List the available tools and their parameters
    Tools,

    /// Diagnose configuration and connectivity
    Doctor,

    /// Write the default configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
        None => AppConfig::load().context("Failed to load config")?,
    };

    init_tracing(cli.verbose, config.logging.format);

    match cli.command {
        Commands::Ask { question } => commands::ask::run(config, &question.join(" ")).await,
        Commands::Chat => commands::chat::run(config).await,
        Commands::Ingest { source, file } => commands::ingest::run(config, source, file).await,
        Commands::Search { query, k } => commands::search::run(config, &query.join(" "), k).await,
        Commands::Tools => commands::tools::run(config),
        Commands::Doctor => commands::doctor::run(config, cli.config.as_deref()).await,
        Commands::Onboard => commands::onboard::run(cli.config.as_deref()),
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
