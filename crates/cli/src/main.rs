//! Docent CLI
//!
//! Main entry point for the docent command-line tool.
//! Answers questions over an ingested document collection.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand, InitCommand, ServeCommand};
use docent_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Docent - question answering over your documents
#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(about = "Question answering over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCENT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCENT_CONFIG")]
    config: Option<PathBuf>,

    /// Collection to ingest into and query
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, openai)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve POST /ask and GET /metrics over HTTP
    Serve(ServeCommand),

    /// Ask one question, or start an interactive session
    Ask(AskCommand),

    /// Ingest documents from the data directory
    Ingest(IngestCommand),

    /// Create the collection if it does not exist
    Init(InitCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.collection,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Docent starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Index backend: {}", config.index.backend);
    tracing::debug!("Provider: {} ({})", config.llm.provider, config.llm.model);

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
        Commands::Ingest(_) => "ingest",
        Commands::Init(_) => "init",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Init(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
