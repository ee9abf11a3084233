//! Tradewise CLI
//!
//! Answers trading questions from a read-only trade database and a Q&A
//! knowledge base, on the command line or over HTTP.

mod chart;
mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, KnowledgeCommand, ServeCommand, ValidateCommand};
use std::path::PathBuf;
use tradewise_core::{config::AppConfig, logging, AppResult};

/// Tradewise - questions about your trades, answered from data and knowledge
#[derive(Parser, Debug)]
#[command(name = "tradewise")]
#[command(about = "Trading assistant over your trade database and Q&A knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "TRADEWISE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "TRADEWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai, claude)
    #[arg(short, long, global = true, env = "TRADEWISE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "TRADEWISE_MODEL")]
    model: Option<String>,

    /// Trading data SQLite file
    #[arg(short, long, global = true, env = "TRADEWISE_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one question
    Ask(AskCommand),

    /// Serve the query API over HTTP
    Serve(ServeCommand),

    /// Check a SQL statement against the read-only policy
    Validate(ValidateCommand),

    /// Q&A knowledge base management
    Knowledge(KnowledgeCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // workspace and config file decide which YAML is merged, so they go in first
    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        None,
        None,
        cli.provider,
        cli.model,
        cli.database,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Tradewise CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}, model: {}", config.provider, config.model);
    tracing::debug!("Database: {:?}", config.database_path());

    config.ensure_tradewise_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Serve(_) => "serve",
        Commands::Validate(_) => "validate",
        Commands::Knowledge(_) => "knowledge",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Validate(cmd) => cmd.execute(&config),
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
