//! Ragline CLI
//!
//! Main entry point for the ragline command-line tool.
//! Answers questions from a local corpus, attached documents and the web.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, FlowCommand, LearnCommand, StatusCommand};
use ragline_core::{
    config::AppConfig,
    logging::{self, LogFormat},
    AppError, AppResult,
};
use ragline_knowledge::Engine;
use std::path::PathBuf;

/// Ragline - adaptive retrieval-augmented question answering
#[derive(Parser, Debug)]
#[command(name = "ragline")]
#[command(about = "Adaptive retrieval-augmented question answering", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RAGLINE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RAGLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log line format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai)
    #[arg(short, long, global = true, env = "RAGLINE_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "RAGLINE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question, optionally about an attached document
    Ask(AskCommand),

    /// Ingest files into the persistent corpus
    Learn(LearnCommand),

    /// Show persistent corpus status
    Status(StatusCommand),

    /// Print the pipeline stages and routing rules
    Flow(FlowCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration; the workspace and config file decide which YAML is merged
    let config = AppConfig::load_with(cli.workspace, cli.config)?;

    // Apply the remaining CLI overrides
    let config = config.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    let log_format = LogFormat::parse(&config.log_format).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown log format: {} (expected pretty or json)",
            config.log_format
        ))
    })?;
    logging::init_logging(config.log_level.as_deref(), log_format, config.no_color)?;

    tracing::info!("Ragline starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    if !matches!(cli.command, Commands::Flow(_)) {
        config.validate()?;
    }
    config.ensure_data_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Learn(_) => "learn",
        Commands::Status(_) => "status",
        Commands::Flow(_) => "flow",
    };
    let span = tracing::info_span!("command", name = command_name);
    let _enter = span.enter();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => run_ask(&cmd, &config).await,
        Commands::Learn(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
        Commands::Flow(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

/// Validate the question, then build the engine once and run it.
async fn run_ask(cmd: &AskCommand, config: &AppConfig) -> AppResult<()> {
    let input = cmd.prepare(config)?;
    let engine = Engine::from_config(config)?;
    cmd.execute(input, &engine).await
}
