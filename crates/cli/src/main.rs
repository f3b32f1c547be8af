//! TIF Agent CLI
//!
//! Answers questions about Tax Increment Financing expenditures from a
//! loaded CSV table and an index of district report documents.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, ChatCommand, IndexCommand, LoadCommand, PromptsCommand, SchemaCommand, SqlCommand,
};
use std::path::PathBuf;
use tif_core::{config::AppConfig, logging, AppResult};

/// TIF Agent CLI - questions over TIF expenditure data and district reports
#[derive(Parser, Debug)]
#[command(name = "tif")]
#[command(about = "Answer questions about TIF expenditures", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "TIF_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "TIF_CONFIG")]
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

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "TIF_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "TIF_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive question session
    Chat(ChatCommand),

    /// Answer a single question
    Ask(AskCommand),

    /// Translate a question to SQL, run it and narrate the result
    Sql(SqlCommand),

    /// Load the expenditure CSV into the local database
    Load(LoadCommand),

    /// Index district report documents
    Index(IndexCommand),

    /// Print the schema description of the expenditure table
    Schema(SchemaCommand),

    /// List prompt definitions and their origin
    Prompts(PromptsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Chat(_) => "chat",
            Commands::Ask(_) => "ask",
            Commands::Sql(_) => "sql",
            Commands::Load(_) => "load",
            Commands::Index(_) => "index",
            Commands::Schema(_) => "schema",
            Commands::Prompts(_) => "prompts",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // The config file location must be known before it is read
    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())?;

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("TIF Agent CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_state_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Sql(cmd) => cmd.execute(&config).await,
        Commands::Load(cmd) => cmd.execute(&config),
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Schema(cmd) => cmd.execute(&config),
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_globals() {
        let cli = Cli::try_parse_from([
            "tif",
            "ask",
            "How much did Kinzie spend in 2023?",
            "--json",
            "-p",
            "ollama",
            "-m",
            "llama3.1",
        ])
        .unwrap();

        assert_eq!(cli.provider.as_deref(), Some("ollama"));
        assert_eq!(cli.model.as_deref(), Some("llama3.1"));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.question, "How much did Kinzie spend in 2023?");
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_flags() {
        let cli = Cli::try_parse_from(["tif", "index", "--dir", "reports", "--reset"]).unwrap();

        assert_eq!(cli.command.name(), "index");
        match cli.command {
            Commands::Index(cmd) => {
                assert_eq!(cmd.dir, Some(PathBuf::from("reports")));
                assert!(cmd.reset);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["tif", "ask"]).is_err());
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["tif", "task"]).is_err());
    }
}
