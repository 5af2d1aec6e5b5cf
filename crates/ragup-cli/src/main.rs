//! ragup CLI - Main entry point

use clap::Parser;
use ragup_cli::config::StateDir;
use ragup_cli::{Cli, Commands, Config, ConfigCommand, CursorCommand};
use ragup_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

/// Exit status for errors raised before any document was touched
const PREFLIGHT_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Console at info (debug with -v); RAGUP_LOG_* take precedence
    let base = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_dir(StateDir::default().path().join("logs"))
        .build();
    let log_config = match base.clone().with_env_overrides() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring RAGUP_LOG_* settings: {}", e);
            base
        },
    };

    // The CLI works without logging, so a failed init is only reported
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(if e.is_preflight() { PREFLIGHT_EXIT_CODE } else { 1 });
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> ragup_cli::Result<()> {
    if let Commands::Init { force } = &cli.command {
        return ragup_cli::commands::init::run(&cli.config, *force).await;
    }

    let config = Config::load(&cli.config)?;

    match &cli.command {
        Commands::Init { .. } => Ok(()),

        Commands::Check => ragup_cli::commands::check::run(&config).await,

        Commands::Run { start_index } => ragup_cli::commands::run::run(config, *start_index).await,

        Commands::Docs {
            store,
            page,
            page_size,
        } => ragup_cli::commands::docs::run(&config, *store, *page, *page_size).await,

        Commands::Cursor { command } => match command {
            CursorCommand::Show => ragup_cli::commands::cursor::show(&config).await,
            CursorCommand::Set { index } => ragup_cli::commands::cursor::set(&config, *index).await,
            CursorCommand::Reset => ragup_cli::commands::cursor::reset(&config).await,
        },

        Commands::Config { command } => match command {
            ConfigCommand::Show => ragup_cli::commands::config::show(&config, &cli.config).await,
        },
    }
}
