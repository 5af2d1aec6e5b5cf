//! ragup CLI Library
//!
//! Batch-uploads a local document tree into a RAGFlow knowledge base and
//! waits for each document to be parsed before moving on.
//!
//! # Overview
//!
//! - **Setup**: Write a config template (`ragup init`) and verify it (`ragup check`)
//! - **Upload**: Upload, parse and wait, resumable across runs (`ragup run`)
//! - **Inspection**: List knowledge-base documents (`ragup docs`)
//! - **Resume control**: Inspect or move the run cursor (`ragup cursor`)
//! - **Configuration**: Show the effective settings (`ragup config show`)
//!
//! The upload loop lives in [`orchestrator`]; it talks to the service through
//! [`api::ApiClient`] and to the metadata store through [`store::MetadataStore`].

pub mod api;
pub mod commands;
pub mod config;
pub mod cursor;
pub mod discovery;
pub mod error;
pub mod failures;
pub mod naming;
pub mod orchestrator;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ragup - upload documents to a RAGFlow knowledge base and wait for parsing
#[derive(Parser, Debug)]
#[command(name = "ragup")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(long, env = "RAGUP_CONFIG", default_value_os_t = Config::default_path(), global = true)]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a commented config template
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Check service API and metadata store connectivity
    Check,

    /// Upload documents and wait for each to be parsed
    Run {
        /// 1-based document index to start from (overwrites the saved cursor)
        #[arg(short, long)]
        start_index: Option<usize>,
    },

    /// List documents in the knowledge base
    Docs {
        /// Read from the metadata store instead of the service API
        #[arg(long)]
        store: bool,

        /// Page number (API listing only)
        #[arg(long, default_value = "1")]
        page: u32,

        /// Page size (API listing only)
        #[arg(long, default_value_t = commands::docs::DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Inspect or change the resume cursor
    Cursor {
        #[command(subcommand)]
        command: CursorCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Cursor subcommands
#[derive(Subcommand, Debug)]
pub enum CursorCommand {
    /// Show the index the next run starts from
    Show,

    /// Set the index the next run starts from
    Set {
        /// 1-based document index
        index: usize,
    },

    /// Delete the cursor file so the next run starts from the beginning
    Reset,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
}
