//! Build automation tasks for ragup
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for ragup", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<ragup_cli::Cli>();

    let content = format!(
        r#"# ragup CLI Reference

This documentation is auto-generated from the CLI source code. Last updated: {}.

## Overview

ragup uploads a local document tree into a RAGFlow knowledge base. Each
document is uploaded, parsed and waited on before the next one starts, and
the position is saved so an interrupted run picks up where it stopped.

## Quick Start

```bash
# Write a config template to ~/.ragflow_upload/ragup.toml
ragup init

# Verify the service API and the metadata store are reachable
ragup check

# Upload everything under documents.dir
ragup run

# Start over from a given document
ragup run --start-index 120
```

## Commands

{}

## Environment Variables

Every config key has a `RAGUP_*` override, read after the config file (a
`.env` file in the working directory is loaded too):

- `RAGUP_CONFIG` - Config file path
- `RAGUP_API_URL`, `RAGUP_AUTHORIZATION` - Service API
- `RAGUP_KB_ID`, `RAGUP_KB_NAME`, `RAGUP_PARSER_ID` - Target knowledge base
- `RAGUP_DOC_DIR`, `RAGUP_DOC_SUFFIX`, `RAGUP_DOC_MIN_LINES` - Document source
- `RAGUP_MYSQL_HOST`, `RAGUP_MYSQL_PORT`, `RAGUP_MYSQL_USER`, `RAGUP_MYSQL_PASSWORD`, `RAGUP_MYSQL_DATABASE` - Metadata store
- `RAGUP_SQL_RETRIES`, `RAGUP_ONLY_UPLOAD`, `RAGUP_POLL_INTERVAL_SECS`, `RAGUP_MAX_POLLS`, `RAGUP_FIRST_PARSE_WAIT_SECS` - Upload loop
- `RAGUP_STATE_DIR` - Cursor, failure log and log files
- `RAGUP_LOG_LEVEL`, `RAGUP_LOG_OUTPUT`, `RAGUP_LOG_FORMAT`, `RAGUP_LOG_DIR`, `RAGUP_LOG_FILTER` - Logging

## Exit Status

- `0` - Success
- `1` - Runtime failure
- `2` - Usage or preflight failure (bad config, unreachable service or store, cursor out of range)

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("✅ Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
