//! `ragup init` command implementation
//!
//! Writes a commented config template.

use crate::config::CONFIG_TEMPLATE;
use crate::error::{CliError, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write the config template to `path`
pub async fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::config(format!(
            "{} already exists. Use --force to overwrite",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, CONFIG_TEMPLATE)?;
    info!(path = %path.display(), "Wrote config template");

    println!("{} Created {}", "✓".green(), path.display());
    println!();
    println!("Next steps:");
    println!("  1. Fill in api.authorization, knowledge_base.id, knowledge_base.name and documents.dir");
    println!("  2. Verify connectivity: ragup check");
    println!("  3. Start uploading:     ragup run");

    Ok(())
}
