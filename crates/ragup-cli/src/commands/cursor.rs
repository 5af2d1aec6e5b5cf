//! `ragup cursor` command implementation

use crate::config::Config;
use crate::cursor::CursorFile;
use crate::error::{CliError, Result};
use colored::Colorize;

fn cursor_for(config: &Config) -> Result<CursorFile> {
    let kb = &config.knowledge_base;
    if kb.id.trim().is_empty() || kb.name.trim().is_empty() {
        return Err(CliError::config(
            "knowledge_base.id and knowledge_base.name must be set to locate the cursor",
        ));
    }
    Ok(CursorFile::for_knowledge_base(config.state_dir.path(), &kb.id, &kb.name))
}

/// Print the next index a run would start from
pub async fn show(config: &Config) -> Result<()> {
    let cursor = cursor_for(config)?;
    let index = cursor.load()?;

    println!("{:<8} {}", "Index:", index.to_string().green());
    println!("{:<8} {}", "File:", cursor.path().display());
    if !cursor.path().exists() {
        println!("{:<8} not written yet, runs start from the first document", "");
    }
    Ok(())
}

/// Overwrite the stored index
pub async fn set(config: &Config, index: usize) -> Result<()> {
    if index == 0 {
        return Err(CliError::config("cursor index must be 1 or greater"));
    }
    let cursor = cursor_for(config)?;
    cursor.save(index)?;

    println!("{} Cursor set to {} ({})", "✓".green(), index, cursor.path().display());
    Ok(())
}

/// Delete the cursor file
pub async fn reset(config: &Config) -> Result<()> {
    let cursor = cursor_for(config)?;
    if cursor.reset()? {
        println!("{} Removed {}", "✓".green(), cursor.path().display());
    } else {
        println!("No cursor file at {}", cursor.path().display());
    }
    Ok(())
}
