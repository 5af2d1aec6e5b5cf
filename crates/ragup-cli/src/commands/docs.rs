//! `ragup docs` command implementation
//!
//! Lists the documents of the configured knowledge base, either through the
//! service API or straight from the metadata store.

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::store::{MetadataStore, MySqlBackend};
use colored::{ColoredString, Colorize};

/// Default page size for API listings
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// List documents
pub async fn run(config: &Config, from_store: bool, page: u32, page_size: u32) -> Result<()> {
    config.validate()?;
    let kb_id = &config.knowledge_base.id;

    let rows: Vec<(String, String, f64)> = if from_store {
        let store = MetadataStore::new(MySqlBackend::from_config(&config.store), Some(kb_id.clone()));
        store.check_connection().await?;
        let docs = store.list_by_kb(kb_id).await;
        store.reset().await;
        docs.into_iter().map(|d| (d.id, d.name, d.progress)).collect()
    } else {
        let api = ApiClient::new(&config.api)?;
        api.list_documents(kb_id, page, page_size)
            .await
            .into_iter()
            .map(|d| (d.id, d.name, d.progress))
            .collect()
    };

    if rows.is_empty() {
        println!("No documents found in knowledge base '{}'.", config.knowledge_base.name);
        return Ok(());
    }

    let source = if from_store { "store" } else { "API" };
    println!(
        "{}",
        format!("Documents in '{}' ({}):", config.knowledge_base.name, source)
            .cyan()
            .bold()
    );
    println!();

    for (id, name, progress) in &rows {
        println!("  {:>8}  {}  {}", format_progress(*progress), id.dimmed(), name);
    }

    println!();
    println!("  Total: {}", rows.len());
    if !from_store {
        println!("  Page:  {} (page size {})", page, page_size);
    }

    Ok(())
}

/// Progress as a colored percentage
fn format_progress(progress: f64) -> ColoredString {
    if progress < 0.0 {
        "failed".red()
    } else if progress >= 1.0 {
        "100%".green()
    } else {
        format!("{:.1}%", progress * 100.0).yellow()
    }
}
