//! `ragup config` command implementation
//!
//! Shows the effective configuration.

use crate::config::{mask_secret, Config};
use crate::error::Result;
use colored::Colorize;
use std::path::Path;

/// Show all configuration, secrets masked
pub async fn show(config: &Config, path: &Path) -> Result<()> {
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };

    println!("{}", "ragup Configuration:".cyan().bold());
    println!("{:<28} {}", "config file:", source);
    println!();

    section("api");
    entry("url", &config.api.url);
    entry("authorization", &mask_secret(&config.api.authorization));
    entry("timeout_secs", config.api.timeout_secs);

    section("knowledge_base");
    entry("id", &config.knowledge_base.id);
    entry("name", &config.knowledge_base.name);
    entry("parser_id", &config.knowledge_base.parser_id);

    section("documents");
    entry("dir", config.documents.dir.display());
    entry("extensions", config.documents.normalized_extensions().join(", "));
    entry("min_lines", config.documents.min_lines);

    section("store");
    entry("host", &config.store.host);
    entry("port", config.store.port);
    entry("user", &config.store.user);
    entry("password", &mask_secret(&config.store.password));
    entry("database", &config.store.database);
    entry("retries", config.store.retries);
    entry("retry_interval_secs", config.store.retry_interval_secs);

    section("upload");
    entry("only_upload", config.upload.only_upload);
    entry("progress_log", config.upload.progress_log);
    entry("poll_interval_secs", config.upload.poll_interval_secs);
    entry(
        "max_polls",
        config
            .upload
            .max_polls
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unbounded".to_string()),
    );
    entry("first_parse_wait_secs", config.upload.first_parse_wait_secs);

    println!();
    println!("{:<28} {}", "state_dir:", config.state_dir.path().display());
    println!();
    println!("{}", "Environment Variables:".cyan());
    println!("  RAGUP_* variables (and a .env file) override the config file,");
    println!("  e.g. RAGUP_API_URL, RAGUP_AUTHORIZATION, RAGUP_KB_ID, RAGUP_DOC_DIR");

    Ok(())
}

fn section(name: &str) {
    println!("[{}]", name.green());
}

fn entry(key: &str, value: impl std::fmt::Display) {
    println!("  {:<26} {}", format!("{}:", key), value);
}
