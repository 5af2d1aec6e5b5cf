//! `ragup run` command implementation
//!
//! Wires the orchestrator to its production collaborators and turns Ctrl-C
//! into cooperative cancellation.

use crate::api::ApiClient;
use crate::config::Config;
use crate::cursor::CursorFile;
use crate::error::{CliError, Result};
use crate::failures::FailureLog;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::store::{MetadataStore, MySqlBackend};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Upload everything from the cursor (or `start_index`) onwards
pub async fn run(config: Config, start_index: Option<usize>) -> Result<()> {
    config.validate_for_run()?;

    let state_dir = config.state_dir.path().to_path_buf();
    let cursor = CursorFile::for_knowledge_base(&state_dir, &config.knowledge_base.id, &config.knowledge_base.name);

    if let Some(index) = start_index {
        if index == 0 {
            return Err(CliError::config("--start-index must be 1 or greater"));
        }
        cursor.save(index)?;
        info!(index, cursor = %cursor.path().display(), "Start index overridden");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            on_signal.cancel();
        }
    });

    let api = ApiClient::new(&config.api)?;
    let store = MetadataStore::new(
        MySqlBackend::from_config(&config.store),
        Some(config.knowledge_base.id.clone()),
    )
    .with_cancellation(cancel.clone());
    let failures = FailureLog::in_dir(&state_dir);
    let failure_path = failures.path().to_path_buf();

    let orchestrator = Orchestrator::new(config, api, store, cursor.clone(), failures, cancel);
    let report = orchestrator.run().await;
    orchestrator.store().reset().await;
    let report = report?;

    print_summary(&report);
    if report.parse_failed + report.timed_out > 0 {
        println!("  Failure log:       {}", failure_path.display());
    }
    println!("  Cursor:            {}", cursor.path().display());

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    if report.cancelled {
        println!("{}", "Run cancelled".yellow().bold());
    } else {
        println!("{}", "Run complete".green().bold());
    }
    println!(
        "  Documents:         {} of {} (from #{})",
        report.processed, report.total, report.start_index
    );
    println!("  Uploaded:          {}", report.uploaded);
    println!("  Parsed:            {}", report.completed);
    println!(
        "  Skipped:           {} short, {} already parsed, {} already uploaded",
        report.skipped_short, report.already_parsed, report.already_uploaded
    );

    let failures = report.failures();
    let line = format!(
        "  Failed:            {} ({} upload, {} parse, {} timed out, {} not found, {} trigger)",
        failures,
        report.upload_failed,
        report.parse_failed,
        report.timed_out,
        report.not_found,
        report.trigger_failed
    );
    if failures > 0 {
        println!("{}", line.red());
    } else {
        println!("{}", line);
    }
}
