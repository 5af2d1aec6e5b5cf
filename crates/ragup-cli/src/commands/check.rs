//! `ragup check` command implementation
//!
//! Probes the service API and the metadata store and reports both.

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::store::{DocumentBackend, MySqlBackend};
use colored::Colorize;

/// Run both connectivity checks
pub async fn run(config: &Config) -> Result<()> {
    config.validate()?;

    let api = ApiClient::new(&config.api)?;
    let health = api.check_health().await;

    let backend = MySqlBackend::from_config(&config.store);
    let store = backend.ping().await;

    println!("{}", "Connectivity:".cyan().bold());
    println!();

    let (api_ok, api_message) = health.into_parts();
    print_line("API", api.base_url(), api_ok, &api_message);

    let store_message = match &store {
        Ok(()) => "Connected".to_string(),
        Err(e) => e.to_string(),
    };
    print_line("Store", backend.target(), store.is_ok(), &store_message);
    backend.reset().await;

    match (api_ok, store.is_ok()) {
        (true, true) => Ok(()),
        (false, true) => Err(CliError::connectivity(api_message)),
        (true, false) => Err(CliError::connectivity(format!("metadata store unreachable: {}", store_message))),
        (false, false) => Err(CliError::connectivity("service API and metadata store are both unreachable")),
    }
}

fn print_line(label: &str, target: &str, ok: bool, message: &str) {
    let mark = if ok { "✓".green() } else { "✗".red() };
    println!("  {} {:<6} {}", mark, label, target);
    println!("           {}", message);
}
