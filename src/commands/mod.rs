//! Command implementations for the CLI
//!
//! - stats: Print recent requests and query statistics
//! - dashboard: Write the dashboard page
//! - config: Configuration display and validation

pub mod config;
pub mod dashboard;
pub mod stats;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use devtools::clock::{date_stamp, DATE_FORMAT};
use devtools::config::{load_config, DevToolsConfig};
use devtools::{DevTools, LoadSummary};
use std::path::Path;

/// Validate a `--date` argument, defaulting to today
fn resolve_date(date: Option<String>) -> Result<String> {
    match date {
        Some(date) => {
            NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
            Ok(date)
        }
        None => Ok(date_stamp(&Local::now())),
    }
}

/// Load the configuration and everything persisted for `date`
fn load_devtools(
    config_path: &Path,
    date: &str,
) -> Result<(DevToolsConfig, DevTools, devtools::DevToolsResult<LoadSummary>)> {
    let cfg = load_config(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let devtools = DevTools::from_config(&cfg);
    let loaded = devtools.load_persisted(&cfg, date);
    Ok((cfg, devtools, loaded))
}
