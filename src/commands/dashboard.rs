//! Dashboard command implementation

use crate::cli::DashboardFormat;
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Execute the dashboard command
///
/// Fails with "Dashboard not available" when storage is not configured, so the
/// process exits with a non-zero status.
///
/// # Arguments
/// * `config_path` - Configuration file path
/// * `output` - Output file, `dashboard.output` from the configuration when `None`
/// * `date` - Day to report on (`YYYY-MM-DD`), today when `None`
/// * `format` - HTML page or JSON snapshot
pub fn execute(
    config_path: &Path,
    output: Option<PathBuf>,
    date: Option<String>,
    format: DashboardFormat,
) -> Result<()> {
    let date = super::resolve_date(date)?;
    let (cfg, devtools, loaded) = super::load_devtools(config_path, &date)?;

    let summary = loaded?;
    info!(
        date = %date,
        requests = summary.requests,
        queries = summary.queries,
        logs = summary.logs,
        "Persisted data loaded"
    );

    let output = output.unwrap_or(cfg.dashboard.output);
    println!("{}", "Generating DevTools dashboard...".yellow());

    let dashboard = devtools.dashboard();
    let contents = match format {
        DashboardFormat::Html => dashboard.render(),
        DashboardFormat::Json => dashboard.to_json()?,
    };

    fs::write(&output, contents)
        .with_context(|| format!("Failed to write dashboard to {}", output.display()))?;

    println!(
        "{}",
        format!("✓ Dashboard generated: {}", output.display()).green()
    );
    Ok(())
}
