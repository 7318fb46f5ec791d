//! Stats command implementation
//!
//! Prints the most recent requests and the query statistics persisted by a
//! running application for one day.

use anyhow::Result;
use colored::Colorize;
use devtools::{DevToolsError, QueryStatistics, RequestEntry};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Execute the stats command
///
/// # Arguments
/// * `config_path` - Configuration file path
/// * `date` - Day to report on (`YYYY-MM-DD`), today when `None`
/// * `limit` - Number of recent requests to list
pub fn execute(config_path: &Path, date: Option<String>, limit: usize) -> Result<()> {
    let date = super::resolve_date(date)?;
    println!("{}", format!("Loading DevTools data for {}...", date).yellow());

    let (_cfg, devtools, loaded) = super::load_devtools(config_path, &date)?;
    match loaded {
        Ok(summary) => info!(
            date = %date,
            requests = summary.requests,
            queries = summary.queries,
            "Persisted data loaded"
        ),
        Err(DevToolsError::DashboardUnavailable(_)) => {
            eprintln!("{}", "Storage is not configured in devtools.toml".red());
            eprintln!();
            eprintln!("To enable, add the following to your devtools.toml:");
            eprintln!("[storage]");
            eprintln!("enabled = true");
            eprintln!("path = \"storage/devtools\"");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let recent = devtools.requests.recent_entries(limit);
    let statistics = devtools
        .queries
        .statistics_with_threshold(devtools.settings().slow_query_threshold_ms);

    println!();
    print!("{}", render_stats_report(&recent, &statistics));
    Ok(())
}

/// Plain-text report of recent requests and query statistics
pub fn render_stats_report(recent: &[Arc<RequestEntry>], statistics: &QueryStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "DevTools Statistics:");
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out);

    let _ = writeln!(out, "Recent Requests: {}", recent.len());
    for entry in recent {
        let _ = writeln!(
            out,
            "  {} {} [{}] - {:.2} ms",
            entry.request().method,
            entry.request().path,
            entry.status_code().unwrap_or(0),
            entry.duration()
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Query Statistics:");
    let _ = writeln!(out, "  Total Queries: {}", statistics.total_queries);
    let _ = writeln!(out, "  Total Duration: {:.2} ms", statistics.total_duration);
    let _ = writeln!(out, "  Avg Duration: {:.2} ms", statistics.avg_duration);
    let _ = writeln!(out, "  Slow Queries: {}", statistics.slow_queries);
    let _ = writeln!(out);

    out
}
