use anyhow::{Context, Result};
use colored::Colorize;
use devtools::config::{self, DevToolsConfig};
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Displays the effective configuration, file and environment overrides applied
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!(path = %config_path.display(), "Loading configuration for display");

    let cfg = config::load_config(config_path)?;

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&cfg).context("Failed to serialize configuration")?;
    println!("{}", toml_string);

    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!(path = %config_path.display(), "Validating configuration file");

    let cfg = config::load_config(config_path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    for line in summary_lines(&cfg) {
        println!("  {}", line);
    }

    info!("Configuration validation successful");
    Ok(())
}

fn summary_lines(cfg: &DevToolsConfig) -> Vec<String> {
    let storage = match (&cfg.storage.path, cfg.storage.enabled) {
        (Some(path), true) => format!(
            "{} ({})",
            path.display(),
            cfg.storage.format.extension()
        ),
        _ => "disabled".to_string(),
    };
    let logs = cfg
        .logs
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "in memory only".to_string());

    vec![
        format!("Capture: {}", if cfg.enabled { "enabled" } else { "disabled" }),
        format!("Storage: {}", storage),
        format!("Module Logs: {}", logs),
        format!("Slow Query Threshold: {} ms", cfg.slow_query_threshold_ms),
        format!("Dashboard Output: {}", cfg.dashboard.output.display()),
    ]
}
