use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "devtools", version, about = "Request, query and module log inspection")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "devtools.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show request and query statistics (default)
    Stats {
        /// Day to report on (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Number of recent requests to list
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Generate the dashboard page
    Dashboard {
        /// Output file, defaults to dashboard.output from the configuration
        output: Option<PathBuf>,

        /// Day to report on (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value_t = DashboardFormat::Html)]
        format: DashboardFormat,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration
    Show,

    /// Validate configuration file
    Validate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardFormat {
    Html,
    Json,
}

impl Cli {
    /// Get the command to execute, defaulting to Stats if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Stats {
            date: None,
            limit: 10,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_stats() {
        let cli = Cli {
            config: PathBuf::from("devtools.toml"),
            command: None,
        };

        match cli.get_command() {
            Commands::Stats { date, limit } => {
                assert!(date.is_none());
                assert_eq!(limit, 10);
            }
            _ => panic!("Expected Stats command"),
        }
    }

    #[test]
    fn test_cli_parsing_stats_with_date() {
        let args = vec!["devtools", "stats", "--date", "2026-03-01", "--limit", "5"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Stats { date, limit } => {
                assert_eq!(date.as_deref(), Some("2026-03-01"));
                assert_eq!(limit, 5);
            }
            _ => panic!("Expected Stats command"),
        }
    }

    #[test]
    fn test_cli_parsing_dashboard() {
        let args = vec!["devtools", "dashboard"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Dashboard {
                output,
                date,
                format,
            } => {
                assert!(output.is_none());
                assert!(date.is_none());
                assert_eq!(format, DashboardFormat::Html);
            }
            _ => panic!("Expected Dashboard command"),
        }
    }

    #[test]
    fn test_cli_parsing_dashboard_output_and_json() {
        let args = vec!["devtools", "dashboard", "out.json", "-f", "json"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Dashboard { output, format, .. } => {
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert_eq!(format, DashboardFormat::Json);
            }
            _ => panic!("Expected Dashboard command"),
        }
    }

    #[test]
    fn test_cli_parsing_global_config() {
        let args = vec!["devtools", "config", "show", "--config", "/etc/devtools.toml"];
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/devtools.toml"));
        assert!(matches!(
            cli.get_command(),
            Commands::Config {
                action: ConfigCommands::Show
            }
        ));
    }
}
