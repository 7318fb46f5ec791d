use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use devtools::init_tracing;

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    init_tracing();

    // Dispatch to appropriate command handler
    match args.get_command() {
        cli::Commands::Stats { date, limit } => {
            commands::stats::execute(&args.config, date, limit)?;
        }
        cli::Commands::Dashboard {
            output,
            date,
            format,
        } => {
            commands::dashboard::execute(&args.config, output, date, format)?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("DevTools v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
