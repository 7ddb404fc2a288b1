//! thermoelast CLI Binary

use anyhow::Result;
use clap::Parser;

use thermoelast_cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.debug.clone())),
        )
        .init();

    match cli.command {
        Commands::Run { settings } => {
            commands::run::execute(&settings)?;
        }
        Commands::Fill { input, system, ignore_residuals, ignore_rank, drop_atol } => {
            commands::fill::execute(
                &input,
                system.as_deref(),
                ignore_residuals,
                ignore_rank,
                drop_atol,
            )?;
        }
        Commands::Version => {
            commands::version::execute();
        }
    }

    Ok(())
}
