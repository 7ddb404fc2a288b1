//! thermoelast CLI Interface

pub mod commands;
pub mod writer;

use std::path::PathBuf;

use clap::Parser;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "thermoelast")]
#[command(about = "Thermal elastic moduli under the quasi-harmonic approximation", long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub debug: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Parser, Debug)]
pub enum Commands {
    /// Run the full calculation described by a settings file
    Run {
        /// Settings file (YAML or JSON, selected by extension)
        settings: PathBuf,
    },

    /// Fill non-zero c_ij columns of an elastic-constant table based on
    /// crystal symmetry and print the result
    Fill {
        /// Elastic-constant table (input 2 format)
        input: PathBuf,

        /// Crystal system name
        #[arg(short, long)]
        system: Option<String>,

        #[arg(long)]
        ignore_residuals: bool,

        #[arg(long)]
        ignore_rank: bool,

        #[arg(long, default_value_t = 1e-8)]
        drop_atol: f64,
    },

    /// Print version information
    Version,
}
