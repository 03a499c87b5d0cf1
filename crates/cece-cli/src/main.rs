//! CeCe CLI - Command-line interface for budding yeast colony simulation.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cece")]
#[command(author, version, about = "CeCe - Budding yeast colony simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new CeCe project
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Run the colony simulation
    Run {
        /// Number of ticks to run
        #[arg(short, long, default_value = "50")]
        ticks: u64,

        /// Override the colony seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write per-tick cell data to this file
        #[arg(short, long)]
        export: Option<String>,

        /// Export format (csv or jsonl)
        #[arg(short, long)]
        format: Option<String>,

        /// Ignore the saved session and start from the scenario
        #[arg(long)]
        fresh: bool,
    },

    /// Show colony statistics
    Stats {
        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init { path } => commands::init::run(path),
        Commands::Run {
            ticks,
            seed,
            export,
            format,
            fresh,
        } => commands::run::run(
            commands::run::RunArgs {
                ticks,
                seed,
                export,
                format,
                fresh,
            },
            cli.verbose,
        ),
        Commands::Stats { json } => commands::stats::run(json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic]
    fn installing_a_second_subscriber_fails_loudly() {
        init_tracing(false);
        init_tracing(true);
    }
}
