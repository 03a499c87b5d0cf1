//! Run the colony simulation.

use anyhow::{Context, Result};
use cece::prelude::*;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::{current_session_path, Config, ExportFormat, CONFIG_FILE};

/// Options of the `run` subcommand.
pub struct RunArgs {
    pub ticks: u64,
    pub seed: Option<u64>,
    pub export: Option<String>,
    pub format: Option<String>,
    pub fresh: bool,
}

pub fn run(args: RunArgs, verbose: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(seed) = args.seed {
        config.colony.seed = seed;
    }
    if let Some(seeding) = config.program.bud_seeding() {
        if seeding != config.colony.bud_seeding {
            warn!(
                suggested = ?seeding,
                "[colony] bud_seeding does not match the program's thresholds"
            );
        }
    }
    let program = config.program.to_binding();
    let session_path = current_session_path()?;

    let mut colony = if session_path.exists() && !args.fresh {
        println!("{} Loading session...", "→".blue());
        let state = load_session(&session_path)
            .with_context(|| format!("Failed to load {}", session_path.display()))?;
        if state.config != config.colony {
            warn!("[colony] settings differ from the saved session; continuing with {}", CONFIG_FILE);
        }
        let mut colony = Colony::from_config(config.colony.clone())?;
        restore_into_colony(&mut colony, &state, program)?;
        colony
    } else {
        println!("{} Building scenario...", "→".blue());
        build_scenario(&config, program)?
    };
    debug!(seed = config.colony.seed, cells = colony.len(), "colony ready");

    let initial_stats = colony.stats();
    println!(
        "  Start: tick {}, {} cells, {} budding",
        initial_stats.tick.to_string().cyan(),
        initial_stats.cells_alive.to_string().cyan(),
        initial_stats.cells_budding.to_string().cyan()
    );

    // Export sink
    let export_path = args.export.or_else(|| config.export.path.clone());
    let format = match args.format {
        Some(f) => f.parse::<ExportFormat>()?,
        None => config.export.format,
    };
    let mut sink = match &export_path {
        Some(path) => Some(
            format
                .open(Path::new(path))
                .with_context(|| format!("Failed to open export file: {}", path))?,
        ),
        None => None,
    };

    // Run simulation
    println!(
        "{} Running {} ticks...",
        "→".blue(),
        args.ticks.to_string().cyan()
    );

    let pb = ProgressBar::new(args.ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ticks")?
            .progress_chars("#>-"),
    );

    for _ in 0..args.ticks {
        let events = colony.tick()?;
        if let Some(sink) = sink.as_mut() {
            sink.record(&colony.snapshot())?;
        }
        if verbose {
            let created = events
                .iter()
                .filter(|e| matches!(e, ColonyEvent::BudCreated { .. }))
                .count();
            let released = events
                .iter()
                .filter(|e| matches!(e, ColonyEvent::BudReleased { .. }))
                .count();
            if created + released > 0 {
                pb.println(format!(
                    "  tick {}: {} buds created, {} released",
                    colony.current_tick(),
                    created,
                    released
                ));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if let Some(sink) = sink.as_mut() {
        sink.finish()?;
    }

    // Save session
    save_session(&colony, &session_path)
        .with_context(|| format!("Failed to save {}", session_path.display()))?;

    // Print stats
    let final_stats = colony.stats();
    println!();
    println!("{} Simulation complete!", "✓".green().bold());
    println!(
        "  Cells:    {} → {}",
        initial_stats.cells_alive.to_string().yellow(),
        final_stats.cells_alive.to_string().green()
    );
    println!(
        "  Budding:  {} → {}",
        initial_stats.cells_budding.to_string().yellow(),
        final_stats.cells_budding.to_string().green()
    );
    println!(
        "  Released: {} → {}",
        initial_stats.total_released.to_string().yellow(),
        final_stats.total_released.to_string().green()
    );
    if let Some(path) = export_path {
        println!("  Exported: {}", path.cyan());
    }

    Ok(())
}

/// Build the configured grid of cells, every one bound to `program`.
fn build_scenario(config: &Config, program: Binding) -> Result<Colony> {
    let mut colony =
        Colony::from_config(config.colony.clone()).context("Invalid [colony] configuration")?;
    for cell in config.scenario.grid.configs(&config.scenario.cell) {
        colony.create_with_binding(cell, program.clone());
    }
    Ok(colony)
}
