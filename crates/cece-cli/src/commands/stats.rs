//! Show colony statistics.

use anyhow::{bail, Result};
use cece::prelude::*;
use colored::Colorize;

use crate::config::current_session_path;

pub fn run(json: bool) -> Result<()> {
    let session_path = current_session_path()?;

    if !session_path.exists() {
        bail!("No session found. Run {} first.", "cece run".cyan());
    }

    // Load session; programs are irrelevant for a read-only view
    let state = load_session(&session_path)?;
    let colony = colony_from_session(&state, bind(Inert))?;

    let stats = colony.stats();
    let metrics = compute_metrics(&colony.snapshot());

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("{}", "CeCe Colony Statistics".white().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();

    println!("{}", "Population".blue().bold());
    println!("  Tick:              {}", stats.tick.to_string().cyan());
    println!("  Cells:             {}", metrics.cells.to_string().cyan());
    println!("  Attached buds:     {}", metrics.buds.to_string().cyan());
    println!(
        "  Budding:           {} ({:.1}%)",
        stats.cells_budding.to_string().cyan(),
        metrics.budding_fraction * 100.0
    );
    println!("  Released cells:    {}", metrics.released.to_string().cyan());
    if let Some(program) = &state.metadata.program {
        println!("  Program:           {}", program.cyan());
    }
    println!();

    println!("{}", "Lifetime".blue().bold());
    println!("  Created:           {}", stats.total_created.to_string().green());
    println!("  Released:          {}", stats.total_released.to_string().green());
    println!("  Died:              {}", stats.total_died.to_string().red());
    println!();

    println!("{}", "Volume (µm³)".blue().bold());
    print_distribution(&metrics.volume);
    println!("  Total:             {:.1}", stats.total_volume);
    println!();

    println!("{}", "Fluorescence".blue().bold());
    for (name, d) in [
        ("GFP", &metrics.fluorescence.gfp),
        ("RFP", &metrics.fluorescence.rfp),
        ("YFP", &metrics.fluorescence.yfp),
    ] {
        println!(
            "  {}: mean {:.2}, median {:.2}, range {:.2}..{:.2}",
            name, d.mean, d.median, d.min, d.max
        );
    }

    println!();
    println!("{}", "═".repeat(40).dimmed());

    Ok(())
}

fn print_distribution(d: &cece::runtime::metrics::Distribution) {
    println!("  Mean:              {:.1}", d.mean);
    println!("  Median:            {:.1}", d.median);
    println!("  Min / max:         {:.1} / {:.1}", d.min, d.max);
}
