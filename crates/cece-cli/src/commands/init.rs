//! Initialize a new CeCe project.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};

pub fn run(path: Option<String>) -> Result<()> {
    let base_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    println!("{} Initializing CeCe project...", "→".blue());

    // Create .cece directory
    let cece_dir = base_path.join(".cece");
    std::fs::create_dir_all(&cece_dir)
        .with_context(|| format!("Failed to create {}", cece_dir.display()))?;
    println!("  {} Created {}", "✓".green(), cece_dir.display());

    // Create default config
    let config_path = base_path.join(CONFIG_FILE);
    if !config_path.exists() {
        let config = Config::default();
        config.save(&config_path)?;
        println!("  {} Created {}", "✓".green(), config_path.display());
    } else {
        println!("  {} {} already exists", "•".yellow(), config_path.display());
    }

    // Keep session state out of version control
    let gitignore_path = cece_dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, "current.json\n")?;
        println!("  {} Created {}", "✓".green(), gitignore_path.display());
    }

    println!();
    println!("{} CeCe project initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  {} edit {} to set up the grid and program", "1.".blue(), CONFIG_FILE);
    println!("  {} cece run --ticks 50", "2.".blue());
    println!("  {} cece stats", "3.".blue());

    Ok(())
}
