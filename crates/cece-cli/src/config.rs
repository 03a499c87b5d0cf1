//! Configuration management for the CeCe CLI.

use anyhow::{bail, Context, Result};
use cece::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "cece.toml";

/// CeCe project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub colony: ColonyConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub program: ProgramConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// The initial population: a grid of identical cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub grid: GridLayout,
    /// Template for every cell; its position is replaced by the grid's.
    #[serde(default = "default_cell")]
    pub cell: CellConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Where per-tick data is written. No export when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Jsonl,
}

// Default value functions
fn default_cell() -> CellConfig {
    CellConfig::new().volume(um3(70_000.0))
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            grid: GridLayout::default(),
            cell: default_cell(),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "jsonl" | "json-lines" => Ok(ExportFormat::Jsonl),
            other => bail!("Unknown export format '{}'. Use 'csv' or 'jsonl'.", other),
        }
    }
}

impl ExportFormat {
    /// Open a sink writing this format to `path`.
    pub fn open(self, path: &Path) -> Result<Box<dyn SnapshotSink>> {
        let sink: Box<dyn SnapshotSink> = match self {
            ExportFormat::Csv => Box::new(CsvSink::create(path)?),
            ExportFormat::Jsonl => Box::new(JsonLinesSink::create(path)?),
        };
        Ok(sink)
    }
}

impl Config {
    /// Load config from cece.toml in the current or parent directories.
    pub fn load() -> Result<Self> {
        let start = std::env::current_dir()?;
        match find_config_file(&start) {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Load config from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .colony
            .validate()
            .with_context(|| format!("Invalid [colony] section in {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = Self::to_toml(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Generate default config as TOML string.
    pub fn default_toml() -> Result<String> {
        Config::default().to_toml()
    }
}

/// Find cece.toml in `start` or one of its parents.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Get the CeCe data directory (.cece/).
pub fn data_dir() -> Result<PathBuf> {
    let dir = std::env::current_dir()?.join(".cece");
    Ok(dir)
}

/// Get the current session file path.
pub fn current_session_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("current.json"))
}
