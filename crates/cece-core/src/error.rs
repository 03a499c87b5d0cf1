//! Error types for CeCe operations.
//!
//! Invalid structural requests and out-of-range quantities are recovered
//! locally (no-op and clamping). Only configuration mistakes, I/O failures
//! and population corruption surface as errors; the last one aborts the
//! tick that detected it.

use crate::types::CellId;
use thiserror::Error;

/// Result type for CeCe operations.
pub type Result<T> = std::result::Result<T, CeceError>;

/// Errors that can occur during CeCe operations.
#[derive(Debug, Error)]
pub enum CeceError {
    /// Configuration errors.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// The population's ownership bookkeeping is inconsistent.
    #[error("Population error: {0}")]
    Population(#[from] PopulationError),
    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid value.
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    /// Out of range.
    #[error("{field} out of range: {value} (must be {min}-{max})")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// Population corruption. Fatal for the tick that hits it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PopulationError {
    /// A cell id is already registered.
    #[error("Duplicate cell id: {0}")]
    DuplicateCell(CellId),
    /// The ownership index points at a cell that cannot be reached.
    #[error("Cell {0} is indexed but not reachable from its owner")]
    Unreachable(CellId),
    /// A bud's back-reference disagrees with the cell that owns it.
    #[error("Bud {bud} points at {recorded:?} but is owned by {owner}")]
    BrokenRelation {
        bud: CellId,
        owner: CellId,
        recorded: Option<CellId>,
    },
}

// Convenience constructors
impl CeceError {
    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CeceError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        })
    }

    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, value: f64) -> Self {
        CeceError::Config(ConfigError::OutOfRange {
            field: field.into(),
            min,
            max,
            value,
        })
    }

    pub fn duplicate_cell(id: CellId) -> Self {
        CeceError::Population(PopulationError::DuplicateCell(id))
    }

    /// Whether this error means the population can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CeceError::Population(_))
    }
}
