//! Convenience re-exports for common types.

pub use crate::cell::{BudHandle, Cell, CellHandle};
pub use crate::error::{CeceError, ConfigError, PopulationError, Result};
pub use crate::program::{bind, Binding, CellProgram, Inert, RequestKind, StructuralRequest};
pub use crate::rng::{create_rng, derive_cell_rng, derive_policy_rng, RandomSource};
pub use crate::types::*;
pub use crate::units::*;
