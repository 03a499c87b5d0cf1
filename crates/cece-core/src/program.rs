//! Update binding: the per-tick program attached to every cell.
//!
//! A program receives an explicit [`CellHandle`] instead of an implicit
//! receiver. Through it the program may read and mutate its own cell (and
//! the bud that cell owns) and queue structural requests. It cannot see any
//! other cell, which is what lets the runtime run programs in parallel.

use crate::cell::CellHandle;
use crate::rng::RandomSource;
use crate::types::CellId;
use std::fmt;
use std::sync::Arc;

/// A per-tick update program.
///
/// Any `Fn(&mut CellHandle<'_>, &mut dyn RandomSource) + Send + Sync`
/// closure is a program.
pub trait CellProgram: Send + Sync {
    /// Run one tick for the bound cell.
    fn update(&self, cell: &mut CellHandle<'_>, rng: &mut dyn RandomSource);

    /// Program name (for display and logging).
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> CellProgram for F
where
    F: Fn(&mut CellHandle<'_>, &mut dyn RandomSource) + Send + Sync,
{
    fn update(&self, cell: &mut CellHandle<'_>, rng: &mut dyn RandomSource) {
        self(cell, rng)
    }
}

/// A shared, immutable program binding. Buds share their parent's binding.
pub type Binding = Arc<dyn CellProgram>;

/// Wrap a program into a [`Binding`].
pub fn bind(program: impl CellProgram + 'static) -> Binding {
    Arc::new(program)
}

/// A program that leaves the cell untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inert;

impl CellProgram for Inert {
    fn update(&self, _cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource) {}

    fn name(&self) -> &str {
        "inert"
    }
}

/// Which structural change a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    BudCreate,
    BudRelease,
    Kill,
}

/// A queued change to population membership or cell relationships.
///
/// Requests are collected during the update phase and applied by the
/// runtime at the tick boundary: creations first, then releases, then
/// deaths, each in population iteration order.
#[derive(Clone)]
pub enum StructuralRequest {
    /// Attach a new bud to `cell`. `program` overrides the inherited binding.
    BudCreate { cell: CellId, program: Option<Binding> },
    /// Detach the bud of `cell` and make it a top-level cell.
    BudRelease { cell: CellId },
    /// Remove `cell` (and whatever bud it owns).
    Kill { cell: CellId },
}

impl StructuralRequest {
    pub fn cell(&self) -> CellId {
        match self {
            StructuralRequest::BudCreate { cell, .. }
            | StructuralRequest::BudRelease { cell }
            | StructuralRequest::Kill { cell } => *cell,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            StructuralRequest::BudCreate { .. } => RequestKind::BudCreate,
            StructuralRequest::BudRelease { .. } => RequestKind::BudRelease,
            StructuralRequest::Kill { .. } => RequestKind::Kill,
        }
    }
}

impl fmt::Debug for StructuralRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralRequest::BudCreate { cell, program } => f
                .debug_struct("BudCreate")
                .field("cell", cell)
                .field("program", &program.as_ref().map(|p| p.name().to_string()))
                .finish(),
            StructuralRequest::BudRelease { cell } => {
                f.debug_struct("BudRelease").field("cell", cell).finish()
            }
            StructuralRequest::Kill { cell } => f.debug_struct("Kill").field("cell", cell).finish(),
        }
    }
}
