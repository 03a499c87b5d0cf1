//! # CeCe
//!
//! Discrete-tick colony simulation of budding yeast cells.
//!
//! Every cell carries a volume, a position and three fluorescence channels
//! (GFP, RFP, YFP) and runs an update program once per tick. Programs can
//! grow the cell, adjust its channels and ask for a bud; the bud stays
//! attached to its mother until she releases it, at which point it becomes
//! an independent cell with its own program run.
//!
//! ## Quick Start
//!
//! ```rust
//! use cece::prelude::*;
//!
//! let mut colony = Colony::new();
//!
//! // A 10x10 grid of cells, 50 µm apart
//! let grid = GridLayout::new(10, 10, um(50.0).value());
//! let template = CellConfig::new().volume(um3(70_000.0));
//! for config in grid.configs(&template) {
//!     colony.create(config, StochasticExpression::default());
//! }
//!
//! colony.run(20).unwrap();
//!
//! let metrics = compute_metrics(&colony.snapshot());
//! println!("{} cells, {} buds", metrics.cells, metrics.buds);
//! ```
//!
//! ## Writing a program
//!
//! Any closure taking the cell handle and a random source is a program:
//!
//! ```rust
//! use cece::prelude::*;
//!
//! let mut colony = Colony::new();
//! colony.create(
//!     CellConfig::at(0.0, 0.0, 0.0).volume(um3(70_000.0)),
//!     |cell: &mut CellHandle<'_>, rng: &mut dyn RandomSource| {
//!         cell.add_volume(1_000.0 + rng.symmetric(500.0));
//!         cell.add_gfp(rng.symmetric(5.0));
//!         if let Some(mut bud) = cell.bud_mut() {
//!             bud.add_volume(5_000.0);
//!             if bud.volume() >= 30_000.0 {
//!                 cell.bud_release();
//!             }
//!         } else if cell.volume() >= 80_000.0 {
//!             cell.bud_create();
//!         }
//!     },
//! );
//! colony.run(50).unwrap();
//! assert!(colony.stats().total_released > 0);
//! ```
//!
//! ## Architecture
//!
//! - [`cece_core`] - Units, cell state, programs and the error type
//! - [`cece_runtime`] - Colony scheduler, bud seeding, export and sessions
//!
//! ## Session Persistence
//!
//! ```rust,ignore
//! use cece::prelude::*;
//! use std::path::Path;
//!
//! save_session(&colony, Path::new("session.json"))?;
//!
//! let state = load_session(Path::new("session.json"))?;
//! let restored = colony_from_session(&state, bind(YeastGrowth::default()))?;
//! ```

// Re-export all subcrates
pub use cece_core as core;
pub use cece_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use cece::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cece_core::types::{
        CellConfig, CellId, CellSnapshot,
        Channel, Fluorescence,
        LifecycleState,
        Position,
        Tick,
    };

    // Units
    pub use cece_core::units::*;

    // Cells and programs
    pub use cece_core::cell::{BudHandle, Cell, CellHandle};
    pub use cece_core::program::{bind, Binding, CellProgram, Inert, StructuralRequest};
    pub use cece_core::rng::{create_rng, RandomSource};

    // Error types
    pub use cece_core::error::{CeceError, Result};

    // Runtime
    pub use cece_runtime::colony::{Colony, ColonyEvent, ColonySnapshot, ColonyStats};
    pub use cece_runtime::config::{BudSeeding, ColonyConfig};
    pub use cece_runtime::bud_policy::{BudSeed, BudSeedPolicy};
    pub use cece_runtime::layout::GridLayout;
    pub use cece_runtime::programs::{ProgramConfig, StochasticExpression, YeastGrowth};
    pub use cece_runtime::metrics::{compute_metrics, ColonyMetrics};
    pub use cece_runtime::export::{CsvSink, JsonLinesSink, MemorySink, SnapshotSink};
    pub use cece_runtime::session::{
        save_session, load_session, restore_into_colony, colony_from_session,
        SessionState, SessionMetadata,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
