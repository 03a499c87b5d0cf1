//! CeCe Runtime Prelude: convenient imports for common usage.
//!
//! ```rust
//! use cece_runtime::prelude::*;
//! ```

// Re-export colony
pub use crate::colony::{Colony, ColonyCounters, ColonyEvent, ColonySnapshot, ColonyStats};

// Re-export configuration and bud seeding
pub use crate::bud_policy::{split_by_volume, BudSeed, BudSeedPolicy, InheritSeeding, OffsetSeeding};
pub use crate::config::{BudSeeding, ColonyConfig};

// Re-export programs and layout
pub use crate::layout::GridLayout;
pub use crate::programs::{ProgramConfig, StochasticExpression, YeastGrowth};

// Re-export export sinks and session
pub use crate::export::{CsvSink, JsonLinesSink, MemorySink, SnapshotSink, CSV_HEADER};
pub use crate::session::{
    colony_from_session, load_session, restore_into_colony, save_session, verify_fidelity,
    SessionMetadata, SessionState,
};

// Re-export metrics
pub use crate::metrics::{compute_metrics, ChannelMetrics, ColonyMetrics, Distribution};

pub use crate::population::Population;

// Re-export from core
pub use cece_core::prelude::*;
