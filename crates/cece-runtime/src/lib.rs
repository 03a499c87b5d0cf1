//! # CeCe Runtime
//!
//! Population management, scheduling and persistence.
//!
//! The runtime owns the colony: it keeps the arena of top-level cells,
//! steps every cell's program once per tick, and applies the structural
//! requests those programs queue (bud creation, bud release, death) at
//! the tick boundary.

pub mod bud_policy;
pub mod colony;
pub mod config;
pub mod export;
pub mod layout;
pub mod metrics;
pub mod population;
pub mod programs;
pub mod session;
pub mod prelude;
