//! # CeCe Core
//!
//! Core types for the CeCe colony engine.
//!
//! This crate defines everything a per-cell update program touches:
//!
//! - **Units** - pure scaling from micrometres, microlitres, seconds, ... into
//!   the engine's internal base units
//! - **Cell** - position, volume, three fluorescence channels and an optional
//!   owned bud
//! - **CellProgram** - the per-tick update bound to every cell, invoked with an
//!   explicit [`CellHandle`](cell::CellHandle) and an injected
//!   [`RandomSource`](rng::RandomSource)
//! - **StructuralRequest** - bud creation, bud release and death, queued by a
//!   program and applied by the runtime at the tick boundary
//!
//! ## Quick Start
//!
//! ```rust
//! use cece_core::prelude::*;
//!
//! // 70 000 µm³ yeast at the origin with some green fluorescence
//! let config = CellConfig::new().volume(um3(70_000.0)).gfp(20.0);
//! assert_eq!(config.volume, Some(70_000.0));
//!
//! // Programs are plain closures
//! let program = |cell: &mut CellHandle<'_>, rng: &mut dyn RandomSource| {
//!     let delta = rng.uniform(-5.0, 5.0);
//!     cell.add_gfp(delta);
//! };
//! let _binding = bind(program);
//! ```

pub mod cell;
pub mod error;
pub mod program;
pub mod rng;
pub mod types;
pub mod units;
pub mod prelude;
