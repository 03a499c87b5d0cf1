//! Session persistence: save and load colony state as JSON.
//!
//! A session holds the configuration, tick counter, running totals and the
//! full cell tree. Programs are code, so they are not persisted: whoever
//! restores a session supplies the binding every restored cell runs.

use crate::colony::{Colony, ColonyCounters};
use crate::config::ColonyConfig;
use crate::population::Population;
use cece_core::cell::Cell;
use cece_core::error::Result;
use cece_core::program::Binding;
use cece_core::types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Serializable colony state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub metadata: SessionMetadata,
    #[serde(default)]
    pub config: ColonyConfig,
    /// Top-level cells in iteration order, buds nested.
    pub cells: Vec<CellSnapshot>,
}

/// Session metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub tick: Tick,
    /// First id not yet handed out.
    pub next_id: u64,
    pub cell_count: usize,
    #[serde(default)]
    pub bud_count: usize,
    #[serde(default)]
    pub counters: ColonyCounters,
    /// Name of the program the first cell was bound to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

impl SessionState {
    /// Capture the current state of `colony`.
    pub fn capture(colony: &Colony) -> Self {
        let cells: Vec<CellSnapshot> = colony.iter().map(Cell::snapshot).collect();
        let bud_count = cells.iter().map(|c| c.lineage().count() - 1).sum();
        Self {
            metadata: SessionMetadata {
                session_id: uuid::Uuid::new_v4().to_string(),
                tick: colony.current_tick(),
                next_id: colony.population().next_id(),
                cell_count: cells.len(),
                bud_count,
                counters: colony.counters(),
                program: colony.iter().next().map(|c| c.program().name().to_string()),
            },
            config: colony.config().clone(),
            cells,
        }
    }
}

/// Save the colony state to a JSON file.
pub fn save_session(colony: &Colony, path: &Path) -> Result<()> {
    let state = SessionState::capture(colony);
    let json = serde_json::to_string_pretty(&state)?;

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, json)?;
    debug!(path = %path.display(), cells = state.metadata.cell_count, "session saved");
    Ok(())
}

/// Load a saved session from JSON.
pub fn load_session(path: &Path) -> Result<SessionState> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Replace the population of `colony` with the saved cells.
///
/// Every restored cell is bound to `program`. The tick counter, running
/// totals and id counter are restored too, so new ids never collide with
/// restored ones.
pub fn restore_into_colony(colony: &mut Colony, state: &SessionState, program: Binding) -> Result<()> {
    let mut population = Population::new();
    for snapshot in &state.cells {
        population.insert(Cell::from_snapshot(snapshot, program.clone()))?;
    }
    population.reserve_ids(state.metadata.next_id);
    population.verify()?;

    colony.restore(population, state.metadata.tick, state.metadata.counters);
    debug!(
        session = %state.metadata.session_id,
        tick = state.metadata.tick,
        cells = state.cells.len(),
        "session restored"
    );
    Ok(())
}

/// Build a fresh colony from a saved session.
pub fn colony_from_session(state: &SessionState, program: Binding) -> Result<Colony> {
    let mut colony = Colony::from_config(state.config.clone())?;
    restore_into_colony(&mut colony, state, program)?;
    Ok(colony)
}

/// Check that two colonies hold identical cells at the same tick.
pub fn verify_fidelity(original: &Colony, restored: &Colony) -> bool {
    original.current_tick() == restored.current_tick()
        && original
            .iter()
            .map(Cell::snapshot)
            .eq(restored.iter().map(Cell::snapshot))
}
