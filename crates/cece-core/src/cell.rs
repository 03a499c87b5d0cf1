//! Cell state and the handle a program mutates it through.
//!
//! A [`Cell`] owns at most one bud, stored inline as a boxed child. The bud
//! points back at its parent by id only, so ownership stays a tree.

use crate::program::{Binding, StructuralRequest};
use crate::types::{
    clamp_non_negative, CellConfig, CellId, CellSnapshot, Fluorescence, LifecycleState, Position,
    Tick,
};
use std::fmt;

/// A simulated yeast cell.
pub struct Cell {
    id: CellId,
    position: Position,
    volume: f64,
    fluorescence: Fluorescence,
    bud: Option<Box<Cell>>,
    parent: Option<CellId>,
    alive: bool,
    released: bool,
    born: Tick,
    program: Binding,
}

impl Cell {
    /// Create a top-level cell from its construction mapping.
    pub fn new(id: CellId, config: &CellConfig, program: Binding, born: Tick) -> Self {
        Self::with_state(
            id,
            config.position(),
            config.initial_volume(),
            config.fluorescence(),
            program,
            born,
        )
    }

    /// Create a cell from explicit state. Out-of-range values are clamped.
    pub fn with_state(
        id: CellId,
        position: Position,
        volume: f64,
        fluorescence: Fluorescence,
        program: Binding,
        born: Tick,
    ) -> Self {
        let mut cell = Self {
            id,
            position,
            volume,
            fluorescence,
            bud: None,
            parent: None,
            alive: true,
            released: false,
            born,
            program,
        };
        cell.clamp_state();
        cell
    }

    /// Rebuild a cell (and its bud) from a snapshot.
    pub fn from_snapshot(snapshot: &CellSnapshot, program: Binding) -> Self {
        let bud = snapshot
            .bud
            .as_deref()
            .map(|b| Box::new(Self::from_snapshot(b, program.clone())));
        let mut cell = Self {
            id: snapshot.id,
            position: snapshot.position,
            volume: snapshot.volume,
            fluorescence: snapshot.fluorescence,
            bud,
            parent: snapshot.parent,
            alive: snapshot.state.is_alive(),
            released: snapshot.released || snapshot.state == LifecycleState::Released,
            born: snapshot.born,
            program,
        };
        if let Some(bud) = cell.bud.as_deref_mut() {
            bud.parent = Some(cell.id);
        }
        cell.clamp_state();
        cell
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn fluorescence(&self) -> Fluorescence {
        self.fluorescence
    }

    pub fn bud(&self) -> Option<&Cell> {
        self.bud.as_deref()
    }

    pub fn bud_mut(&mut self) -> Option<&mut Cell> {
        self.bud.as_deref_mut()
    }

    pub fn has_bud(&self) -> bool {
        self.bud.is_some()
    }

    /// The cell that owns this one, while it is an unreleased bud.
    pub fn parent(&self) -> Option<CellId> {
        self.parent
    }

    pub fn is_bud(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn born(&self) -> Tick {
        self.born
    }

    pub fn program(&self) -> &Binding {
        &self.program
    }

    pub fn state(&self) -> LifecycleState {
        if !self.alive {
            LifecycleState::Dead
        } else if self.bud.as_deref().is_some_and(Cell::is_alive) {
            LifecycleState::Budding
        } else if self.released {
            LifecycleState::Released
        } else {
            LifecycleState::Unbudded
        }
    }

    /// This cell followed by its bud chain.
    pub fn lineage(&self) -> impl Iterator<Item = &Cell> {
        std::iter::successors(Some(self), |c| c.bud.as_deref())
    }

    /// Attach `bud` to this cell. Hands the bud back if the slot is taken.
    pub fn attach_bud(&mut self, mut bud: Cell) -> Result<(), Cell> {
        if self.bud.is_some() {
            return Err(bud);
        }
        bud.parent = Some(self.id);
        bud.released = false;
        self.bud = Some(Box::new(bud));
        Ok(())
    }

    /// Sever the bud relation. The returned cell is independent.
    pub fn detach_bud(&mut self) -> Option<Cell> {
        let mut bud = *self.bud.take()?;
        bud.parent = None;
        bud.released = true;
        Some(bud)
    }

    /// Mark this cell and everything it owns as dead.
    pub fn mark_dead(&mut self) {
        self.alive = false;
        if let Some(bud) = self.bud.as_deref_mut() {
            bud.mark_dead();
        }
    }

    /// Drop a dead bud from the slot. Returns its id when one was removed.
    pub fn remove_dead_bud(&mut self) -> Option<CellId> {
        if self.bud.as_deref().is_some_and(|b| !b.alive) {
            return self.bud.take().map(|b| b.id);
        }
        self.bud.as_deref_mut().and_then(Cell::remove_dead_bud)
    }

    /// Restore the non-negative invariants on volume and fluorescence.
    pub fn clamp_state(&mut self) {
        self.volume = clamp_non_negative(self.volume);
        self.fluorescence.clamp_non_negative();
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    pub fn fluorescence_mut(&mut self) -> &mut Fluorescence {
        &mut self.fluorescence
    }

    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            id: self.id,
            parent: self.parent,
            position: self.position,
            volume: self.volume,
            fluorescence: self.fluorescence,
            state: self.state(),
            released: self.released,
            born: self.born,
            bud: self.bud.as_deref().map(|b| Box::new(b.snapshot())),
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("volume", &self.volume)
            .field("fluorescence", &self.fluorescence)
            .field("state", &self.state())
            .field("parent", &self.parent)
            .field("bud", &self.bud)
            .field("program", &self.program.name())
            .finish()
    }
}

/// Mutable access to one cell during its update.
///
/// Exposes the cell's own fields, its bud, and the structural operations.
/// Structural operations only queue a [`StructuralRequest`]; the scheduler
/// applies them at the end of the tick.
pub struct CellHandle<'a> {
    cell: &'a mut Cell,
    tick: Tick,
    time_step: f64,
    requests: &'a mut Vec<StructuralRequest>,
}

impl<'a> CellHandle<'a> {
    pub fn new(
        cell: &'a mut Cell,
        tick: Tick,
        time_step: f64,
        requests: &'a mut Vec<StructuralRequest>,
    ) -> Self {
        Self {
            cell,
            tick,
            time_step,
            requests,
        }
    }

    pub fn id(&self) -> CellId {
        self.cell.id
    }

    /// The tick being computed.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Simulated seconds per tick.
    pub fn dt(&self) -> f64 {
        self.time_step
    }

    pub fn position(&self) -> Position {
        self.cell.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.cell.position = position;
    }

    pub fn x(&self) -> f64 {
        self.cell.position.x
    }

    pub fn y(&self) -> f64 {
        self.cell.position.y
    }

    pub fn z(&self) -> f64 {
        self.cell.position.z
    }

    pub fn set_x(&mut self, x: f64) {
        self.cell.position.x = x;
    }

    pub fn set_y(&mut self, y: f64) {
        self.cell.position.y = y;
    }

    pub fn set_z(&mut self, z: f64) {
        self.cell.position.z = z;
    }

    pub fn volume(&self) -> f64 {
        self.cell.volume
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.cell.volume = volume;
    }

    pub fn add_volume(&mut self, delta: f64) {
        self.cell.volume += delta;
    }

    pub fn gfp(&self) -> f64 {
        self.cell.fluorescence.gfp
    }

    pub fn rfp(&self) -> f64 {
        self.cell.fluorescence.rfp
    }

    pub fn yfp(&self) -> f64 {
        self.cell.fluorescence.yfp
    }

    pub fn set_gfp(&mut self, value: f64) {
        self.cell.fluorescence.gfp = value;
    }

    pub fn set_rfp(&mut self, value: f64) {
        self.cell.fluorescence.rfp = value;
    }

    pub fn set_yfp(&mut self, value: f64) {
        self.cell.fluorescence.yfp = value;
    }

    pub fn add_gfp(&mut self, delta: f64) {
        self.cell.fluorescence.gfp += delta;
    }

    pub fn add_rfp(&mut self, delta: f64) {
        self.cell.fluorescence.rfp += delta;
    }

    pub fn add_yfp(&mut self, delta: f64) {
        self.cell.fluorescence.yfp += delta;
    }

    pub fn fluorescence(&self) -> Fluorescence {
        self.cell.fluorescence
    }

    pub fn fluorescence_mut(&mut self) -> &mut Fluorescence {
        &mut self.cell.fluorescence
    }

    pub fn has_bud(&self) -> bool {
        self.cell.has_bud()
    }

    /// Whether this cell is itself an unreleased bud.
    pub fn is_bud(&self) -> bool {
        self.cell.is_bud()
    }

    pub fn bud(&self) -> Option<&Cell> {
        self.cell.bud()
    }

    pub fn bud_mut(&mut self) -> Option<BudHandle<'_>> {
        self.cell.bud_mut().map(|cell| BudHandle { cell })
    }

    /// Request a bud with the inherited program.
    ///
    /// Returns whether a request was queued. Cells that already own a bud,
    /// and unreleased buds themselves, cannot bud.
    pub fn bud_create(&mut self) -> bool {
        self.queue_bud_create(None)
    }

    /// Request a bud bound to a different program.
    pub fn bud_create_with(&mut self, program: Binding) -> bool {
        self.queue_bud_create(Some(program))
    }

    fn queue_bud_create(&mut self, program: Option<Binding>) -> bool {
        if self.cell.has_bud() || self.cell.is_bud() {
            return false;
        }
        let id = self.cell.id;
        if self.is_queued(|r| matches!(r, StructuralRequest::BudCreate { cell, .. } if *cell == id))
        {
            return false;
        }
        self.requests
            .push(StructuralRequest::BudCreate { cell: id, program });
        true
    }

    /// Request release of the current bud. No-op without one.
    pub fn bud_release(&mut self) -> bool {
        if !self.cell.has_bud() {
            return false;
        }
        let id = self.cell.id;
        if self.is_queued(|r| matches!(r, StructuralRequest::BudRelease { cell } if *cell == id)) {
            return false;
        }
        self.requests.push(StructuralRequest::BudRelease { cell: id });
        true
    }

    /// Request removal of this cell, and of its bud if it has one.
    pub fn kill(&mut self) -> bool {
        let id = self.cell.id;
        if self.is_queued(|r| matches!(r, StructuralRequest::Kill { cell } if *cell == id)) {
            return false;
        }
        self.requests.push(StructuralRequest::Kill { cell: id });
        true
    }

    fn is_queued(&self, pred: impl Fn(&StructuralRequest) -> bool) -> bool {
        self.requests.iter().any(pred)
    }
}

/// What a parent's program may change on its bud.
pub struct BudHandle<'a> {
    cell: &'a mut Cell,
}

impl BudHandle<'_> {
    pub fn id(&self) -> CellId {
        self.cell.id
    }

    pub fn volume(&self) -> f64 {
        self.cell.volume
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.cell.volume = volume;
    }

    pub fn add_volume(&mut self, delta: f64) {
        self.cell.volume += delta;
    }

    pub fn position(&self) -> Position {
        self.cell.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.cell.position = position;
    }

    pub fn fluorescence(&self) -> Fluorescence {
        self.cell.fluorescence
    }

    pub fn fluorescence_mut(&mut self) -> &mut Fluorescence {
        &mut self.cell.fluorescence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{bind, Inert};

    fn cell(id: u64, volume: f64) -> Cell {
        Cell::new(
            CellId(id),
            &CellConfig::new().volume(volume),
            bind(Inert),
            0,
        )
    }

    #[test]
    fn construction_clamps_negative_inputs() {
        let c = Cell::new(
            CellId(1),
            &CellConfig::new().volume(-5.0).gfp(-1.0).rfp(3.0),
            bind(Inert),
            0,
        );
        assert_eq!(c.volume(), 0.0);
        assert_eq!(c.fluorescence(), Fluorescence::new(0.0, 3.0, 0.0));
        assert_eq!(c.state(), LifecycleState::Unbudded);
    }

    #[test]
    fn attach_and_detach_bud() {
        let mut parent = cell(1, 100.0);
        parent.attach_bud(cell(2, 10.0)).unwrap();
        assert_eq!(parent.state(), LifecycleState::Budding);
        assert_eq!(parent.bud().map(Cell::parent), Some(Some(CellId(1))));

        let second = parent.attach_bud(cell(3, 10.0));
        assert_eq!(second.map_err(|c| c.id()), Err(CellId(3)));

        let bud = parent.detach_bud().unwrap();
        assert_eq!(bud.parent(), None);
        assert_eq!(bud.state(), LifecycleState::Released);
        assert_eq!(parent.state(), LifecycleState::Unbudded);
        assert!(parent.detach_bud().is_none());
    }

    #[test]
    fn death_propagates_to_bud() {
        let mut parent = cell(1, 100.0);
        parent.attach_bud(cell(2, 10.0)).unwrap();
        parent.mark_dead();
        assert_eq!(parent.state(), LifecycleState::Dead);
        assert!(!parent.bud().unwrap().is_alive());
    }

    #[test]
    fn dead_bud_is_removed_from_slot() {
        let mut parent = cell(1, 100.0);
        parent.attach_bud(cell(2, 10.0)).unwrap();
        parent.bud_mut().unwrap().mark_dead();
        assert_eq!(parent.state(), LifecycleState::Unbudded);
        assert_eq!(parent.remove_dead_bud(), Some(CellId(2)));
        assert!(!parent.has_bud());
    }

    #[test]
    fn handle_queues_requests_once() {
        let mut c = cell(1, 100.0);
        let mut requests = Vec::new();
        let mut handle = CellHandle::new(&mut c, 1, 1.0, &mut requests);

        assert!(handle.bud_create());
        assert!(!handle.bud_create());
        // No bud yet, so there is nothing to release.
        assert!(!handle.bud_release());
        assert!(handle.kill());
        assert!(!handle.kill());

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].cell(), CellId(1));
    }

    #[test]
    fn budding_cell_cannot_request_second_bud() {
        let mut c = cell(1, 100.0);
        c.attach_bud(cell(2, 10.0)).unwrap();
        let mut requests = Vec::new();
        let mut handle = CellHandle::new(&mut c, 1, 1.0, &mut requests);

        assert!(!handle.bud_create());
        assert!(handle.bud_release());
        handle.bud_mut().unwrap().add_volume(5.0);

        assert_eq!(c.bud().unwrap().volume(), 15.0);
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn bud_cannot_bud_before_release() {
        let mut parent = cell(1, 100.0);
        parent.attach_bud(cell(2, 10.0)).unwrap();
        let mut requests = Vec::new();
        let bud = parent.bud_mut().unwrap();
        let mut handle = CellHandle::new(bud, 1, 1.0, &mut requests);
        assert!(handle.is_bud());
        assert!(!handle.bud_create());
        assert!(requests.is_empty());
    }

    #[test]
    fn snapshot_roundtrip_keeps_relation() {
        let mut parent = cell(1, 100.0);
        parent.attach_bud(cell(2, 10.0)).unwrap();
        let snap = parent.snapshot();
        assert_eq!(snap.bud.as_ref().unwrap().parent, Some(CellId(1)));

        let restored = Cell::from_snapshot(&snap, bind(Inert));
        assert_eq!(restored.snapshot(), snap);
    }
}
