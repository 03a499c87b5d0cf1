//! The arena of top-level cells.
//!
//! Top-level cells live in a vector in insertion order. Buds are stored
//! inside their parent and reached through it; an ownership index maps
//! every registered id to the top-level cell that holds it.

use cece_core::cell::Cell;
use cece_core::error::{CeceError, PopulationError, Result};
use cece_core::program::Binding;
use cece_core::types::{CellConfig, CellId, Tick};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Population {
    roots: Vec<Cell>,
    /// Top-level id -> slot in `roots`.
    index: HashMap<CellId, usize>,
    /// Any registered id -> id of the top-level cell owning it.
    owners: HashMap<CellId, CellId>,
    next_id: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh id. Ids are never reused.
    pub fn allocate_id(&mut self) -> CellId {
        let id = CellId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The id the next allocation will return.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Make sure future ids start at `next` or later.
    pub fn reserve_ids(&mut self, next: u64) {
        self.next_id = self.next_id.max(next);
    }

    /// Create a top-level cell with a freshly allocated id.
    pub fn create(&mut self, config: &CellConfig, program: Binding, born: Tick) -> CellId {
        let id = self.allocate_id();
        self.push_root(Cell::new(id, config, program, born));
        id
    }

    /// Insert an existing cell (and its bud) as a top-level member.
    pub fn insert(&mut self, cell: Cell) -> Result<CellId> {
        if let Some(dup) = cell.lineage().find(|c| self.owners.contains_key(&c.id())) {
            return Err(CeceError::duplicate_cell(dup.id()));
        }
        let max = cell.lineage().map(|c| c.id().0).max().unwrap_or(0);
        self.reserve_ids(max + 1);
        Ok(self.push_root(cell))
    }

    fn push_root(&mut self, cell: Cell) -> CellId {
        let id = cell.id();
        for member in cell.lineage() {
            self.owners.insert(member.id(), id);
        }
        self.index.insert(id, self.roots.len());
        self.roots.push(cell);
        id
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.owners.contains_key(&id)
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        let owner = self.owners.get(&id)?;
        let slot = *self.index.get(owner)?;
        self.roots.get(slot)?.lineage().find(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.locate_mut(id).ok().flatten()
    }

    /// Find a registered cell. An id that is indexed but cannot be reached
    /// is population corruption.
    fn locate_mut(&mut self, id: CellId) -> Result<Option<&mut Cell>> {
        let Some(owner) = self.owners.get(&id).copied() else {
            return Ok(None);
        };
        let slot = self
            .index
            .get(&owner)
            .copied()
            .ok_or(PopulationError::Unreachable(id))?;
        let mut current = self.roots.get_mut(slot);
        while let Some(cell) = current {
            if cell.id() == id {
                return Ok(Some(cell));
            }
            current = cell.bud_mut();
        }
        Err(PopulationError::Unreachable(id).into())
    }

    /// Top-level cells in iteration order.
    pub fn roots(&self) -> &[Cell] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut [Cell] {
        &mut self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.roots.iter()
    }

    /// Every cell including unreleased buds, parents before their buds.
    pub fn iter_all(&self) -> impl Iterator<Item = &Cell> {
        self.roots.iter().flat_map(Cell::lineage)
    }

    /// Number of top-level cells.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of registered cells including buds.
    pub fn total_len(&self) -> usize {
        self.owners.len()
    }

    /// Give `parent` a bud. Returns the bud back if the parent cannot take
    /// one (gone, dead, already budding, or a bud itself).
    pub fn attach_bud(&mut self, parent: CellId, bud: Cell) -> Result<std::result::Result<CellId, Cell>> {
        if self.owners.contains_key(&bud.id()) {
            return Err(CeceError::duplicate_cell(bud.id()));
        }
        let Some(owner) = self.owners.get(&parent).copied() else {
            return Ok(Err(bud));
        };
        let Some(host) = self.locate_mut(parent)? else {
            return Ok(Err(bud));
        };
        if !host.is_alive() || host.is_bud() {
            return Ok(Err(bud));
        }
        let bud_id = bud.id();
        match host.attach_bud(bud) {
            Ok(()) => {
                self.owners.insert(bud_id, owner);
                Ok(Ok(bud_id))
            }
            Err(bud) => Ok(Err(bud)),
        }
    }

    /// Detach the bud of `parent` and append it as a top-level cell.
    ///
    /// `on_release` sees mother and daughter after the relation is severed
    /// and before the daughter joins the population. Returns the released
    /// id, or `None` when `parent` has no bud.
    pub fn release_bud(
        &mut self,
        parent: CellId,
        on_release: impl FnOnce(&mut Cell, &mut Cell),
    ) -> Result<Option<CellId>> {
        let Some(host) = self.locate_mut(parent)? else {
            return Ok(None);
        };
        if !host.is_alive() {
            return Ok(None);
        }
        if let Some(bud) = host.bud() {
            if bud.parent() != Some(parent) {
                return Err(PopulationError::BrokenRelation {
                    bud: bud.id(),
                    owner: parent,
                    recorded: bud.parent(),
                }
                .into());
            }
            if !bud.is_alive() {
                return Ok(None);
            }
        }
        let Some(mut bud) = host.detach_bud() else {
            return Ok(None);
        };
        on_release(host, &mut bud);
        Ok(Some(self.push_root(bud)))
    }

    /// Mark a cell (and anything it owns) dead. Returns whether it was alive.
    pub fn mark_dead(&mut self, id: CellId) -> Result<bool> {
        match self.locate_mut(id)? {
            Some(cell) if cell.is_alive() => {
                cell.mark_dead();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Remove dead cells. Returns the removed ids in iteration order.
    pub fn compact(&mut self) -> Vec<CellId> {
        let mut removed = Vec::new();
        let mut write = 0;
        for read in 0..self.roots.len() {
            if !self.roots[read].is_alive() {
                removed.extend(self.roots[read].lineage().map(Cell::id));
                continue;
            }
            if let Some(bud) = self.roots[read].remove_dead_bud() {
                removed.push(bud);
            }
            self.roots.swap(write, read);
            write += 1;
        }
        if removed.is_empty() {
            return removed;
        }
        self.roots.truncate(write);
        for id in &removed {
            self.owners.remove(id);
            self.index.remove(id);
        }
        for (slot, cell) in self.roots.iter().enumerate() {
            self.index.insert(cell.id(), slot);
        }
        removed
    }

    /// Check that the ownership index agrees with the cell tree.
    pub fn verify(&self) -> Result<()> {
        let mut reachable = 0;
        for (slot, root) in self.roots.iter().enumerate() {
            if self.index.get(&root.id()) != Some(&slot)
                || self.owners.get(&root.id()) != Some(&root.id())
            {
                return Err(PopulationError::Unreachable(root.id()).into());
            }
            if root.parent().is_some() {
                return Err(PopulationError::BrokenRelation {
                    bud: root.id(),
                    owner: root.id(),
                    recorded: root.parent(),
                }
                .into());
            }
            reachable += 1;
            let mut owner = root;
            while let Some(bud) = owner.bud() {
                if bud.parent() != Some(owner.id()) {
                    return Err(PopulationError::BrokenRelation {
                        bud: bud.id(),
                        owner: owner.id(),
                        recorded: bud.parent(),
                    }
                    .into());
                }
                if self.owners.get(&bud.id()) != Some(&root.id()) {
                    return Err(PopulationError::Unreachable(bud.id()).into());
                }
                reachable += 1;
                owner = bud;
            }
        }
        if reachable != self.owners.len() {
            let stray = self
                .owners
                .keys()
                .copied()
                .find(|id| self.get(*id).is_none())
                .unwrap_or(CellId(u64::MAX));
            return Err(PopulationError::Unreachable(stray).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cece_core::program::{bind, Inert};

    fn add(pop: &mut Population, volume: f64) -> CellId {
        pop.create(&CellConfig::new().volume(volume), bind(Inert), 0)
    }

    fn bud_for(pop: &mut Population) -> Cell {
        let id = pop.allocate_id();
        Cell::new(id, &CellConfig::new().volume(1.0), bind(Inert), 0)
    }

    #[test]
    fn ids_are_sequential_and_unique() {
        let mut pop = Population::new();
        let a = add(&mut pop, 1.0);
        let b = add(&mut pop, 1.0);
        assert_eq!((a, b), (CellId(0), CellId(1)));
        assert_eq!(pop.len(), 2);
        pop.verify().unwrap();
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut pop = Population::new();
        let a = add(&mut pop, 1.0);
        let clone = Cell::new(a, &CellConfig::new(), bind(Inert), 0);
        let err = pop.insert(clone).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn insert_moves_id_counter_past_inserted_ids() {
        let mut pop = Population::new();
        pop.insert(Cell::new(CellId(41), &CellConfig::new(), bind(Inert), 0))
            .unwrap();
        assert_eq!(add(&mut pop, 1.0), CellId(42));
    }

    #[test]
    fn bud_is_reachable_through_parent_only() {
        let mut pop = Population::new();
        let parent = add(&mut pop, 10.0);
        let bud = bud_for(&mut pop);
        let bud_id = pop.attach_bud(parent, bud).unwrap().unwrap();

        assert_eq!(pop.len(), 1);
        assert_eq!(pop.total_len(), 2);
        assert_eq!(pop.get(bud_id).unwrap().parent(), Some(parent));
        assert_eq!(pop.iter_all().count(), 2);
        pop.verify().unwrap();

        let second = bud_for(&mut pop);
        assert!(pop.attach_bud(parent, second).unwrap().is_err());
    }

    #[test]
    fn release_appends_bud_as_top_level() {
        let mut pop = Population::new();
        let parent = add(&mut pop, 10.0);
        let other = add(&mut pop, 10.0);
        let bud = bud_for(&mut pop);
        let bud_id = pop.attach_bud(parent, bud).unwrap().unwrap();

        let released = pop.release_bud(parent, |_, _| {}).unwrap();
        assert_eq!(released, Some(bud_id));

        let order: Vec<CellId> = pop.iter().map(Cell::id).collect();
        assert_eq!(order, vec![parent, other, bud_id]);
        assert!(!pop.get(parent).unwrap().has_bud());
        assert_eq!(pop.get(bud_id).unwrap().parent(), None);
        pop.verify().unwrap();

        assert_eq!(pop.release_bud(parent, |_, _| {}).unwrap(), None);
    }

    #[test]
    fn compact_removes_dead_roots_and_buds() {
        let mut pop = Population::new();
        let a = add(&mut pop, 1.0);
        let b = add(&mut pop, 1.0);
        let c = add(&mut pop, 1.0);
        let bud = bud_for(&mut pop);
        let bud_id = pop.attach_bud(c, bud).unwrap().unwrap();

        assert!(pop.mark_dead(b).unwrap());
        assert!(pop.mark_dead(bud_id).unwrap());
        assert!(!pop.mark_dead(b).unwrap());

        let removed = pop.compact();
        assert_eq!(removed, vec![b, bud_id]);
        let order: Vec<CellId> = pop.iter().map(Cell::id).collect();
        assert_eq!(order, vec![a, c]);
        assert!(!pop.contains(b));
        assert!(!pop.get(c).unwrap().has_bud());
        pop.verify().unwrap();
    }

    #[test]
    fn killing_parent_removes_its_bud() {
        let mut pop = Population::new();
        let parent = add(&mut pop, 1.0);
        let bud = bud_for(&mut pop);
        let bud_id = pop.attach_bud(parent, bud).unwrap().unwrap();

        pop.mark_dead(parent).unwrap();
        assert_eq!(pop.compact(), vec![parent, bud_id]);
        assert!(pop.is_empty());
        assert_eq!(pop.total_len(), 0);
    }
}
