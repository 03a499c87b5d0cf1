//! Colony: the population stepper.
//!
//! Each tick:
//! 1. Every live top-level cell runs its program, then its bud runs its own
//! 2. Volume and fluorescence of every touched cell are clamped to `>= 0`
//! 3. Queued structural requests are applied: bud creations, then bud
//!    releases, then deaths, each in population order
//! 4. Dead cells are compacted out and the tick counter advances
//!
//! Programs only ever see their own cell, so step 1 may run on the rayon
//! pool. Every cell draws from its own random stream, derived from the
//! colony seed, its id and the tick, which keeps parallel and sequential
//! runs identical.

use crate::bud_policy::BudSeedPolicy;
use crate::config::ColonyConfig;
use crate::export::SnapshotSink;
use crate::population::Population;
use cece_core::cell::{Cell, CellHandle};
use cece_core::error::Result;
use cece_core::program::{bind, Binding, CellProgram, RequestKind, StructuralRequest};
use cece_core::rng::{derive_cell_rng, derive_policy_rng, RandomSource};
use cece_core::types::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Event emitted by the colony during simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColonyEvent {
    /// A bud was attached to its parent.
    BudCreated { parent: CellId, bud: CellId },
    /// A bud left its parent and became a top-level cell.
    BudReleased { parent: CellId, cell: CellId },
    /// A cell was removed from the population.
    Died { id: CellId },
    /// A tick completed.
    TickComplete { tick: Tick, cells: usize, buds: usize },
}

/// Statistics about the colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyStats {
    pub tick: Tick,
    /// Top-level cells.
    pub cells_alive: usize,
    /// Cells currently owning a live bud.
    pub cells_budding: usize,
    pub total_created: usize,
    pub total_released: usize,
    pub total_died: usize,
    /// Volume of every live cell, buds included.
    pub total_volume: f64,
    pub mean_gfp: f64,
    pub mean_rfp: f64,
    pub mean_yfp: f64,
}

/// Immutable view of the population after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonySnapshot {
    pub tick: Tick,
    /// Top-level cells in iteration order, each with its bud nested.
    pub cells: Vec<CellSnapshot>,
    pub stats: ColonyStats,
}

impl ColonySnapshot {
    /// Every cell in the snapshot, parents before their buds.
    pub fn all_cells(&self) -> impl Iterator<Item = &CellSnapshot> {
        self.cells.iter().flat_map(CellSnapshot::lineage)
    }
}

/// Running totals kept across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColonyCounters {
    pub total_created: usize,
    pub total_released: usize,
    pub total_died: usize,
}

/// Owns the population and advances it tick by tick.
pub struct Colony {
    population: Population,
    config: ColonyConfig,
    policy: Box<dyn BudSeedPolicy>,
    tick: Tick,
    counters: ColonyCounters,
    event_history: Vec<(Tick, ColonyEvent)>,
}

impl Colony {
    /// Create a new colony with default configuration.
    pub fn new() -> Self {
        Self::build(ColonyConfig::default())
    }

    /// Create a new colony with the specified configuration.
    pub fn from_config(config: ColonyConfig) -> Result<Self> {
        config.validate()?;
        #[cfg(not(feature = "parallel"))]
        if config.parallel {
            tracing::warn!("parallel updates requested but the `parallel` feature is off; running sequentially");
        }
        Ok(Self::build(config))
    }

    fn build(config: ColonyConfig) -> Self {
        Self {
            population: Population::new(),
            policy: config.bud_seeding.to_policy(),
            config,
            tick: 0,
            counters: ColonyCounters::default(),
            event_history: Vec::new(),
        }
    }

    /// Replace the configured bud seeding with a custom policy.
    pub fn with_bud_policy(mut self, policy: impl BudSeedPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn bud_policy(&self) -> &dyn BudSeedPolicy {
        self.policy.as_ref()
    }

    /// Create a top-level cell bound to `program`.
    pub fn create(&mut self, config: CellConfig, program: impl CellProgram + 'static) -> CellId {
        self.create_with_binding(config, bind(program))
    }

    /// Create a top-level cell sharing an existing binding.
    pub fn create_with_binding(&mut self, config: CellConfig, program: Binding) -> CellId {
        let id = self.population.create(&config, program, self.tick);
        self.counters.total_created += 1;
        debug!(%id, x = config.x, y = config.y, "cell created");
        id
    }

    /// Mark a cell dead now. It stops receiving updates and is removed at
    /// the end of the next tick. Killing a parent kills its bud.
    pub fn kill(&mut self, id: CellId) -> Result<bool> {
        self.population.mark_dead(id)
    }

    /// Run a single simulation tick.
    ///
    /// An error means the population is corrupt; the tick counter is not
    /// advanced and the colony should not be stepped further.
    pub fn tick(&mut self) -> Result<Vec<ColonyEvent>> {
        let tick = self.tick + 1;
        trace!(tick, cells = self.population.len(), "tick start");
        let requests = self.update_phase(tick, None);
        self.finish_tick(tick, requests)
    }

    /// Run a single tick with every program drawing from `source`.
    ///
    /// Updates run sequentially in population order, so a recorded sequence
    /// of draws replays to the same trajectories.
    pub fn tick_with_source(&mut self, source: &mut dyn RandomSource) -> Result<Vec<ColonyEvent>> {
        let tick = self.tick + 1;
        trace!(tick, cells = self.population.len(), "tick start (shared source)");
        let requests = self.update_phase(tick, Some(source));
        self.finish_tick(tick, requests)
    }

    /// Run the simulation for N ticks.
    pub fn run(&mut self, ticks: u64) -> Result<Vec<Vec<ColonyEvent>>> {
        let mut all_events = Vec::new();
        for _ in 0..ticks {
            all_events.push(self.tick()?);
        }
        Ok(all_events)
    }

    /// Run for N ticks, handing a snapshot to `sink` after each one, then
    /// finish the sink.
    pub fn run_with_sink(&mut self, ticks: u64, sink: &mut dyn SnapshotSink) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;
            sink.record(&self.snapshot())?;
        }
        sink.finish()
    }

    fn update_phase(
        &mut self,
        tick: Tick,
        source: Option<&mut dyn RandomSource>,
    ) -> Vec<StructuralRequest> {
        let seed = self.config.seed;
        let dt = self.config.time_step;

        if let Some(source) = source {
            let mut draws = Draws::Shared(source);
            let mut requests = Vec::new();
            for root in self.population.roots_mut() {
                update_lineage(root, tick, dt, &mut requests, &mut draws);
            }
            return requests;
        }

        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                let batches: Vec<Vec<StructuralRequest>> = self
                    .population
                    .roots_mut()
                    .par_iter_mut()
                    .map(|root| {
                        let mut requests = Vec::new();
                        update_lineage(root, tick, dt, &mut requests, &mut Draws::Derived { seed });
                        requests
                    })
                    .collect();
                return batches.into_iter().flatten().collect();
            }
        }

        let mut draws = Draws::Derived { seed };
        let mut requests = Vec::new();
        for root in self.population.roots_mut() {
            update_lineage(root, tick, dt, &mut requests, &mut draws);
        }
        requests
    }

    fn finish_tick(&mut self, tick: Tick, requests: Vec<StructuralRequest>) -> Result<Vec<ColonyEvent>> {
        let mut events = Vec::new();
        self.drain(tick, requests, &mut events)?;

        for id in self.population.compact() {
            debug!(%id, tick, "cell removed");
            self.counters.total_died += 1;
            events.push(ColonyEvent::Died { id });
        }
        self.population.verify()?;

        self.tick = tick;
        let buds = self.population.total_len() - self.population.len();
        events.push(ColonyEvent::TickComplete {
            tick,
            cells: self.population.len(),
            buds,
        });
        trace!(tick, cells = self.population.len(), buds, "tick complete");

        for event in &events {
            self.event_history.push((tick, event.clone()));
        }
        let limit = self.config.event_history_limit;
        if self.event_history.len() > limit {
            let excess = self.event_history.len() - limit;
            self.event_history.drain(..excess);
        }

        Ok(events)
    }

    /// Apply queued requests: creations, then releases, then deaths.
    fn drain(
        &mut self,
        tick: Tick,
        requests: Vec<StructuralRequest>,
        events: &mut Vec<ColonyEvent>,
    ) -> Result<()> {
        for kind in [RequestKind::BudCreate, RequestKind::BudRelease, RequestKind::Kill] {
            for request in requests.iter().filter(|r| r.kind() == kind) {
                match request {
                    StructuralRequest::BudCreate { cell, program } => {
                        self.apply_bud_create(tick, *cell, program.clone(), events)?
                    }
                    StructuralRequest::BudRelease { cell } => {
                        self.apply_bud_release(tick, *cell, events)?
                    }
                    StructuralRequest::Kill { cell } => {
                        if self.population.mark_dead(*cell)? {
                            debug!(id = %cell, tick, "cell killed");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_bud_create(
        &mut self,
        tick: Tick,
        parent_id: CellId,
        program: Option<Binding>,
        events: &mut Vec<ColonyEvent>,
    ) -> Result<()> {
        let mut rng = derive_policy_rng(self.config.seed, parent_id, tick);
        let Some(parent) = self.population.get_mut(parent_id) else {
            return Ok(());
        };
        if !parent.is_alive() || parent.has_bud() || parent.is_bud() {
            return Ok(());
        }
        let seed = self.policy.seed(parent, &mut rng);
        let program = program.unwrap_or_else(|| parent.program().clone());
        parent.clamp_state();

        let bud_id = self.population.allocate_id();
        let bud = Cell::with_state(bud_id, seed.position, seed.volume, seed.fluorescence, program, tick);
        if self.population.attach_bud(parent_id, bud)?.is_ok() {
            self.counters.total_created += 1;
            debug!(parent = %parent_id, bud = %bud_id, tick, volume = seed.volume, "bud created");
            events.push(ColonyEvent::BudCreated {
                parent: parent_id,
                bud: bud_id,
            });
        }
        Ok(())
    }

    fn apply_bud_release(
        &mut self,
        tick: Tick,
        parent_id: CellId,
        events: &mut Vec<ColonyEvent>,
    ) -> Result<()> {
        let mut rng = derive_policy_rng(self.config.seed, parent_id, tick);
        let policy = &self.policy;
        let released = self.population.release_bud(parent_id, |parent, bud| {
            policy.on_release(parent, bud, &mut rng);
            parent.clamp_state();
            bud.clamp_state();
        })?;
        if let Some(id) = released {
            self.counters.total_released += 1;
            debug!(parent = %parent_id, %id, tick, "bud released");
            events.push(ColonyEvent::BudReleased {
                parent: parent_id,
                cell: id,
            });
        }
        Ok(())
    }

    /// Get colony statistics.
    pub fn stats(&self) -> ColonyStats {
        let mut live = 0usize;
        let mut total_volume = 0.0;
        let mut sum = Fluorescence::zero();
        for cell in self.population.iter_all().filter(|c| c.is_alive()) {
            live += 1;
            total_volume += cell.volume();
            let f = cell.fluorescence();
            sum.gfp += f.gfp;
            sum.rfp += f.rfp;
            sum.yfp += f.yfp;
        }
        let mean = if live > 0 {
            sum.scaled(1.0 / live as f64)
        } else {
            Fluorescence::zero()
        };
        ColonyStats {
            tick: self.tick,
            cells_alive: self.population.iter().filter(|c| c.is_alive()).count(),
            cells_budding: self
                .population
                .iter_all()
                .filter(|c| c.state() == LifecycleState::Budding)
                .count(),
            total_created: self.counters.total_created,
            total_released: self.counters.total_released,
            total_died: self.counters.total_died,
            total_volume,
            mean_gfp: mean.gfp,
            mean_rfp: mean.rfp,
            mean_yfp: mean.yfp,
        }
    }

    /// Take a serializable snapshot of the colony's current state.
    pub fn snapshot(&self) -> ColonySnapshot {
        ColonySnapshot {
            tick: self.tick,
            cells: self.population.iter().map(Cell::snapshot).collect(),
            stats: self.stats(),
        }
    }

    /// The last completed tick.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn get(&self, id: CellId) -> Option<&Cell> {
        self.population.get(id)
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.population.contains(id)
    }

    /// Top-level cells in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.population.iter()
    }

    /// Number of top-level cells.
    pub fn len(&self) -> usize {
        self.population.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn counters(&self) -> ColonyCounters {
        self.counters
    }

    /// Get the full event history with tick numbers.
    pub fn event_history(&self) -> &[(Tick, ColonyEvent)] {
        &self.event_history
    }

    /// Replace the population wholesale, e.g. when restoring a session.
    pub(crate) fn restore(&mut self, population: Population, tick: Tick, counters: ColonyCounters) {
        self.population = population;
        self.tick = tick;
        self.counters = counters;
        self.event_history.clear();
    }
}

impl Default for Colony {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Colony {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Colony")
            .field("tick", &self.tick)
            .field("cells", &self.population.len())
            .field("policy", &self.policy.name())
            .field("counters", &self.counters)
            .finish()
    }
}

/// Where a program's random draws come from.
enum Draws<'a> {
    /// A fresh stream per cell and tick.
    Derived { seed: u64 },
    /// One source shared by every program, in population order.
    Shared(&'a mut dyn RandomSource),
}

/// Update a top-level cell and then its bud chain.
///
/// Each cell is clamped as soon as its program returns. A dead cell is
/// skipped together with everything it owns.
fn update_lineage(
    root: &mut Cell,
    tick: Tick,
    dt: f64,
    requests: &mut Vec<StructuralRequest>,
    draws: &mut Draws<'_>,
) {
    let mut current = Some(root);
    while let Some(cell) = current {
        if !cell.is_alive() {
            break;
        }
        let program = cell.program().clone();
        let id = cell.id();
        {
            let mut handle = CellHandle::new(cell, tick, dt, requests);
            match draws {
                Draws::Derived { seed } => {
                    let mut rng = derive_cell_rng(*seed, id, tick);
                    program.update(&mut handle, &mut rng);
                }
                Draws::Shared(source) => program.update(&mut handle, &mut **source),
            }
        }
        cell.clamp_state();
        if let Some(bud) = cell.bud_mut() {
            bud.clamp_state();
        }
        current = cell.bud_mut();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BudSeeding;
    use cece_core::program::Inert;
    use cece_core::rng::create_rng;

    fn grower(step: f64, create_at: f64) -> impl CellProgram {
        move |cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource| {
            if cell.is_bud() {
                return;
            }
            cell.add_volume(step);
            if cell.volume() >= create_at {
                cell.bud_create();
            }
        }
    }

    #[test]
    fn create_and_count_cells() {
        let mut colony = Colony::new();
        let a = colony.create(CellConfig::new(), Inert);
        let b = colony.create(CellConfig::at(5.0, 5.0, 0.0), Inert);
        assert_ne!(a, b);
        assert_eq!(colony.len(), 2);
        assert_eq!(colony.stats().total_created, 2);
    }

    #[test]
    fn corrupt_population_aborts_tick_without_advancing() {
        let mut colony = Colony::new();
        colony.create(
            CellConfig::new().volume(100.0),
            |cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource| {
                if cell.tick() == 1 {
                    cell.bud_create();
                }
            },
        );
        colony.tick().unwrap();
        assert_eq!(colony.population.total_len(), 2);

        // The bud leaves the tree but keeps its owner entry.
        assert!(colony.population.roots_mut()[0].detach_bud().is_some());
        let history = colony.event_history().len();

        let err = colony.tick().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(colony.current_tick(), 1);
        assert_eq!(colony.event_history().len(), history);
    }

    #[test]
    fn tick_advances_simulation() {
        let mut colony = Colony::new();
        colony.create(CellConfig::new(), Inert);
        let events = colony.tick().unwrap();
        assert_eq!(colony.current_tick(), 1);
        assert!(matches!(
            events.last(),
            Some(ColonyEvent::TickComplete { tick: 1, cells: 1, buds: 0 })
        ));
    }

    #[test]
    fn bud_appears_at_end_of_requesting_tick() {
        let mut colony = Colony::new();
        let id = colony.create(CellConfig::new().volume(70_000.0), grower(15_000.0, 80_000.0));
        assert!(!colony.get(id).unwrap().has_bud());

        let events = colony.tick().unwrap();
        let cell = colony.get(id).unwrap();
        assert_eq!(cell.volume(), 85_000.0);
        assert!(cell.has_bud());
        assert_eq!(cell.state(), LifecycleState::Budding);
        assert!(matches!(events[0], ColonyEvent::BudCreated { parent, .. } if parent == id));
        // The bud lives inside its parent, not at the top level.
        assert_eq!(colony.len(), 1);
    }

    #[test]
    fn repeated_bud_requests_keep_single_bud() {
        let mut colony = Colony::new();
        let id = colony.create(CellConfig::new().volume(90_000.0), grower(0.0, 80_000.0));
        colony.run(5).unwrap();
        assert_eq!(colony.population().total_len(), 2);
        assert_eq!(colony.stats().total_created, 2);
        assert!(colony.get(id).unwrap().has_bud());
    }

    #[test]
    fn negative_updates_are_clamped() {
        let mut colony = Colony::new();
        let id = colony.create(
            CellConfig::new().volume(10.0).gfp(3.0),
            |cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource| {
                cell.add_volume(-100.0);
                cell.add_gfp(-100.0);
                cell.set_rfp(f64::NAN);
            },
        );
        colony.tick().unwrap();
        let cell = colony.get(id).unwrap();
        assert_eq!(cell.volume(), 0.0);
        assert_eq!(cell.fluorescence(), Fluorescence::zero());
    }

    #[test]
    fn program_kill_removes_cell_and_bud() {
        let mut colony = Colony::new();
        let id = colony.create(
            CellConfig::new().volume(100.0),
            |cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource| {
                if cell.is_bud() {
                    return;
                }
                if cell.has_bud() {
                    cell.kill();
                } else {
                    cell.bud_create();
                }
            },
        );
        colony.tick().unwrap();
        let bud = colony.get(id).unwrap().bud().unwrap().id();

        let events = colony.tick().unwrap();
        assert!(colony.is_empty());
        assert!(!colony.contains(bud));
        let died: Vec<CellId> = events
            .iter()
            .filter_map(|e| match e {
                ColonyEvent::Died { id } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(died, vec![id, bud]);
        assert_eq!(colony.stats().total_died, 2);
    }

    #[test]
    fn external_kill_takes_effect_immediately() {
        let mut colony = Colony::new();
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = counter.clone();
        let id = colony.create(
            CellConfig::new(),
            move |_cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource| {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            },
        );
        assert!(colony.kill(id).unwrap());
        assert!(!colony.kill(id).unwrap());
        colony.tick().unwrap();
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(!colony.contains(id));
    }

    #[test]
    fn inherit_policy_splits_parent() {
        let config = ColonyConfig::default().with_bud_seeding(BudSeeding::Inherit {
            volume_fraction: 0.5,
        });
        let mut colony = Colony::from_config(config).unwrap();
        let id = colony.create(CellConfig::new().volume(100.0).gfp(10.0), grower(0.0, 50.0));
        colony.tick().unwrap();

        let cell = colony.get(id).unwrap();
        let bud = cell.bud().unwrap();
        assert_eq!(cell.volume(), 50.0);
        assert_eq!(bud.volume(), 50.0);
        assert_eq!(bud.fluorescence().gfp, 5.0);
    }

    #[test]
    fn event_history_is_bounded() {
        let mut config = ColonyConfig::default();
        config.event_history_limit = 3;
        let mut colony = Colony::from_config(config).unwrap();
        colony.create(CellConfig::new(), Inert);
        colony.run(10).unwrap();
        assert_eq!(colony.event_history().len(), 3);
        assert_eq!(colony.event_history()[2].0, 10);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ColonyConfig::default().with_time_step(0.0);
        assert!(Colony::from_config(config).is_err());
    }

    #[test]
    fn shared_source_drives_programs() {
        let mut colony = Colony::new();
        let id = colony.create(
            CellConfig::new(),
            |cell: &mut CellHandle<'_>, rng: &mut dyn RandomSource| {
                cell.add_gfp(rng.uniform(0.0, 10.0));
            },
        );
        let mut a = create_rng(11);
        colony.tick_with_source(&mut a).unwrap();
        let gfp = colony.get(id).unwrap().fluorescence().gfp;

        let mut expected = create_rng(11);
        assert_eq!(gfp, expected.uniform(0.0, 10.0));
    }

    #[test]
    fn snapshot_nests_buds() {
        let mut colony = Colony::new();
        colony.create(CellConfig::new().volume(90_000.0), grower(0.0, 80_000.0));
        colony.create(CellConfig::new(), Inert);
        colony.tick().unwrap();

        let snapshot = colony.snapshot();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.cells.len(), 2);
        assert!(snapshot.cells[0].has_bud());
        assert_eq!(snapshot.all_cells().count(), 3);
        assert_eq!(snapshot.stats.cells_budding, 1);
    }
}
