//! Bud seeding policies.
//!
//! A policy decides the initial state of a new bud and may touch up the
//! mother and daughter again when the bud is released.

use cece_core::cell::Cell;
use cece_core::rng::RandomSource;
use cece_core::types::{Fluorescence, Position};
use cece_core::units::{radius_from_volume, um3};
use std::f64::consts::TAU;

/// Initial state of a bud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudSeed {
    pub position: Position,
    pub volume: f64,
    pub fluorescence: Fluorescence,
}

/// Decides how buds start out and how they leave their parent.
pub trait BudSeedPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// State of a new bud of `parent`. The policy may adjust the parent,
    /// e.g. to hand part of its volume to the bud.
    fn seed(&self, parent: &mut Cell, rng: &mut dyn RandomSource) -> BudSeed;

    /// Called once the bud has been detached, before it joins the population.
    fn on_release(&self, _parent: &mut Cell, _bud: &mut Cell, _rng: &mut dyn RandomSource) {}
}

/// A bud of fixed volume with no fluorescence, placed beside its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetSeeding {
    pub volume: f64,
    pub distance: Option<f64>,
}

impl BudSeedPolicy for OffsetSeeding {
    fn name(&self) -> &str {
        "offset"
    }

    fn seed(&self, parent: &mut Cell, rng: &mut dyn RandomSource) -> BudSeed {
        BudSeed {
            position: beside(parent, self.volume, self.distance, rng),
            volume: self.volume,
            fluorescence: Fluorescence::zero(),
        }
    }
}

/// A bud that takes a share of the parent's volume and its fluorescence at
/// the parent's concentration.
///
/// On release the combined fluorescence is split again in proportion to
/// the final volumes of mother and daughter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InheritSeeding {
    pub volume_fraction: f64,
}

impl BudSeedPolicy for InheritSeeding {
    fn name(&self) -> &str {
        "inherit"
    }

    fn seed(&self, parent: &mut Cell, rng: &mut dyn RandomSource) -> BudSeed {
        let fraction = self.volume_fraction.clamp(0.0, 1.0);
        let volume = parent.volume() * fraction;
        let fluorescence = parent.fluorescence().scaled(fraction);

        let remaining = parent.fluorescence().scaled(1.0 - fraction);
        parent.set_volume(parent.volume() - volume);
        *parent.fluorescence_mut() = remaining;

        BudSeed {
            position: beside(parent, volume, None, rng),
            volume,
            fluorescence,
        }
    }

    fn on_release(&self, parent: &mut Cell, bud: &mut Cell, _rng: &mut dyn RandomSource) {
        split_by_volume(parent, bud);
    }
}

/// Redistribute the combined fluorescence of two cells so both end up at
/// the same concentration. Leaves them untouched when both volumes are zero.
pub fn split_by_volume(a: &mut Cell, b: &mut Cell) {
    let total_volume = a.volume() + b.volume();
    if total_volume <= 0.0 {
        return;
    }
    let fa = a.fluorescence();
    let fb = b.fluorescence();
    let combined = Fluorescence::new(fa.gfp + fb.gfp, fa.rfp + fb.rfp, fa.yfp + fb.yfp);
    *a.fluorescence_mut() = combined.scaled(a.volume() / total_volume);
    *b.fluorescence_mut() = combined.scaled(b.volume() / total_volume);
}

/// A point at `distance` from the parent in a random direction of the
/// x/y plane. Without a distance the two discs touch.
fn beside(
    parent: &Cell,
    bud_volume: f64,
    distance: Option<f64>,
    rng: &mut dyn RandomSource,
) -> Position {
    let distance = distance.unwrap_or_else(|| {
        radius_from_volume(um3(parent.volume())).value() + radius_from_volume(um3(bud_volume)).value()
    });
    let angle = rng.uniform(0.0, TAU);
    parent
        .position()
        .offset(distance * angle.cos(), distance * angle.sin(), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cece_core::program::{bind, Inert};
    use cece_core::rng::create_rng;
    use cece_core::types::{CellConfig, CellId};

    fn parent(volume: f64, gfp: f64) -> Cell {
        Cell::new(
            CellId(1),
            &CellConfig::at(10.0, 10.0, 0.0).volume(volume).gfp(gfp),
            bind(Inert),
            0,
        )
    }

    #[test]
    fn offset_places_bud_at_requested_distance() {
        let policy = OffsetSeeding {
            volume: 500.0,
            distance: Some(4.0),
        };
        let mut p = parent(1_000.0, 8.0);
        let seed = policy.seed(&mut p, &mut create_rng(3));

        assert_eq!(seed.volume, 500.0);
        assert_eq!(seed.fluorescence, Fluorescence::zero());
        assert!((seed.position.distance_to(&p.position()) - 4.0).abs() < 1e-9);
        // Parent is left alone.
        assert_eq!(p.volume(), 1_000.0);
        assert_eq!(p.fluorescence().gfp, 8.0);
    }

    #[test]
    fn offset_without_distance_touches_parent() {
        let policy = OffsetSeeding {
            volume: 100.0,
            distance: None,
        };
        let mut p = parent(400.0, 0.0);
        let seed = policy.seed(&mut p, &mut create_rng(3));
        let expected = radius_from_volume(um3(400.0)).value() + radius_from_volume(um3(100.0)).value();
        assert!((seed.position.distance_to(&p.position()) - expected).abs() < 1e-9);
    }

    #[test]
    fn inherit_takes_fraction_and_conserves_totals() {
        let policy = InheritSeeding {
            volume_fraction: 0.25,
        };
        let mut p = parent(1_000.0, 40.0);
        let seed = policy.seed(&mut p, &mut create_rng(1));

        assert_eq!(seed.volume, 250.0);
        assert_eq!(p.volume(), 750.0);
        assert_eq!(seed.fluorescence.gfp, 10.0);
        assert_eq!(p.fluorescence().gfp, 30.0);
    }

    #[test]
    fn split_equalises_concentration() {
        let mut a = parent(300.0, 90.0);
        let mut b = Cell::new(
            CellId(2),
            &CellConfig::new().volume(100.0).gfp(10.0),
            bind(Inert),
            0,
        );
        split_by_volume(&mut a, &mut b);
        assert!((a.fluorescence().gfp - 75.0).abs() < 1e-9);
        assert!((b.fluorescence().gfp - 25.0).abs() < 1e-9);
    }
}
