//! Population metrics computed from a snapshot.
//!
//! Used by the CLI `stats` command and handy in tests; all numbers are
//! taken over live cells, buds included.

use crate::colony::ColonySnapshot;
use cece_core::types::{CellSnapshot, Channel, LifecycleState};
use serde::Serialize;

/// Summary statistics of one quantity across the population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl Distribution {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        Self {
            min: sorted[0],
            max: sorted[n - 1],
            mean: sorted.iter().sum::<f64>() / n as f64,
            median,
        }
    }
}

/// Per-channel fluorescence distributions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelMetrics {
    pub gfp: Distribution,
    pub rfp: Distribution,
    pub yfp: Distribution,
}

/// All population metrics combined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColonyMetrics {
    pub tick: u64,
    /// Live top-level cells.
    pub cells: usize,
    /// Live unreleased buds.
    pub buds: usize,
    /// Share of top-level cells currently budding.
    pub budding_fraction: f64,
    /// Top-level cells that started life as a bud.
    pub released: usize,
    pub volume: Distribution,
    pub fluorescence: ChannelMetrics,
}

/// Compute metrics from a snapshot.
pub fn compute_metrics(snapshot: &ColonySnapshot) -> ColonyMetrics {
    let live: Vec<&CellSnapshot> = snapshot
        .all_cells()
        .filter(|c| c.state.is_alive())
        .collect();
    let roots: Vec<&CellSnapshot> = snapshot
        .cells
        .iter()
        .filter(|c| c.state.is_alive())
        .collect();

    let budding = roots
        .iter()
        .filter(|c| c.state == LifecycleState::Budding)
        .count();
    let released = roots
        .iter()
        .filter(|c| c.state == LifecycleState::Released)
        .count();

    let volumes: Vec<f64> = live.iter().map(|c| c.volume).collect();
    let channel = |ch: Channel| {
        let values: Vec<f64> = live.iter().map(|c| c.fluorescence.get(ch)).collect();
        Distribution::from_values(&values)
    };

    ColonyMetrics {
        tick: snapshot.tick,
        cells: roots.len(),
        buds: live.len() - roots.len(),
        budding_fraction: if roots.is_empty() {
            0.0
        } else {
            budding as f64 / roots.len() as f64
        },
        released,
        volume: Distribution::from_values(&volumes),
        fluorescence: ChannelMetrics {
            gfp: channel(Channel::Gfp),
            rfp: channel(Channel::Rfp),
            yfp: channel(Channel::Yfp),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colony::Colony;
    use cece_core::prelude::*;

    #[test]
    fn distribution_of_values() {
        let d = Distribution::from_values(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert_eq!(d.mean, 2.5);
        assert_eq!(d.median, 2.5);
        assert_eq!(Distribution::from_values(&[]), Distribution::default());
    }

    #[test]
    fn metrics_count_buds_separately() {
        let mut colony = Colony::new();
        colony.create(
            CellConfig::new().volume(100.0).gfp(2.0),
            |cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource| {
                if !cell.is_bud() {
                    cell.bud_create();
                }
            },
        );
        colony.create(CellConfig::new().volume(300.0).gfp(6.0), Inert);
        colony.tick().unwrap();

        let metrics = compute_metrics(&colony.snapshot());
        assert_eq!(metrics.cells, 2);
        assert_eq!(metrics.buds, 1);
        assert_eq!(metrics.budding_fraction, 0.5);
        // Default bud: 500 µm³, no fluorescence.
        assert_eq!(metrics.volume.max, 500.0);
        assert_eq!(metrics.fluorescence.gfp.min, 0.0);
        assert_eq!(metrics.fluorescence.gfp.max, 6.0);
    }
}
