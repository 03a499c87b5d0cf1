//! Built-in update programs.
//!
//! Both programs drive their bud from the parent's update, so they do
//! nothing when invoked on an unreleased bud.

use cece_core::cell::CellHandle;
use cece_core::program::CellProgram;
use cece_core::rng::RandomSource;
use cece_core::types::Channel;
use serde::{Deserialize, Serialize};

use crate::config::BudSeeding;

/// Volume of a freshly created yeast bud, in µm³.
const YEAST_BUD_VOLUME: f64 = 0.1;

/// Saturating yeast growth with budding.
///
/// Volume grows by `growth_rate * (volume_max - volume) * dt`. While the
/// cell is budding, that growth goes to the bud instead. A bud is requested
/// once the volume reaches `bud_create_volume` and released once the bud
/// reaches `bud_release_volume`.
///
/// The thresholds are tens of µm³, far below the colony's default bud seed
/// of 500 µm³. Pair it with [`YeastGrowth::bud_seeding`] so buds start
/// small and grow before release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YeastGrowth {
    /// Per-second growth rate (default: 0.1).
    pub growth_rate: f64,
    /// Volume the cell approaches asymptotically, in µm³ (default: 100).
    pub volume_max: f64,
    /// Volume at which budding starts, in µm³ (default: 12).
    pub bud_create_volume: f64,
    /// Bud volume at which it is released, in µm³ (default: 10).
    pub bud_release_volume: f64,
}

impl Default for YeastGrowth {
    fn default() -> Self {
        Self {
            growth_rate: 0.1,
            volume_max: 100.0,
            bud_create_volume: 12.0,
            bud_release_volume: 10.0,
        }
    }
}

impl YeastGrowth {
    /// Bud seeding matched to these thresholds: a 0.1 µm³ bud placed at the
    /// parent's boundary.
    pub fn bud_seeding(&self) -> BudSeeding {
        BudSeeding::Offset {
            volume: YEAST_BUD_VOLUME.min(self.bud_release_volume),
            distance: None,
        }
    }
}

impl CellProgram for YeastGrowth {
    fn update(&self, cell: &mut CellHandle<'_>, _rng: &mut dyn RandomSource) {
        if cell.is_bud() {
            return;
        }
        let growth = self.growth_rate * (self.volume_max - cell.volume()) * cell.dt();

        if let Some(mut bud) = cell.bud_mut() {
            bud.add_volume(growth);
            let ready = bud.volume() >= self.bud_release_volume;
            if ready {
                cell.bud_release();
            }
        } else {
            cell.add_volume(growth);
            if cell.volume() >= self.bud_create_volume {
                cell.bud_create();
            }
        }
    }

    fn name(&self) -> &str {
        "yeast-growth"
    }
}

/// Bounded random drift of volume and fluorescence with budding.
///
/// Each tick the cell gains `volume_step ± volume_jitter` and every channel
/// moves by `± channel_jitter`. Once the volume reaches `bud_create_volume`
/// a bud is requested; the bud grows by `bud_growth` per tick and is
/// released at `bud_release_volume`. Unreleased buds only drift their
/// channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticExpression {
    pub volume_step: f64,
    pub volume_jitter: f64,
    pub channel_jitter: f64,
    pub bud_create_volume: f64,
    pub bud_growth: f64,
    pub bud_release_volume: f64,
}

impl Default for StochasticExpression {
    fn default() -> Self {
        Self {
            volume_step: 1_000.0,
            volume_jitter: 500.0,
            channel_jitter: 5.0,
            bud_create_volume: 80_000.0,
            bud_growth: 5_000.0,
            bud_release_volume: 30_000.0,
        }
    }
}

impl CellProgram for StochasticExpression {
    fn update(&self, cell: &mut CellHandle<'_>, rng: &mut dyn RandomSource) {
        for channel in Channel::ALL {
            *cell.fluorescence_mut().get_mut(channel) += rng.symmetric(self.channel_jitter);
        }
        if cell.is_bud() {
            return;
        }

        let delta = self.volume_step + rng.symmetric(self.volume_jitter);
        cell.add_volume(delta);

        if let Some(mut bud) = cell.bud_mut() {
            bud.add_volume(self.bud_growth);
            let ready = bud.volume() >= self.bud_release_volume;
            if ready {
                cell.bud_release();
            }
        } else if cell.volume() >= self.bud_create_volume {
            cell.bud_create();
        }
    }

    fn name(&self) -> &str {
        "stochastic-expression"
    }
}

/// Program selection as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgramConfig {
    YeastGrowth(YeastGrowth),
    StochasticExpression(StochasticExpression),
    Inert,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig::StochasticExpression(StochasticExpression::default())
    }
}

impl ProgramConfig {
    pub fn to_binding(&self) -> cece_core::program::Binding {
        use cece_core::program::{bind, Inert};
        match self {
            ProgramConfig::YeastGrowth(p) => bind(p.clone()),
            ProgramConfig::StochasticExpression(p) => bind(p.clone()),
            ProgramConfig::Inert => bind(Inert),
        }
    }

    /// Bud seeding the program is tuned for, if it has a preference.
    pub fn bud_seeding(&self) -> Option<BudSeeding> {
        match self {
            ProgramConfig::YeastGrowth(p) => Some(p.bud_seeding()),
            ProgramConfig::StochasticExpression(_) | ProgramConfig::Inert => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cece_core::cell::Cell;
    use cece_core::program::{bind, Inert, StructuralRequest};
    use cece_core::rng::create_rng;
    use cece_core::types::{CellConfig, CellId};

    fn run_once(program: &dyn CellProgram, cell: &mut Cell) -> Vec<StructuralRequest> {
        let mut requests = Vec::new();
        let mut rng = create_rng(5);
        let mut handle = CellHandle::new(cell, 1, 1.0, &mut requests);
        program.update(&mut handle, &mut rng);
        requests
    }

    fn yeast(volume: f64) -> Cell {
        Cell::new(CellId(1), &CellConfig::new().volume(volume), bind(Inert), 0)
    }

    #[test]
    fn yeast_grows_towards_max() {
        let program = YeastGrowth::default();
        let mut cell = yeast(0.0);
        let requests = run_once(&program, &mut cell);
        assert!((cell.volume() - 10.0).abs() < 1e-9);
        assert!(requests.is_empty());
    }

    #[test]
    fn yeast_requests_bud_at_threshold() {
        let program = YeastGrowth::default();
        let mut cell = yeast(12.0);
        let requests = run_once(&program, &mut cell);
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0], StructuralRequest::BudCreate { .. }));
    }

    #[test]
    fn yeast_transfers_growth_to_bud_and_releases() {
        let program = YeastGrowth::default();
        let mut cell = yeast(20.0);
        cell.attach_bud(Cell::new(
            CellId(2),
            &CellConfig::new().volume(3.0),
            bind(Inert),
            0,
        ))
        .unwrap();

        let requests = run_once(&program, &mut cell);
        // growth = 0.1 * (100 - 20) * 1 = 8
        assert_eq!(cell.volume(), 20.0);
        assert!((cell.bud().unwrap().volume() - 11.0).abs() < 1e-9);
        assert!(matches!(requests[..], [StructuralRequest::BudRelease { .. }]));
    }

    #[test]
    fn stochastic_drift_is_bounded() {
        let program = StochasticExpression::default();
        let mut cell = yeast(10_000.0);
        run_once(&program, &mut cell);
        assert!((10_500.0..=11_500.0).contains(&cell.volume()));
        for channel in Channel::ALL {
            assert!(cell.fluorescence().get(channel).abs() <= 5.0);
        }
    }

    #[test]
    fn yeast_bud_seed_starts_below_release() {
        let program = YeastGrowth::default();
        match program.bud_seeding() {
            BudSeeding::Offset { volume, distance } => {
                assert_eq!(volume, 0.1);
                assert!(volume < program.bud_release_volume);
                assert_eq!(distance, None);
            }
            other => panic!("unexpected seeding {other:?}"),
        }

        let tiny = YeastGrowth {
            bud_release_volume: 0.05,
            ..YeastGrowth::default()
        };
        assert!(matches!(
            tiny.bud_seeding(),
            BudSeeding::Offset { volume, .. } if volume == 0.05
        ));
        assert_eq!(
            ProgramConfig::YeastGrowth(program.clone()).bud_seeding(),
            Some(program.bud_seeding())
        );
        assert_eq!(ProgramConfig::default().bud_seeding(), None);
    }

    #[test]
    fn program_config_reads_tagged_table() {
        let config: ProgramConfig =
            serde_json::from_str(r#"{"kind": "yeast_growth", "growth_rate": 0.5}"#).unwrap();
        match config {
            ProgramConfig::YeastGrowth(p) => {
                assert_eq!(p.growth_rate, 0.5);
                assert_eq!(p.volume_max, 100.0);
            }
            other => panic!("unexpected program {other:?}"),
        }
        assert_eq!(ProgramConfig::Inert.to_binding().name(), "inert");
    }
}
