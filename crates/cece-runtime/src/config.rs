//! Colony configuration.

use crate::bud_policy::{BudSeedPolicy, InheritSeeding, OffsetSeeding};
use cece_core::error::{CeceError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for colony simulation parameters.
///
/// Every field has a default, so a partial TOML or JSON table is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonyConfig {
    /// Seed for every random stream the colony hands out (default: 42).
    pub seed: u64,
    /// Simulated seconds per tick (default: 1.0).
    pub time_step: f64,
    /// Run the update phase on the rayon pool when available (default: true).
    pub parallel: bool,
    /// How a freshly created bud is initialised.
    pub bud_seeding: BudSeeding,
    /// Maximum number of events kept in the history (default: 10 000).
    pub event_history_limit: usize,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            time_step: 1.0,
            parallel: true,
            bud_seeding: BudSeeding::default(),
            event_history_limit: 10_000,
        }
    }
}

impl ColonyConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_bud_seeding(mut self, bud_seeding: BudSeeding) -> Self {
        self.bud_seeding = bud_seeding;
        self
    }

    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(CeceError::invalid_config(
                "time_step",
                self.time_step.to_string(),
                "must be a positive finite number of seconds",
            ));
        }
        self.bud_seeding.validate()
    }
}

/// Initial state policy for new buds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum BudSeeding {
    /// Fixed starting volume, zero fluorescence, placed beside the parent.
    Offset {
        #[serde(default = "default_bud_volume")]
        volume: f64,
        /// Centre distance from the parent. `None` places the bud touching
        /// the parent's boundary.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance: Option<f64>,
    },
    /// A share of the parent's volume, and of its fluorescence in
    /// proportion to volume.
    Inherit {
        #[serde(default = "default_volume_fraction")]
        volume_fraction: f64,
    },
}

fn default_bud_volume() -> f64 {
    500.0
}

fn default_volume_fraction() -> f64 {
    0.1
}

impl Default for BudSeeding {
    fn default() -> Self {
        BudSeeding::Offset {
            volume: default_bud_volume(),
            distance: None,
        }
    }
}

impl BudSeeding {
    pub fn validate(&self) -> Result<()> {
        match self {
            BudSeeding::Offset { volume, distance } => {
                if !volume.is_finite() || *volume < 0.0 {
                    return Err(CeceError::invalid_config(
                        "bud_seeding.volume",
                        volume.to_string(),
                        "must be a non-negative finite volume",
                    ));
                }
                if let Some(d) = distance {
                    if !d.is_finite() || *d < 0.0 {
                        return Err(CeceError::invalid_config(
                            "bud_seeding.distance",
                            d.to_string(),
                            "must be a non-negative finite length",
                        ));
                    }
                }
                Ok(())
            }
            BudSeeding::Inherit { volume_fraction } => {
                if !(0.0..=1.0).contains(volume_fraction) {
                    return Err(CeceError::out_of_range(
                        "bud_seeding.volume_fraction",
                        0.0,
                        1.0,
                        *volume_fraction,
                    ));
                }
                Ok(())
            }
        }
    }

    /// Build the policy object the colony consults.
    pub fn to_policy(&self) -> Box<dyn BudSeedPolicy> {
        match *self {
            BudSeeding::Offset { volume, distance } => Box::new(OffsetSeeding { volume, distance }),
            BudSeeding::Inherit { volume_fraction } => Box::new(InheritSeeding { volume_fraction }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ColonyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.bud_seeding,
            BudSeeding::Offset {
                volume: 500.0,
                distance: None
            }
        );
    }

    #[test]
    fn rejects_bad_time_step() {
        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = ColonyConfig::default().with_time_step(dt);
            assert!(config.validate().is_err(), "accepted time_step {dt}");
        }
    }

    #[test]
    fn rejects_fraction_outside_unit_interval() {
        let seeding = BudSeeding::Inherit {
            volume_fraction: 1.5,
        };
        let err = seeding.validate().unwrap_err();
        assert!(err.to_string().contains("volume_fraction"));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ColonyConfig = serde_json::from_str(
            r#"{"seed": 7, "bud_seeding": {"policy": "inherit"}, "unknown": true}"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.time_step, 1.0);
        assert_eq!(
            config.bud_seeding,
            BudSeeding::Inherit {
                volume_fraction: 0.1
            }
        );
    }
}
