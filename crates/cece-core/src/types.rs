//! Shared types used across the engine crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic simulation step counter.
pub type Tick = u64;

/// Unique identifier for a cell.
///
/// Ids are handed out by the population in creation order and are never
/// reused, so a released bud keeps the id it was born with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u64);

impl CellId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell-{}", self.0)
    }
}

/// A position in the simulation space, in micrometres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    /// This position shifted by the given deltas.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// One of the three fluorescence reporters a cell carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Gfp,
    Rfp,
    Yfp,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Gfp, Channel::Rfp, Channel::Yfp];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Gfp => "gfp",
            Channel::Rfp => "rfp",
            Channel::Yfp => "yfp",
        }
    }
}

/// Fluorescence intensities of the three reporter channels.
///
/// Intensities are never negative once the engine has clamped a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fluorescence {
    pub gfp: f64,
    pub rfp: f64,
    pub yfp: f64,
}

impl Fluorescence {
    pub fn new(gfp: f64, rfp: f64, yfp: f64) -> Self {
        Self { gfp, rfp, yfp }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Gfp => self.gfp,
            Channel::Rfp => self.rfp,
            Channel::Yfp => self.yfp,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut f64 {
        match channel {
            Channel::Gfp => &mut self.gfp,
            Channel::Rfp => &mut self.rfp,
            Channel::Yfp => &mut self.yfp,
        }
    }

    /// Every channel multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.gfp * factor, self.rfp * factor, self.yfp * factor)
    }

    pub fn total(&self) -> f64 {
        self.gfp + self.rfp + self.yfp
    }

    /// Clamp every channel to `>= 0`. NaN collapses to zero.
    pub fn clamp_non_negative(&mut self) {
        for channel in Channel::ALL {
            let value = self.get_mut(channel);
            *value = clamp_non_negative(*value);
        }
    }

    pub fn is_non_negative(&self) -> bool {
        Channel::ALL.iter().all(|c| self.get(*c) >= 0.0)
    }
}

/// Clamp a quantity to `>= 0`, mapping NaN to zero.
pub fn clamp_non_negative(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Where a cell is in the budding lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No bud attached.
    Unbudded,
    /// Owns a live, unreleased bud.
    Budding,
    /// Started life as a bud and was released. Behaves like `Unbudded`.
    Released,
    /// Excluded from future ticks, waiting for compaction.
    Dead,
}

impl LifecycleState {
    pub fn is_alive(&self) -> bool {
        !matches!(self, LifecycleState::Dead)
    }
}

/// Construction parameters for a new cell.
///
/// Mirrors the mapping the colony scripts pass to `create`: missing keys
/// default to zero (or the engine's default volume), unknown keys are
/// ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub gfp: f64,
    pub rfp: f64,
    pub yfp: f64,
    /// Initial volume; `None` means [`CellConfig::DEFAULT_VOLUME`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl CellConfig {
    /// Default volume of a freshly created yeast cell, in µm³.
    pub const DEFAULT_VOLUME: f64 = 13.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration placed at the given position.
    pub fn at(x: impl Into<f64>, y: impl Into<f64>, z: impl Into<f64>) -> Self {
        Self::new().x(x).y(y).z(z)
    }

    pub fn x(mut self, x: impl Into<f64>) -> Self {
        self.x = x.into();
        self
    }

    pub fn y(mut self, y: impl Into<f64>) -> Self {
        self.y = y.into();
        self
    }

    pub fn z(mut self, z: impl Into<f64>) -> Self {
        self.z = z.into();
        self
    }

    pub fn gfp(mut self, gfp: f64) -> Self {
        self.gfp = gfp;
        self
    }

    pub fn rfp(mut self, rfp: f64) -> Self {
        self.rfp = rfp;
        self
    }

    pub fn yfp(mut self, yfp: f64) -> Self {
        self.yfp = yfp;
        self
    }

    pub fn volume(mut self, volume: impl Into<f64>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }

    pub fn fluorescence(&self) -> Fluorescence {
        Fluorescence::new(self.gfp, self.rfp, self.yfp)
    }

    pub fn initial_volume(&self) -> f64 {
        self.volume.unwrap_or(Self::DEFAULT_VOLUME)
    }
}

/// Serializable state of one cell and, recursively, its bud.
///
/// This is what render and export sinks consume, and what sessions persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub id: CellId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CellId>,
    pub position: Position,
    pub volume: f64,
    pub fluorescence: Fluorescence,
    pub state: LifecycleState,
    /// Started life as a bud and has since been released. Kept apart from
    /// `state`, which reports `Budding` first.
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub born: Tick,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bud: Option<Box<CellSnapshot>>,
}

impl CellSnapshot {
    pub fn has_bud(&self) -> bool {
        self.bud.is_some()
    }

    /// This snapshot followed by its bud chain, parent first.
    pub fn lineage(&self) -> impl Iterator<Item = &CellSnapshot> {
        std::iter::successors(Some(self), |s| s.bud.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{um, um3};

    #[test]
    fn clamp_maps_negative_and_nan_to_zero() {
        assert_eq!(clamp_non_negative(-3.0), 0.0);
        assert_eq!(clamp_non_negative(f64::NAN), 0.0);
        assert_eq!(clamp_non_negative(4.5), 4.5);

        let mut f = Fluorescence::new(-1.0, 2.0, f64::NAN);
        f.clamp_non_negative();
        assert_eq!(f, Fluorescence::new(0.0, 2.0, 0.0));
        assert!(f.is_non_negative());
    }

    #[test]
    fn cell_config_builder_accepts_units() {
        let config = CellConfig::at(um(10.0), um(20.0), 0.0)
            .volume(um3(70_000.0))
            .gfp(5.0);
        assert_eq!(config.position(), Position::new(10.0, 20.0, 0.0));
        assert_eq!(config.initial_volume(), 70_000.0);
        assert_eq!(config.fluorescence(), Fluorescence::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn cell_config_defaults_missing_and_ignores_unknown_keys() {
        let config: CellConfig =
            serde_json::from_str(r#"{"x": 4, "gfp": 12.5, "colour": "red"}"#).unwrap();
        assert_eq!(config.x, 4.0);
        assert_eq!(config.y, 0.0);
        assert_eq!(config.gfp, 12.5);
        assert_eq!(config.volume, None);
        assert_eq!(config.initial_volume(), CellConfig::DEFAULT_VOLUME);
    }

    #[test]
    fn snapshot_lineage_walks_bud_chain() {
        let leaf = CellSnapshot {
            id: CellId(3),
            parent: Some(CellId(2)),
            position: Position::origin(),
            volume: 1.0,
            fluorescence: Fluorescence::zero(),
            state: LifecycleState::Unbudded,
            released: false,
            born: 2,
            bud: None,
        };
        let mut root = leaf.clone();
        root.id = CellId(2);
        root.parent = None;
        root.state = LifecycleState::Budding;
        root.bud = Some(Box::new(leaf));

        let ids: Vec<CellId> = root.lineage().map(|s| s.id).collect();
        assert_eq!(ids, vec![CellId(2), CellId(3)]);
        assert!(root.has_bud());
    }

    #[test]
    fn cell_id_display() {
        assert_eq!(CellId(7).to_string(), "cell-7");
    }
}
