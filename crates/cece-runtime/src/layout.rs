//! Initial placement of cells.

use cece_core::types::{CellConfig, Position};
use serde::{Deserialize, Serialize};

/// A rectangular grid of cells, row-major.
///
/// The cell in row `r`, column `c` sits at
/// `origin + (c * spacing, r * spacing, 0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    /// Distance between neighbouring cells, in µm.
    pub spacing: f64,
    pub origin: Position,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            spacing: 50.0,
            origin: Position::origin(),
        }
    }
}

impl GridLayout {
    pub fn new(rows: usize, cols: usize, spacing: f64) -> Self {
        Self {
            rows,
            cols,
            spacing,
            origin: Position::origin(),
        }
    }

    pub fn with_origin(mut self, origin: Position) -> Self {
        self.origin = origin;
        self
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, row: usize, col: usize) -> Position {
        self.origin
            .offset(col as f64 * self.spacing, row as f64 * self.spacing, 0.0)
    }

    /// Every grid position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| self.position(r, c)))
    }

    /// `template` placed at every grid position.
    pub fn configs<'a>(&'a self, template: &'a CellConfig) -> impl Iterator<Item = CellConfig> + 'a {
        self.positions()
            .map(move |p| template.clone().x(p.x).y(p.y).z(p.z))
    }
}
