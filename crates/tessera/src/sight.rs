//! Line of sight and cover sampling.
//!
//! Sight lines run between column centres and are sampled at half-cell
//! resolution. The endpoints themselves never block.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::map::{GridMap, TerrainFlags};

/// Cover granted to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Cover {
    /// Nothing in the way
    #[default]
    None,
    /// Low obstacle between the cells: +2 circumstance to AC
    Standard,
}

impl Cover {
    /// AC bonus granted by this cover.
    #[must_use]
    pub const fn ac_bonus(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Standard => 2,
        }
    }
}

impl GridMap {
    /// Columns crossed by the segment between two cells, endpoints excluded.
    fn crossed_columns(from: Cell, to: Cell) -> Vec<(i32, i32)> {
        let a = from.column().as_vec2();
        let b = to.column().as_vec2();
        let samples = from.chebyshev(to) * 2;
        let mut out: Vec<(i32, i32)> = Vec::new();
        for i in 1..samples {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / samples as f32;
            let p: Vec2 = a.lerp(b, t).round();
            #[allow(clippy::cast_possible_truncation)]
            let column = (p.x as i32, p.y as i32);
            if column == (from.x, from.y) || column == (to.x, to.y) {
                continue;
            }
            if out.last() != Some(&column) {
                out.push(column);
            }
        }
        out
    }

    /// True if no wall lies between the two cells.
    #[must_use]
    pub fn has_line_of_sight(&self, from: Cell, to: Cell) -> bool {
        Self::crossed_columns(from, to)
            .into_iter()
            .all(|(x, y)| !self.blocks_sight(x, y))
    }

    /// Cover the target at `to` has against an attacker at `from`.
    #[must_use]
    pub fn cover_between(&self, from: Cell, to: Cell) -> Cover {
        let covered = Self::crossed_columns(from, to)
            .into_iter()
            .any(|(x, y)| self.flags(x, y).contains(TerrainFlags::COVER));
        if covered {
            Cover::Standard
        } else {
            Cover::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bounds;

    #[test]
    fn open_ground_has_sight() {
        let map = GridMap::new(Bounds::new(10, 10));
        assert!(map.has_line_of_sight(Cell::new(0, 0, 0), Cell::new(9, 9, 0)));
        assert!(map.has_line_of_sight(Cell::new(0, 0, 0), Cell::new(1, 0, 0)));
    }

    #[test]
    fn wall_blocks_sight() {
        let mut map = GridMap::new(Bounds::new(10, 10));
        map.set_flags(3, 0, TerrainFlags::WALL);
        assert!(!map.has_line_of_sight(Cell::new(0, 0, 0), Cell::new(6, 0, 0)));
        assert!(map.has_line_of_sight(Cell::new(0, 2, 0), Cell::new(6, 2, 0)));
    }

    #[test]
    fn endpoints_never_block() {
        let mut map = GridMap::new(Bounds::new(10, 10));
        map.set_flags(0, 0, TerrainFlags::WALL);
        assert!(map.has_line_of_sight(Cell::new(0, 0, 0), Cell::new(2, 0, 0)));
    }

    #[test]
    fn low_obstacle_grants_cover() {
        let mut map = GridMap::new(Bounds::new(10, 10));
        map.set_flags(2, 0, TerrainFlags::COVER);
        let from = Cell::new(0, 0, 0);
        assert_eq!(map.cover_between(from, Cell::new(4, 0, 0)), Cover::Standard);
        assert_eq!(map.cover_between(from, Cell::new(0, 4, 0)), Cover::None);
        assert_eq!(Cover::Standard.ac_bonus(), 2);
    }
}
