//! Terrain storage for the grid.
//!
//! Every in-bounds column has exactly one floor. Columns default to open
//! ground at level 0; only overridden columns are stored.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, NEIGHBOURS};
use crate::Bounds;

bitflags! {
    /// Terrain properties of a single column.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TerrainFlags: u8 {
        /// Impassable and blocks line of sight
        const WALL = 0b0000_0001;
        /// Impassable but does not block sight (chasm, deep water)
        const IMPASSABLE = 0b0000_0010;
        /// Grants standard cover to anything behind it
        const COVER = 0b0000_0100;
        /// Entering costs an extra 5 feet
        const DIFFICULT = 0b0000_1000;
        /// Allows moving between adjacent columns of different levels
        const STAIRS = 0b0001_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
struct Tile {
    level: i32,
    flags: TerrainFlags,
}

/// A bounded grid of terrain columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMap {
    bounds: Bounds,
    tiles: BTreeMap<(i32, i32), Tile>,
}

impl GridMap {
    /// Creates an open, flat map at level 0.
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            tiles: BTreeMap::new(),
        }
    }

    /// The map extent.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Sets the terrain flags of a column, keeping its level.
    pub fn set_flags(&mut self, x: i32, y: i32, flags: TerrainFlags) {
        if self.bounds.contains(x, y) {
            self.tiles.entry((x, y)).or_default().flags = flags;
        }
    }

    /// Sets the floor level of a column, keeping its flags.
    pub fn set_level(&mut self, x: i32, y: i32, level: i32) {
        if self.bounds.contains(x, y) {
            self.tiles.entry((x, y)).or_default().level = level;
        }
    }

    /// Terrain flags of a column (empty when out of bounds).
    #[must_use]
    pub fn flags(&self, x: i32, y: i32) -> TerrainFlags {
        self.tiles
            .get(&(x, y))
            .map(|t| t.flags)
            .unwrap_or_default()
    }

    /// The standing cell of a column, if it is inside the map.
    #[must_use]
    pub fn cell_at(&self, x: i32, y: i32) -> Option<Cell> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let level = self.tiles.get(&(x, y)).map_or(0, |t| t.level);
        Some(Cell::new(x, y, level))
    }

    /// True if `cell` names a real floor of this map.
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.cell_at(cell.x, cell.y) == Some(cell)
    }

    /// True if a creature may stand on the cell, ignoring occupancy.
    #[must_use]
    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.contains(cell)
            && !self
                .flags(cell.x, cell.y)
                .intersects(TerrainFlags::WALL | TerrainFlags::IMPASSABLE)
    }

    /// True if the column blocks sight lines.
    #[must_use]
    pub fn blocks_sight(&self, x: i32, y: i32) -> bool {
        self.flags(x, y).contains(TerrainFlags::WALL)
    }

    /// Walkable cells reachable by a single step from `cell`.
    ///
    /// A step between different levels requires the `STAIRS` flag on either
    /// end. Diagonal steps may not cut a wall corner.
    #[must_use]
    pub fn step_neighbours(&self, cell: Cell) -> Vec<Cell> {
        let mut out = Vec::with_capacity(8);
        for delta in NEIGHBOURS {
            let Some(next) = self.cell_at(cell.x + delta.x, cell.y + delta.y) else {
                continue;
            };
            if !self.is_walkable(next) {
                continue;
            }
            if next.level != cell.level {
                let stairs = self.flags(cell.x, cell.y).contains(TerrainFlags::STAIRS)
                    || self.flags(next.x, next.y).contains(TerrainFlags::STAIRS);
                if !stairs {
                    continue;
                }
            }
            if delta.x != 0
                && delta.y != 0
                && (self.blocks_sight(cell.x + delta.x, cell.y)
                    || self.blocks_sight(cell.x, cell.y + delta.y))
            {
                continue;
            }
            out.push(next);
        }
        out
    }

    /// Extra movement cost in feet for entering `cell`.
    #[must_use]
    pub fn entry_surcharge(&self, cell: Cell) -> u32 {
        if self.flags(cell.x, cell.y).contains(TerrainFlags::DIFFICULT) {
            crate::FEET_PER_CELL
        } else {
            0
        }
    }
}

impl Default for GridMap {
    fn default() -> Self {
        Self::new(Bounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_columns_are_open_ground() {
        let map = GridMap::new(Bounds::new(4, 4));
        assert_eq!(map.cell_at(1, 2), Some(Cell::new(1, 2, 0)));
        assert!(map.is_walkable(Cell::new(1, 2, 0)));
        assert!(map.cell_at(4, 0).is_none());
    }

    #[test]
    fn cells_must_match_column_level() {
        let mut map = GridMap::new(Bounds::new(4, 4));
        map.set_level(2, 2, 1);
        assert!(map.contains(Cell::new(2, 2, 1)));
        assert!(!map.contains(Cell::new(2, 2, 0)));
    }

    #[test]
    fn walls_are_not_walkable() {
        let mut map = GridMap::new(Bounds::new(4, 4));
        map.set_flags(1, 1, TerrainFlags::WALL);
        assert!(!map.is_walkable(Cell::new(1, 1, 0)));
        assert!(map.blocks_sight(1, 1));
    }

    #[test]
    fn level_changes_need_stairs() {
        let mut map = GridMap::new(Bounds::new(3, 1));
        map.set_level(1, 0, 1);
        let start = Cell::new(0, 0, 0);
        assert!(map.step_neighbours(start).is_empty());

        map.set_flags(1, 0, TerrainFlags::STAIRS);
        assert_eq!(map.step_neighbours(start), vec![Cell::new(1, 0, 1)]);
    }

    #[test]
    fn diagonal_cannot_cut_wall_corner() {
        let mut map = GridMap::new(Bounds::new(3, 3));
        map.set_flags(1, 0, TerrainFlags::WALL);
        let neighbours = map.step_neighbours(Cell::new(0, 0, 0));
        assert!(!neighbours.contains(&Cell::new(1, 1, 0)));
        assert!(neighbours.contains(&Cell::new(0, 1, 0)));
    }

    #[test]
    fn difficult_terrain_surcharge() {
        let mut map = GridMap::new(Bounds::new(3, 3));
        map.set_flags(1, 1, TerrainFlags::DIFFICULT);
        assert_eq!(map.entry_surcharge(Cell::new(1, 1, 0)), 5);
        assert_eq!(map.entry_surcharge(Cell::new(0, 1, 0)), 0);
    }
}
