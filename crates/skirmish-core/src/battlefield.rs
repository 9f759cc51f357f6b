//! The grid interface the engine consumes, and a reference implementation.
//!
//! The engine never touches terrain directly. Everything spatial goes
//! through [`Battlefield`], which the host may implement on top of any
//! grid. [`Board`] implements it over a [`tessera::GridMap`] with a simple
//! one-combatant-per-cell occupancy model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera::{bounded_bfs, Cell, Cover, GridMap, MoveProfile, PathPlan};

use crate::entity::EntityHandle;

/// Spatial queries and occupancy.
pub trait Battlefield {
    /// Cheapest path for `mover` within `action_budget` Strides.
    fn find_path_by_actions(
        &self,
        from: Cell,
        to: Cell,
        profile: &MoveProfile,
        mover: EntityHandle,
        action_budget: u8,
    ) -> Option<PathPlan>;

    /// Every cell `mover` can reach within `action_budget` Strides, with its cost.
    fn movement_zone_by_actions(
        &self,
        from: Cell,
        profile: &MoveProfile,
        mover: EntityHandle,
        action_budget: u8,
    ) -> BTreeMap<Cell, u8>;

    /// True if `mover` may end movement in `cell`.
    fn can_occupy(&self, cell: Cell, mover: EntityHandle) -> bool;

    /// Moves `mover` to `cell`. Returns false (and changes nothing) if illegal.
    fn move_occupant(&mut self, mover: EntityHandle, cell: Cell) -> bool;

    /// Removes `mover` from the grid, e.g. when defeated.
    fn vacate(&mut self, mover: EntityHandle);

    /// Who stands in `cell`.
    fn occupant(&self, cell: Cell) -> Option<EntityHandle>;

    /// The standing cell of a column, if it exists.
    fn standing_cell(&self, x: i32, y: i32) -> Option<Cell>;

    /// True if nothing blocks sight between the cells.
    fn has_line_of_sight(&self, from: Cell, to: Cell) -> bool;

    /// Cover a target at `to` has against an attacker at `from`.
    fn cover_between(&self, from: Cell, to: Cell) -> Cover;

    /// Step-capped breadth-first expansion from `start` over cells `admit` accepts.
    fn reachable_cells(
        &self,
        start: Cell,
        max_steps: u32,
        admit: &mut dyn FnMut(Cell) -> bool,
    ) -> BTreeMap<Cell, u32>;
}

/// A [`GridMap`] plus who stands where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    map: GridMap,
    occupants: BTreeMap<Cell, EntityHandle>,
    positions: BTreeMap<EntityHandle, Cell>,
}

impl Board {
    /// Creates an empty board over a map.
    #[must_use]
    pub fn new(map: GridMap) -> Self {
        Self {
            map,
            occupants: BTreeMap::new(),
            positions: BTreeMap::new(),
        }
    }

    /// The terrain.
    #[must_use]
    pub fn map(&self) -> &GridMap {
        &self.map
    }

    /// Mutable terrain access.
    pub fn map_mut(&mut self) -> &mut GridMap {
        &mut self.map
    }

    /// Places a combatant. Returns false if the cell is not free.
    pub fn place(&mut self, mover: EntityHandle, cell: Cell) -> bool {
        self.move_occupant(mover, cell)
    }

    /// Where a combatant stands.
    #[must_use]
    pub fn position_of(&self, mover: EntityHandle) -> Option<Cell> {
        self.positions.get(&mover).copied()
    }

    fn passable_for(&self, mover: EntityHandle) -> impl Fn(Cell) -> bool + '_ {
        move |cell| self.occupants.get(&cell).map_or(true, |&o| o == mover)
    }
}

impl Battlefield for Board {
    fn find_path_by_actions(
        &self,
        from: Cell,
        to: Cell,
        profile: &MoveProfile,
        mover: EntityHandle,
        action_budget: u8,
    ) -> Option<PathPlan> {
        self.map
            .find_path(from, to, profile, action_budget, self.passable_for(mover))
    }

    fn movement_zone_by_actions(
        &self,
        from: Cell,
        profile: &MoveProfile,
        mover: EntityHandle,
        action_budget: u8,
    ) -> BTreeMap<Cell, u8> {
        self.map
            .movement_zone(from, profile, action_budget, self.passable_for(mover))
    }

    fn can_occupy(&self, cell: Cell, mover: EntityHandle) -> bool {
        self.map.is_walkable(cell) && self.passable_for(mover)(cell)
    }

    fn move_occupant(&mut self, mover: EntityHandle, cell: Cell) -> bool {
        if !self.can_occupy(cell, mover) {
            return false;
        }
        if let Some(old) = self.positions.insert(mover, cell) {
            self.occupants.remove(&old);
        }
        self.occupants.insert(cell, mover);
        true
    }

    fn vacate(&mut self, mover: EntityHandle) {
        if let Some(old) = self.positions.remove(&mover) {
            self.occupants.remove(&old);
        }
    }

    fn occupant(&self, cell: Cell) -> Option<EntityHandle> {
        self.occupants.get(&cell).copied()
    }

    fn standing_cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.map.cell_at(x, y)
    }

    fn has_line_of_sight(&self, from: Cell, to: Cell) -> bool {
        self.map.has_line_of_sight(from, to)
    }

    fn cover_between(&self, from: Cell, to: Cell) -> Cover {
        self.map.cover_between(from, to)
    }

    fn reachable_cells(
        &self,
        start: Cell,
        max_steps: u32,
        admit: &mut dyn FnMut(Cell) -> bool,
    ) -> BTreeMap<Cell, u32> {
        bounded_bfs(&self.map, start, max_steps, admit)
    }
}
