//! Path search and reachable-zone computation.
//!
//! Movement is priced in feet with alternating diagonals, then converted to
//! actions by the mover's speed. All searches are deterministic: the frontier
//! is ordered by `(cost, cell)` and results are returned in `BTreeMap`s.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, FEET_PER_CELL};
use crate::map::GridMap;

/// Movement capabilities of a mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveProfile {
    /// Feet moved per Stride action
    pub speed_feet: u32,
    /// Treat difficult terrain as normal terrain
    pub ignore_difficult: bool,
}

impl MoveProfile {
    /// A standard ground mover.
    #[must_use]
    pub const fn walker(speed_feet: u32) -> Self {
        Self {
            speed_feet,
            ignore_difficult: false,
        }
    }

    /// Number of Stride actions needed to cover `feet`.
    #[must_use]
    pub fn actions_for(&self, feet: u32) -> u32 {
        if feet == 0 {
            0
        } else if self.speed_feet == 0 {
            u32::MAX
        } else {
            feet.div_ceil(self.speed_feet)
        }
    }
}

/// A resolved path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPlan {
    /// Cells stepped through, excluding the start and including the destination
    pub cells: Vec<Cell>,
    /// Total movement cost in feet
    pub feet: u32,
    /// Stride actions required
    pub actions: u8,
}

impl PathPlan {
    /// Final cell of the path, if it moves at all.
    #[must_use]
    pub fn destination(&self) -> Option<Cell> {
        self.cells.last().copied()
    }
}

/// Search key: a cell plus whether the next diagonal is the expensive one.
type StateKey = (Cell, bool);

struct Frontier {
    best: BTreeMap<StateKey, u32>,
    prev: BTreeMap<StateKey, StateKey>,
}

impl GridMap {
    fn price_tree(
        &self,
        from: Cell,
        profile: &MoveProfile,
        max_feet: u32,
        passable: &mut dyn FnMut(Cell) -> bool,
    ) -> Frontier {
        let mut frontier = Frontier {
            best: BTreeMap::new(),
            prev: BTreeMap::new(),
        };
        let mut heap = BinaryHeap::new();
        frontier.best.insert((from, false), 0);
        heap.push(Reverse((0u32, from, false)));

        while let Some(Reverse((feet, cell, odd))) = heap.pop() {
            if frontier.best.get(&(cell, odd)).is_some_and(|&b| b < feet) {
                continue;
            }
            for next in self.step_neighbours(cell) {
                if !passable(next) {
                    continue;
                }
                let diagonal = next.x != cell.x && next.y != cell.y;
                let step = if diagonal && odd {
                    2 * FEET_PER_CELL
                } else {
                    FEET_PER_CELL
                };
                let surcharge = if profile.ignore_difficult {
                    0
                } else {
                    self.entry_surcharge(next)
                };
                let cost = feet + step + surcharge;
                if cost > max_feet {
                    continue;
                }
                let key = (next, if diagonal { !odd } else { odd });
                if frontier.best.get(&key).map_or(true, |&b| cost < b) {
                    frontier.best.insert(key, cost);
                    frontier.prev.insert(key, (cell, odd));
                    heap.push(Reverse((cost, key.0, key.1)));
                }
            }
        }
        frontier
    }

    /// Cheapest path from `from` to `to` within `max_actions` Strides.
    ///
    /// `passable` is consulted for every cell entered, including the
    /// destination. Returns `None` when the destination is unreachable.
    pub fn find_path(
        &self,
        from: Cell,
        to: Cell,
        profile: &MoveProfile,
        max_actions: u8,
        mut passable: impl FnMut(Cell) -> bool,
    ) -> Option<PathPlan> {
        if from == to {
            return Some(PathPlan {
                cells: Vec::new(),
                feet: 0,
                actions: 0,
            });
        }
        let max_feet = profile.speed_feet.saturating_mul(u32::from(max_actions));
        let tree = self.price_tree(from, profile, max_feet, &mut passable);

        let goal = [(to, false), (to, true)]
            .into_iter()
            .filter_map(|k| tree.best.get(&k).map(|&feet| (feet, k)))
            .min()?;

        let mut cells = vec![goal.1 .0];
        let mut cursor = goal.1;
        while let Some(&back) = tree.prev.get(&cursor) {
            if back.0 == from {
                break;
            }
            cells.push(back.0);
            cursor = back;
        }
        cells.reverse();

        let actions = u8::try_from(profile.actions_for(goal.0)).ok()?;
        Some(PathPlan {
            cells,
            feet: goal.0,
            actions,
        })
    }

    /// Every cell reachable within `max_actions` Strides, mapped to the
    /// number of actions needed. The start cell is excluded.
    pub fn movement_zone(
        &self,
        from: Cell,
        profile: &MoveProfile,
        max_actions: u8,
        mut passable: impl FnMut(Cell) -> bool,
    ) -> BTreeMap<Cell, u8> {
        let max_feet = profile.speed_feet.saturating_mul(u32::from(max_actions));
        let tree = self.price_tree(from, profile, max_feet, &mut passable);

        let mut zone: BTreeMap<Cell, u32> = BTreeMap::new();
        for (&(cell, _), &feet) in &tree.best {
            if cell == from {
                continue;
            }
            zone.entry(cell)
                .and_modify(|f| *f = (*f).min(feet))
                .or_insert(feet);
        }
        zone.into_iter()
            .filter_map(|(cell, feet)| {
                u8::try_from(profile.actions_for(feet))
                    .ok()
                    .map(|actions| (cell, actions))
            })
            .collect()
    }
}

/// Step-capped breadth-first expansion over walkable neighbours.
///
/// A cell is visited (and expanded further) only when `admit` accepts it.
/// Returns every admitted cell with its step count; the start is excluded.
pub fn bounded_bfs(
    map: &GridMap,
    start: Cell,
    max_steps: u32,
    mut admit: impl FnMut(Cell) -> bool,
) -> BTreeMap<Cell, u32> {
    let mut seen: BTreeMap<Cell, u32> = BTreeMap::new();
    let mut queue = VecDeque::from([(start, 0u32)]);
    while let Some((cell, steps)) = queue.pop_front() {
        if steps >= max_steps {
            continue;
        }
        for next in map.step_neighbours(cell) {
            if next == start || seen.contains_key(&next) || !admit(next) {
                continue;
            }
            seen.insert(next, steps + 1);
            queue.push_back((next, steps + 1));
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TerrainFlags;
    use crate::Bounds;

    fn open_map() -> GridMap {
        GridMap::new(Bounds::new(10, 10))
    }

    mod path_tests {
        use super::*;

        #[test]
        fn straight_line_costs_five_per_cell() {
            let map = open_map();
            let plan = map
                .find_path(
                    Cell::new(0, 0, 0),
                    Cell::new(4, 0, 0),
                    &MoveProfile::walker(25),
                    1,
                    |_| true,
                )
                .unwrap();
            assert_eq!(plan.feet, 20);
            assert_eq!(plan.actions, 1);
            assert_eq!(plan.cells.len(), 4);
            assert_eq!(plan.destination(), Some(Cell::new(4, 0, 0)));
        }

        #[test]
        fn diagonal_path_uses_alternating_cost() {
            let map = open_map();
            let plan = map
                .find_path(
                    Cell::new(0, 0, 0),
                    Cell::new(2, 2, 0),
                    &MoveProfile::walker(25),
                    1,
                    |_| true,
                )
                .unwrap();
            assert_eq!(plan.feet, 15);
        }

        #[test]
        fn path_needs_two_actions_beyond_speed() {
            let map = open_map();
            let plan = map
                .find_path(
                    Cell::new(0, 0, 0),
                    Cell::new(7, 0, 0),
                    &MoveProfile::walker(25),
                    2,
                    |_| true,
                )
                .unwrap();
            assert_eq!(plan.feet, 35);
            assert_eq!(plan.actions, 2);
        }

        #[test]
        fn budget_limits_reach() {
            let map = open_map();
            let plan = map.find_path(
                Cell::new(0, 0, 0),
                Cell::new(7, 0, 0),
                &MoveProfile::walker(25),
                1,
                |_| true,
            );
            assert!(plan.is_none());
        }

        #[test]
        fn routes_around_walls() {
            let mut map = open_map();
            for y in 0..4 {
                map.set_flags(2, y, TerrainFlags::WALL);
            }
            let plan = map
                .find_path(
                    Cell::new(0, 0, 0),
                    Cell::new(4, 0, 0),
                    &MoveProfile::walker(30),
                    3,
                    |_| true,
                )
                .unwrap();
            assert!(plan.cells.iter().all(|c| c.x != 2 || c.y >= 4));
            assert!(plan.feet > 20);
        }

        #[test]
        fn passable_filter_blocks_occupied_cells() {
            let map = GridMap::new(Bounds::new(3, 1));
            let blocked = Cell::new(1, 0, 0);
            let plan = map.find_path(
                Cell::new(0, 0, 0),
                Cell::new(2, 0, 0),
                &MoveProfile::walker(25),
                3,
                |c| c != blocked,
            );
            assert!(plan.is_none());
        }

        #[test]
        fn difficult_terrain_costs_extra() {
            let mut map = open_map();
            map.set_flags(1, 0, TerrainFlags::DIFFICULT);
            let plan = map
                .find_path(
                    Cell::new(0, 0, 0),
                    Cell::new(1, 0, 0),
                    &MoveProfile::walker(25),
                    1,
                    |_| true,
                )
                .unwrap();
            assert_eq!(plan.feet, 10);
        }
    }

    mod zone_tests {
        use super::*;

        #[test]
        fn zone_excludes_start_and_respects_budget() {
            let map = open_map();
            let start = Cell::new(5, 5, 0);
            let zone = map.movement_zone(start, &MoveProfile::walker(10), 1, |_| true);
            assert!(!zone.contains_key(&start));
            assert_eq!(zone.get(&Cell::new(7, 5, 0)), Some(&1));
            assert!(!zone.contains_key(&Cell::new(8, 5, 0)));
            // 2 diagonals cost 15 feet, beyond a 10-foot speed
            assert!(!zone.contains_key(&Cell::new(7, 7, 0)));
        }

        #[test]
        fn zone_reports_action_cost() {
            let map = open_map();
            let zone = map.movement_zone(Cell::new(0, 0, 0), &MoveProfile::walker(10), 2, |_| true);
            assert_eq!(zone.get(&Cell::new(1, 0, 0)), Some(&1));
            assert_eq!(zone.get(&Cell::new(4, 0, 0)), Some(&2));
        }
    }

    mod bfs_tests {
        use super::*;

        #[test]
        fn bfs_caps_steps() {
            let map = open_map();
            let found = bounded_bfs(&map, Cell::new(5, 5, 0), 1, |_| true);
            assert_eq!(found.len(), 8);
            assert!(found.values().all(|&s| s == 1));
        }

        #[test]
        fn bfs_does_not_expand_rejected_cells() {
            let map = GridMap::new(Bounds::new(5, 1));
            let found = bounded_bfs(&map, Cell::new(0, 0, 0), 4, |c| c.x != 2);
            assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![Cell::new(1, 0, 0)]);
        }
    }
}
