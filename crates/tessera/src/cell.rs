//! Grid cell coordinates and PF2e distance counting.

use std::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Side length of one grid cell in feet.
pub const FEET_PER_CELL: u32 = 5;

/// The eight neighbour offsets, orthogonals first.
pub(crate) const NEIGHBOURS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
    IVec2::new(1, 1),
    IVec2::new(1, -1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
];

/// A grid cell: a column `(x, y)` plus the floor elevation `level` it sits on.
///
/// Cells are ordered lexicographically by `(x, y, level)`, which gives every
/// search in this crate a deterministic tie-break.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column index along x
    pub x: i32,
    /// Column index along y
    pub y: i32,
    /// Floor elevation level (0 is ground)
    pub level: i32,
}

impl Cell {
    /// Creates a cell.
    #[must_use]
    pub const fn new(x: i32, y: i32, level: i32) -> Self {
        Self { x, y, level }
    }

    /// The `(x, y)` column of this cell.
    #[must_use]
    pub const fn column(self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// Returns a copy shifted by a column offset, keeping the level.
    #[must_use]
    pub const fn offset(self, delta: IVec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.level)
    }

    /// Horizontal distance in feet using alternating diagonals.
    ///
    /// The first diagonal step costs 5 feet, the second 10, and so on.
    /// Elevation is not included.
    #[must_use]
    pub fn distance_feet(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let diagonal = dx.min(dy);
        let straight = dx.max(dy) - diagonal;
        FEET_PER_CELL * (straight + diagonal + diagonal / 2)
    }

    /// Chebyshev distance in cells.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// True when the two cells share an edge or a corner (same column excluded).
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.chebyshev(other) == 1
    }

    /// Unit step pointing from `origin` towards `self`, per axis.
    ///
    /// Used for forced movement directly away from a source.
    #[must_use]
    pub fn direction_from(self, origin: Self) -> IVec2 {
        (self.column() - origin.column()).signum()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({}, {}, L{})", self.x, self.y, self.level)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})@{}", self.x, self.y, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod distance_tests {
        use super::*;

        #[test]
        fn orthogonal_distance() {
            assert_eq!(Cell::new(0, 0, 0).distance_feet(Cell::new(4, 0, 0)), 20);
            assert_eq!(Cell::new(2, 7, 0).distance_feet(Cell::new(2, 5, 0)), 10);
        }

        #[test]
        fn diagonals_alternate() {
            let origin = Cell::new(0, 0, 0);
            assert_eq!(origin.distance_feet(Cell::new(1, 1, 0)), 5);
            assert_eq!(origin.distance_feet(Cell::new(2, 2, 0)), 15);
            assert_eq!(origin.distance_feet(Cell::new(3, 3, 0)), 20);
            assert_eq!(origin.distance_feet(Cell::new(3, 1, 0)), 15);
        }

        #[test]
        fn elevation_is_ignored() {
            assert_eq!(Cell::new(0, 0, 0).distance_feet(Cell::new(1, 0, 3)), 5);
        }

        proptest! {
            #[test]
            fn distance_is_symmetric(
                ax in -50i32..50, ay in -50i32..50,
                bx in -50i32..50, by in -50i32..50,
            ) {
                let a = Cell::new(ax, ay, 0);
                let b = Cell::new(bx, by, 0);
                prop_assert_eq!(a.distance_feet(b), b.distance_feet(a));
            }

            #[test]
            fn distance_bounded_by_chebyshev(
                ax in -50i32..50, ay in -50i32..50,
                bx in -50i32..50, by in -50i32..50,
            ) {
                let a = Cell::new(ax, ay, 0);
                let b = Cell::new(bx, by, 0);
                let cheb = a.chebyshev(b) * FEET_PER_CELL;
                prop_assert!(a.distance_feet(b) >= cheb);
                prop_assert!(a.distance_feet(b) <= cheb * 3 / 2 + FEET_PER_CELL);
            }
        }
    }

    mod direction_tests {
        use super::*;

        #[test]
        fn direction_is_unit_per_axis() {
            let origin = Cell::new(2, 2, 0);
            assert_eq!(Cell::new(5, 2, 0).direction_from(origin), IVec2::new(1, 0));
            assert_eq!(Cell::new(0, 4, 0).direction_from(origin), IVec2::new(-1, 1));
            assert_eq!(origin.direction_from(origin), IVec2::ZERO);
        }

        #[test]
        fn adjacency_includes_corners() {
            let c = Cell::new(3, 3, 0);
            assert!(c.is_adjacent(Cell::new(4, 4, 0)));
            assert!(c.is_adjacent(Cell::new(3, 2, 0)));
            assert!(!c.is_adjacent(c));
            assert!(!c.is_adjacent(Cell::new(5, 3, 0)));
        }
    }
}
