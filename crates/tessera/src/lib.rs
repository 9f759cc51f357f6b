//! # Tessera
//!
//! Square-grid spatial substrate for squad-level tactical combat.
//!
//! Tessera models the battlefield as a bounded grid of 5-foot columns, each
//! with a floor elevation level and a set of terrain flags. On top of that it
//! provides the geometric queries a rules engine needs:
//!
//! - **Distance**: PF2e-style diagonal counting (5, 10, 5, 10, ...)
//! - **Sight lines**: wall-blocked line of sight and cover sampling
//! - **Search**: cost-bounded path search and reachable-zone flood fill
//! - **Bounded BFS**: step-capped breadth-first expansion with a caller filter
//!
//! Tessera knows nothing about combatants. Occupancy and other per-mover rules
//! are supplied by the caller as closures, so the same map can back any number
//! of occupancy models.
//!
//! ## Quick Start
//!
//! ```
//! use tessera::{Bounds, Cell, GridMap, MoveProfile, TerrainFlags};
//!
//! let mut map = GridMap::new(Bounds::new(10, 10));
//! map.set_flags(4, 0, TerrainFlags::WALL);
//!
//! let from = Cell::new(0, 0, 0);
//! let to = Cell::new(3, 0, 0);
//! assert_eq!(from.distance_feet(to), 15);
//!
//! let path = map
//!     .find_path(from, to, &MoveProfile::walker(25), 1, |_| true)
//!     .unwrap();
//! assert_eq!(path.actions, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cell;
pub mod map;
pub mod search;
pub mod sight;

// Re-exports for convenience
pub use cell::{Cell, FEET_PER_CELL};
pub use map::{GridMap, TerrainFlags};
pub use search::{bounded_bfs, MoveProfile, PathPlan};
pub use sight::Cover;

/// Rectangular grid extent, anchored at the origin.
///
/// Valid columns satisfy `0 <= x < width` and `0 <= y < height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    /// Number of columns along x
    pub width: i32,
    /// Number of columns along y
    pub height: i32,
}

impl Bounds {
    /// Create bounds from dimensions.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Check if a column is inside the bounds.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Number of columns covered by the bounds.
    #[must_use]
    pub fn area(&self) -> usize {
        usize::try_from(self.width.max(0) * self.height.max(0)).unwrap_or(0)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(20, 20)
    }
}
