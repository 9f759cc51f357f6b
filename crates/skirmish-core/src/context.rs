//! Injected collaborators.
//!
//! [`CombatContext`] bundles the four collaborators every engine operation
//! needs. It holds only borrows, so the host keeps ownership of its store,
//! grid and dice. [`Encounter`] is a convenience owner of the reference
//! implementations.

use tessera::{Cell, GridMap};
use tracing::debug;

use crate::battlefield::{Battlefield, Board};
use crate::dice::{RandomSource, SeededDice};
use crate::entity::{EntityData, EntityHandle};
use crate::event::{CombatEvent, EventLog};
use crate::store::{EntityStore, Roster};

/// Borrowed collaborators for one engine call.
pub struct CombatContext<'a> {
    /// Combatant lookup
    pub store: &'a mut dyn EntityStore,
    /// Grid and occupancy
    pub battlefield: &'a mut dyn Battlefield,
    /// Dice
    pub rng: &'a mut dyn RandomSource,
    /// Notification sink
    pub events: &'a mut EventLog,
}

impl<'a> CombatContext<'a> {
    /// Bundles collaborators.
    pub fn new(
        store: &'a mut dyn EntityStore,
        battlefield: &'a mut dyn Battlefield,
        rng: &'a mut dyn RandomSource,
        events: &'a mut EventLog,
    ) -> Self {
        Self {
            store,
            battlefield,
            rng,
            events,
        }
    }

    /// True if the handle is stored and alive.
    #[must_use]
    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        self.store.is_alive(handle)
    }

    /// Moves a combatant on the grid and updates its stored position.
    ///
    /// Returns the previous cell, or `None` if the move was refused.
    pub fn relocate(&mut self, handle: EntityHandle, cell: Cell) -> Option<Cell> {
        let from = self.store.get(handle)?.position;
        if !self.battlefield.move_occupant(handle, cell) {
            debug!(entity = %handle, %cell, "relocation refused");
            return None;
        }
        if let Some(data) = self.store.get_mut(handle) {
            data.position = cell;
        }
        Some(from)
    }

    /// Moves a combatant involuntarily and reports it.
    pub fn force_move(&mut self, handle: EntityHandle, cell: Cell) -> bool {
        match self.relocate(handle, cell) {
            Some(from) => {
                self.events.push(CombatEvent::ForcedMovement {
                    entity: handle,
                    from,
                    to: cell,
                });
                true
            }
            None => false,
        }
    }
}

/// Owns a roster, a board, dice and an event log.
///
/// # Example
///
/// ```
/// use skirmish_core::context::Encounter;
/// use skirmish_core::dice::ScriptedDice;
/// use skirmish_core::entity::{EntityData, Team};
/// use skirmish_core::store::EntityStore;
/// use tessera::{Bounds, Cell, GridMap};
///
/// let mut encounter = Encounter::new(GridMap::new(Bounds::new(5, 5)), ScriptedDice::new([20]));
/// let hero = encounter.spawn(EntityData::new("hero", Team::Party, Cell::new(2, 2, 0)));
///
/// let ctx = encounter.context();
/// assert!(ctx.store.exists(hero));
/// assert_eq!(ctx.battlefield.occupant(Cell::new(2, 2, 0)), Some(hero));
/// ```
pub struct Encounter<R: RandomSource = SeededDice> {
    /// Combatants
    pub roster: Roster,
    /// Grid and occupancy
    pub board: Board,
    /// Dice
    pub dice: R,
    /// Pending notifications
    pub events: EventLog,
}

impl<R: RandomSource> Encounter<R> {
    /// Creates an empty encounter.
    pub fn new(map: GridMap, dice: R) -> Self {
        Self {
            roster: Roster::new(),
            board: Board::new(map),
            dice,
            events: EventLog::new(),
        }
    }

    /// Adds a combatant and places it on its cell.
    ///
    /// A combatant whose cell is taken or unwalkable is still stored but
    /// left off the grid.
    pub fn spawn(&mut self, data: EntityData) -> EntityHandle {
        let cell = data.position;
        let handle = self.roster.spawn(data);
        if !self.board.place(handle, cell) {
            debug!(entity = %handle, %cell, "spawned off-grid");
        }
        handle
    }

    /// Borrows everything as a [`CombatContext`].
    pub fn context(&mut self) -> CombatContext<'_> {
        CombatContext {
            store: &mut self.roster,
            battlefield: &mut self.board,
            rng: &mut self.dice,
            events: &mut self.events,
        }
    }
}
