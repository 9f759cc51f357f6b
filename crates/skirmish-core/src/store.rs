//! Combatant storage.
//!
//! The engine reaches combatants only through the [`EntityStore`] trait and
//! refers to them only by [`EntityHandle`]. [`Roster`] is the in-memory
//! implementation: an arena keyed by handle with deterministic iteration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityData, EntityHandle};

/// Lookup of combatants by handle.
pub trait EntityStore {
    /// Immutable access.
    fn get(&self, handle: EntityHandle) -> Option<&EntityData>;

    /// Mutable access.
    fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut EntityData>;

    /// Every stored handle in ascending order.
    fn handles(&self) -> Vec<EntityHandle>;

    /// True if the handle is stored.
    fn exists(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    /// True if the handle is stored and above zero HP.
    fn is_alive(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some_and(EntityData::is_alive)
    }
}

/// Arena of combatants.
///
/// Handles are issued from 1 upward and never reused.
///
/// # Example
///
/// ```
/// use skirmish_core::entity::{EntityData, Team};
/// use skirmish_core::store::{EntityStore, Roster};
/// use tessera::Cell;
///
/// let mut roster = Roster::new();
/// let a = roster.spawn(EntityData::new("a", Team::Party, Cell::new(0, 0, 0)));
/// let b = roster.spawn(EntityData::new("b", Team::Adversary, Cell::new(1, 0, 0)));
///
/// assert!(a < b);
/// assert_eq!(roster.get(a).unwrap().handle(), a);
/// assert_eq!(roster.handles(), vec![a, b]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    next_id: u64,
    entities: BTreeMap<EntityHandle, EntityData>,
}

impl Roster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: BTreeMap::new(),
        }
    }

    /// Stores a combatant and returns its new handle.
    pub fn spawn(&mut self, mut data: EntityData) -> EntityHandle {
        let handle = EntityHandle::new(self.next_id);
        self.next_id += 1;
        data.set_handle(handle);
        self.entities.insert(handle, data);
        handle
    }

    /// Removes a combatant.
    pub fn despawn(&mut self, handle: EntityHandle) -> Option<EntityData> {
        self.entities.remove(&handle)
    }

    /// Combatants in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityData> {
        self.entities.values()
    }

    /// Number of stored combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for Roster {
    fn get(&self, handle: EntityHandle) -> Option<&EntityData> {
        self.entities.get(&handle)
    }

    fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut EntityData> {
        self.entities.get_mut(&handle)
    }

    fn handles(&self) -> Vec<EntityHandle> {
        self.entities.keys().copied().collect()
    }
}
