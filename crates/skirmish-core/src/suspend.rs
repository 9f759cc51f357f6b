//! Suspension points and run tokens.
//!
//! Work that waits on the outside world (a movement finishing, a player
//! answering a prompt) is parked in a [`SuspensionTable`] together with the
//! [`RunToken`] of the run that opened it. Invalidating the run makes every
//! parked continuation stale: resuming one is a no-op.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identity of one logical run, compared at every resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RunToken(u64);

impl RunToken {
    /// Raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run:{}", self.0)
    }
}

/// Issues run tokens from a monotonic counter.
///
/// # Example
///
/// ```
/// use skirmish_core::suspend::RunTracker;
///
/// let mut runs = RunTracker::new();
/// let first = runs.begin();
/// assert!(runs.is_current(first));
///
/// runs.invalidate();
/// assert!(!runs.is_current(first));
/// assert!(runs.begin() > first);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    current: RunToken,
}

impl RunTracker {
    /// Creates a tracker; the initial token belongs to no run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run, making every earlier token stale.
    pub fn begin(&mut self) -> RunToken {
        self.current = RunToken(self.current.0 + 1);
        self.current
    }

    /// Ends the current run without starting another.
    pub fn invalidate(&mut self) {
        self.current = RunToken(self.current.0 + 1);
    }

    /// The newest token.
    #[must_use]
    pub const fn current(&self) -> RunToken {
        self.current
    }

    /// True if `token` belongs to the current run.
    #[must_use]
    pub fn is_current(&self, token: RunToken) -> bool {
        token == self.current
    }
}

/// Identity of a parked continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SuspensionId(u64);

impl SuspensionId {
    /// Raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SuspensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "suspension:{}", self.0)
    }
}

/// What a suspension waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuspensionKind {
    /// Movement completion
    Stride,
    /// A player's reaction decision
    ReactionPrompt,
}

/// A parked continuation.
#[derive(Debug, Clone, PartialEq)]
pub struct Suspension<T> {
    /// Identity handed to the host
    pub id: SuspensionId,
    /// What it waits for
    pub kind: SuspensionKind,
    /// The run that opened it
    pub token: RunToken,
    /// Clock reading when opened
    pub opened_at: Duration,
    /// Clock reading at which it times out
    pub deadline: Duration,
    /// State needed to resume
    pub payload: T,
}

/// Open suspensions in id order.
#[derive(Debug, Clone)]
pub struct SuspensionTable<T> {
    next_id: u64,
    open: BTreeMap<SuspensionId, Suspension<T>>,
}

impl<T> Default for SuspensionTable<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            open: BTreeMap::new(),
        }
    }
}

impl<T> SuspensionTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a continuation that times out `budget` after `now`.
    pub fn open(
        &mut self,
        kind: SuspensionKind,
        token: RunToken,
        now: Duration,
        budget: Duration,
        payload: T,
    ) -> SuspensionId {
        let id = SuspensionId(self.next_id);
        self.next_id += 1;
        self.open.insert(
            id,
            Suspension {
                id,
                kind,
                token,
                opened_at: now,
                deadline: now + budget,
                payload,
            },
        );
        id
    }

    /// Looks up an open suspension.
    #[must_use]
    pub fn get(&self, id: SuspensionId) -> Option<&Suspension<T>> {
        self.open.get(&id)
    }

    /// True if `id` is still open.
    #[must_use]
    pub fn contains(&self, id: SuspensionId) -> bool {
        self.open.contains_key(&id)
    }

    /// Removes a suspension for resumption.
    pub fn take(&mut self, id: SuspensionId) -> Option<Suspension<T>> {
        self.open.remove(&id)
    }

    /// Removes and returns every suspension whose deadline is at or before `now`.
    pub fn expired(&mut self, now: Duration) -> Vec<Suspension<T>> {
        let due: Vec<SuspensionId> = self
            .open
            .values()
            .filter(|s| s.deadline <= now)
            .map(|s| s.id)
            .collect();
        due.into_iter().filter_map(|id| self.open.remove(&id)).collect()
    }

    /// Removes and returns every suspension opened by `token`.
    pub fn drain_run(&mut self, token: RunToken) -> Vec<Suspension<T>> {
        self.drain_where(|s| s.token == token)
    }

    /// Removes and returns every suspension not opened by `current`.
    pub fn drain_stale(&mut self, current: RunToken) -> Vec<Suspension<T>> {
        self.drain_where(|s| s.token != current)
    }

    fn drain_where(&mut self, mut pick: impl FnMut(&Suspension<T>) -> bool) -> Vec<Suspension<T>> {
        let ids: Vec<SuspensionId> = self.open.values().filter(|s| pick(s)).map(|s| s.id).collect();
        ids.into_iter().filter_map(|id| self.open.remove(&id)).collect()
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.open.clear();
    }

    /// Open suspensions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Suspension<T>> {
        self.open.values()
    }

    /// Number of open suspensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// True if nothing is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut runs = RunTracker::new();
        let token = runs.begin();
        let mut table = SuspensionTable::new();
        let a = table.open(SuspensionKind::Stride, token, secs(0), secs(30), 'a');
        let b = table.open(SuspensionKind::ReactionPrompt, token, secs(0), secs(10), 'b');
        assert!(a < b);
        assert_eq!(table.take(a).map(|s| s.payload), Some('a'));
        assert!(table.take(a).is_none());
        assert!(table.contains(b));
    }

    #[test]
    fn deadlines_expire_inclusively() {
        let mut table = SuspensionTable::new();
        let token = RunTracker::new().begin();
        table.open(SuspensionKind::ReactionPrompt, token, secs(5), secs(10), ());
        table.open(SuspensionKind::Stride, token, secs(5), secs(30), ());
        assert!(table.expired(secs(14)).is_empty());
        let due = table.expired(secs(15));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].kind, SuspensionKind::ReactionPrompt);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn runs_drain_separately() {
        let mut runs = RunTracker::new();
        let old = runs.begin();
        let new = runs.begin();
        let mut table = SuspensionTable::new();
        table.open(SuspensionKind::Stride, old, secs(0), secs(30), 1);
        table.open(SuspensionKind::Stride, new, secs(0), secs(30), 2);

        let stale = table.drain_stale(runs.current());
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].payload, 1);
        assert_eq!(table.drain_run(new).len(), 1);
        assert!(table.is_empty());
    }
}
