//! Chord finger table

use crate::common::{between, Id};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Routing cache of a node: entry `i` caches the successor of `id + 2^i`.
///
/// Entries start absent and may go stale; they are only hints.
pub struct FingerTable {
    id: Id,
    fingers: Vec<Option<Id>>,
}

impl FingerTable {
    /// Create an empty [FingerTable] with `size` entries for the node `id`.
    pub fn new(id: Id, size: u8) -> Self {
        FingerTable {
            id,
            fingers: vec![None; usize::from(size)],
        }
    }

    /// Returns the [Id] of the node owning this table.
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.fingers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingers.iter().all(Option::is_none)
    }

    /// Returns entry `index`, or None if absent or out of range.
    pub fn get(&self, index: usize) -> Option<Id> {
        self.fingers.get(index).copied().flatten()
    }

    /// Replace every entry at once.
    pub fn replace(&mut self, fingers: Vec<Option<Id>>) {
        debug_assert_eq!(fingers.len(), self.fingers.len());
        self.fingers = fingers;
    }

    /// Clear every entry pointing at `id`.
    pub fn remove(&mut self, id: &Id) {
        for entry in self.fingers.iter_mut() {
            if entry.as_ref() == Some(id) {
                *entry = None;
            }
        }
    }

    /// All entries, lowest order first.
    pub fn entries(&self) -> &[Option<Id>] {
        &self.fingers
    }

    /// Scan from the highest order entry down and return the first finger that
    /// lies strictly between this node and `target` and is accepted by `usable`.
    pub fn closest_preceding(&self, target: Id, usable: impl Fn(&Id) -> bool) -> Option<Id> {
        self.fingers
            .iter()
            .rev()
            .flatten()
            .find(|finger| between(**finger, self.id, target, false, false) && usable(*finger))
            .copied()
    }

    /// The lowest order finger other than this node accepted by `usable`.
    pub fn first(&self, usable: impl Fn(&Id) -> bool) -> Option<Id> {
        self.fingers
            .iter()
            .flatten()
            .find(|finger| **finger != self.id && usable(*finger))
            .copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> FingerTable {
        // Node 1 on a 5 bit ring with nodes 4, 9, 20.
        let mut table = FingerTable::new(Id(1), 5);
        table.replace(vec![
            Some(Id(4)),
            Some(Id(4)),
            Some(Id(9)),
            Some(Id(9)),
            Some(Id(20)),
        ]);
        table
    }

    #[test]
    fn empty_table() {
        let table = FingerTable::new(Id(3), 5);

        assert_eq!(table.len(), 5);
        assert!(table.is_empty());
        assert_eq!(table.closest_preceding(Id(10), |_| true), None);
        assert_eq!(table.first(|_| true), None);
    }

    #[test]
    fn closest_preceding_prefers_highest_finger() {
        let table = table();

        assert_eq!(table.closest_preceding(Id(25), |_| true), Some(Id(20)));
        assert_eq!(table.closest_preceding(Id(15), |_| true), Some(Id(9)));
        assert_eq!(table.closest_preceding(Id(9), |_| true), Some(Id(4)));
        // Nothing lies strictly between 1 and 3.
        assert_eq!(table.closest_preceding(Id(3), |_| true), None);
        // Wrapping target: 0 is after every finger.
        assert_eq!(table.closest_preceding(Id(0), |_| true), Some(Id(20)));
    }

    #[test]
    fn closest_preceding_skips_unusable() {
        let table = table();

        assert_eq!(
            table.closest_preceding(Id(25), |id| *id != Id(20)),
            Some(Id(9))
        );
    }

    #[test]
    fn first_and_remove() {
        let mut table = table();

        assert_eq!(table.first(|_| true), Some(Id(4)));

        table.remove(&Id(4));

        assert_eq!(table.get(0), None);
        assert_eq!(table.get(1), None);
        assert_eq!(table.first(|_| true), Some(Id(9)));
        assert_eq!(table.first(|id| *id == Id(20)), Some(Id(20)));
    }
}
