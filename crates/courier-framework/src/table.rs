//! The handler group table.
//!
//! Handlers are registered into numbered groups; groups are visited in
//! ascending order and, within a group, handlers keep their registration
//! order. The table is mutated concurrently with dispatch, so readers never
//! iterate the live structure: [`GroupTable::snapshot`] hands out a
//! point-in-time copy (cheap `Arc` clones) and the dispatcher routes each
//! update against that copy. Registrations made mid-dispatch apply to the
//! next update, never to one already in flight.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::handler::BoxedHandler;

/// An ordered, concurrently-mutable table of handler groups.
#[derive(Default)]
pub struct GroupTable {
    groups: RwLock<BTreeMap<i32, Vec<BoxedHandler>>>,
}

impl GroupTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to a group, creating the group if needed.
    pub fn add(&self, handler: BoxedHandler, group: i32) {
        let mut groups = self.groups.write();
        debug!(group, handler = handler.name(), "handler registered");
        groups.entry(group).or_default().push(handler);
    }

    /// Removes the first handler named `name` from `group`.
    ///
    /// The group itself is dropped once it holds no handlers. Returns whether
    /// a removal occurred.
    pub fn remove(&self, name: &str, group: i32) -> bool {
        let mut groups = self.groups.write();
        let Some(handlers) = groups.get_mut(&group) else {
            return false;
        };
        let Some(position) = handlers.iter().position(|h| h.name() == name) else {
            return false;
        };
        handlers.remove(position);
        if handlers.is_empty() {
            groups.remove(&group);
        }
        debug!(group, handler = name, "handler removed");
        true
    }

    /// Removes an entire group. Returns whether the group existed.
    pub fn remove_group(&self, group: i32) -> bool {
        self.groups.write().remove(&group).is_some()
    }

    /// Returns a point-in-time copy of the table, ordered by group number.
    ///
    /// The copy is independent: later `add`/`remove` calls do not affect a
    /// snapshot already taken.
    pub fn snapshot(&self) -> Vec<(i32, Vec<BoxedHandler>)> {
        self.groups
            .read()
            .iter()
            .map(|(group, handlers)| (*group, handlers.clone()))
            .collect()
    }

    /// Number of groups currently registered.
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }

    /// Total number of handlers across all groups.
    pub fn handler_count(&self) -> usize {
        self.groups.read().values().map(Vec::len).sum()
    }

    /// Whether the table holds no handlers.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl std::fmt::Debug for GroupTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupTable")
            .field("groups", &self.group_count())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testutil::Probe;

    #[test]
    fn groups_iterate_in_ascending_order() {
        let table = GroupTable::new();
        table.add(Arc::new(Probe::new("late")), 10);
        table.add(Arc::new(Probe::new("early")), -3);
        table.add(Arc::new(Probe::new("middle")), 0);

        let order: Vec<i32> = table.snapshot().iter().map(|(g, _)| *g).collect();
        assert_eq!(order, vec![-3, 0, 10]);
    }

    #[test]
    fn remove_takes_first_match_and_drops_empty_groups() {
        let table = GroupTable::new();
        table.add(Arc::new(Probe::new("dup")), 1);
        table.add(Arc::new(Probe::new("dup")), 1);

        assert!(table.remove("dup", 1));
        assert_eq!(table.handler_count(), 1);

        assert!(table.remove("dup", 1));
        assert_eq!(table.group_count(), 0);

        assert!(!table.remove("dup", 1));
        assert!(!table.remove("missing", 99));
    }

    #[test]
    fn remove_group_clears_the_index_entry() {
        let table = GroupTable::new();
        table.add(Arc::new(Probe::new("a")), 2);
        table.add(Arc::new(Probe::new("b")), 2);

        assert!(table.remove_group(2));
        assert!(table.is_empty());
        assert!(!table.remove_group(2));
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutation() {
        let table = GroupTable::new();
        table.add(Arc::new(Probe::new("a")), 0);

        let snapshot = table.snapshot();
        table.add(Arc::new(Probe::new("b")), 0);
        table.remove("a", 0);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1.len(), 1);
        assert_eq!(snapshot[0].1[0].name(), "a");

        let fresh = table.snapshot();
        assert_eq!(fresh[0].1.len(), 1);
        assert_eq!(fresh[0].1[0].name(), "b");
    }
}
