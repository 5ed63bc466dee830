//! Canonical display order and aggregate counts derived from a snapshot.

use std::cmp::Ordering;

use shared::domain::{Aggregates, Item};
use tracing::debug;

use crate::store::Snapshot;

/// Unpurchased before purchased; newest first within each group.
pub fn compare_items(a: &Item, b: &Item) -> Ordering {
    a.is_purchased
        .cmp(&b.is_purchased)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Sorts with [`compare_items`]. Remaining ties keep their snapshot order.
pub fn sort_items(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by(compare_items);
    items
}

pub fn aggregates(items: &[Item]) -> Aggregates {
    Aggregates {
        total: items.len(),
        purchased_count: items.iter().filter(|item| item.is_purchased).count(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledView {
    pub revision: u64,
    pub items: Vec<Item>,
    pub aggregates: Aggregates,
}

pub fn reconcile(snapshot: Snapshot) -> ReconciledView {
    let aggregates = aggregates(&snapshot.items);
    ReconciledView {
        revision: snapshot.revision,
        items: sort_items(snapshot.items),
        aggregates,
    }
}

/// The single live view. Each accepted snapshot fully replaces the previous
/// one; snapshots older than the applied revision are dropped.
#[derive(Debug, Default)]
pub struct ViewState {
    current: Option<ReconciledView>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when the snapshot is stale.
    pub fn apply(&mut self, snapshot: Snapshot) -> Option<&ReconciledView> {
        if let Some(current) = &self.current {
            if snapshot.revision < current.revision {
                debug!(
                    applied = current.revision,
                    received = snapshot.revision,
                    "dropping stale snapshot"
                );
                return None;
            }
        }
        self.current = Some(reconcile(snapshot));
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&ReconciledView> {
        self.current.as_ref()
    }

    pub fn items(&self) -> &[Item] {
        self.current
            .as_ref()
            .map(|view| view.items.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
