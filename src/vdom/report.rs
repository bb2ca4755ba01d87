//! Patch accounting.

use serde::Serialize;

bitflags::bitflags! {
    /// Kinds of live mutation a render performed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Changes: u8 {
        const CREATED = 1 << 0;
        const REMOVED = 1 << 1;
        const REPLACED = 1 << 2;
        const TEXT = 1 << 3;
        const ATTRIBUTES = 1 << 4;
        const MOVED = 1 << 5;
    }
}

/// Live operations performed by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    /// Live nodes created (elements and text).
    pub created: usize,
    pub removed: usize,
    pub replaced: usize,
    pub text_updates: usize,
    pub attr_sets: usize,
    pub attr_removals: usize,
    /// Subcomponent roots placed or reordered.
    pub moved: usize,
}

impl PatchReport {
    pub fn changes(&self) -> Changes {
        let mut changes = Changes::empty();
        changes.set(Changes::CREATED, self.created > 0);
        changes.set(Changes::REMOVED, self.removed > 0);
        changes.set(Changes::REPLACED, self.replaced > 0);
        changes.set(Changes::TEXT, self.text_updates > 0);
        changes.set(Changes::ATTRIBUTES, self.attr_sets + self.attr_removals > 0);
        changes.set(Changes::MOVED, self.moved > 0);
        changes
    }

    /// True when nothing in the live tree was touched.
    pub fn is_noop(&self) -> bool {
        self.changes().is_empty()
    }

    /// Total number of live operations.
    pub fn total(&self) -> usize {
        self.created
            + self.removed
            + self.replaced
            + self.text_updates
            + self.attr_sets
            + self.attr_removals
            + self.moved
    }

    /// Fold another report (a subcomponent's) into this one.
    pub fn merge(&mut self, other: &PatchReport) {
        self.created += other.created;
        self.removed += other.removed;
        self.replaced += other.replaced;
        self.text_updates += other.text_updates;
        self.attr_sets += other.attr_sets;
        self.attr_removals += other.attr_removals;
        self.moved += other.moved;
    }
}
