//! Index-to-HKey projection programs.
//!
//! A program is the precomputed recipe for rebuilding an ancestor table's
//! hierarchical key from an index entry's own key bytes: a flat slot list
//! alternating ordinal literals (one per hierarchy level) with copy slots
//! naming the index-row position of each primary-key field. Programs are
//! built once at schema load and shared read-only by every row of the same
//! index shape.

use serde::{Deserialize, Serialize};

/// One instruction of a projection program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HKeySlot {
    /// Emit this table-type ordinal literally.
    Ordinal(i32),
    /// Copy the segment at this 0-based position of the index row's own key
    /// bytes, verbatim. Positions refer to the uncollapsed column list; a
    /// spatial index's evaluator shifts positions past the collapsed range.
    IndexField(usize),
}

/// A complete program targeting one ancestor depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexToHKey {
    slots: Vec<HKeySlot>,
}

impl IndexToHKey {
    pub fn new(slots: Vec<HKeySlot>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[HKeySlot] {
        &self.slots
    }

    /// Number of copy slots, which equals the number of primary-key fields
    /// the target ancestor's HKey needs.
    pub fn copy_slot_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, HKeySlot::IndexField(_)))
            .count()
    }
}
