//! Hierarchical keys.
//!
//! An HKey locates one row in its group's shared key space: per hierarchy
//! level, one structural ordinal segment followed by that level's primary-key
//! segments, root first. Truncating a deeper row's HKey to an ancestor's
//! segment count yields exactly the ancestor's HKey, which is what lets a
//! child row's key be a byte-extension of its parent's.

use hkv_error::Result;
use hkv_types::{Key, ScalarValue};

/// An owned hierarchical key. Produced fresh per row materialization; never
/// shared between concurrently open rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HKey {
    key: Key,
}

impl HKey {
    pub const fn new() -> Self {
        Self { key: Key::new() }
    }

    pub const fn from_key(key: Key) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn key_mut(&mut self) -> &mut Key {
        &mut self.key
    }

    pub fn into_key(self) -> Key {
        self.key
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.key.segment_count()
    }

    pub fn clear(&mut self) {
        self.key.clear();
    }

    pub fn append_ordinal(&mut self, ordinal: i32) {
        self.key.append_ordinal(ordinal);
    }

    pub fn append_value(&mut self, value: &ScalarValue) {
        self.key.append_value(value);
    }

    pub fn decode_ordinal(&self, index: usize) -> Result<i32> {
        self.key.decode_ordinal(index)
    }

    /// Keep only the first `segments` segments. Idempotent: re-truncating to
    /// the same count is a no-op.
    pub fn truncate_to(&mut self, segments: usize) {
        self.key.truncate_segments(segments);
    }

    /// A copy truncated to `segments` segments.
    pub fn truncated(&self, segments: usize) -> Self {
        let mut copy = self.clone();
        copy.truncate_to(segments);
        copy
    }
}

impl From<Key> for HKey {
    fn from(key: Key) -> Self {
        Self::from_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hkv_types::ScalarValue;

    fn sample() -> HKey {
        let mut h = HKey::new();
        h.append_ordinal(1);
        h.append_value(&ScalarValue::Int(7));
        h.append_ordinal(2);
        h.append_value(&ScalarValue::Int(40));
        h
    }

    #[test]
    fn truncation_yields_prefix_and_is_idempotent() {
        let full = sample();
        let parent = full.truncated(2);
        assert_eq!(parent.segment_count(), 2);
        assert!(full.as_bytes().starts_with(parent.as_bytes()));
        assert_eq!(parent.truncated(2), parent);
    }

    #[test]
    fn child_key_extends_parent_key() {
        let parent = sample().truncated(2);
        let child = sample();
        assert!(child.as_bytes().len() > parent.as_bytes().len());
        assert!(child.as_bytes().starts_with(parent.as_bytes()));
        assert!(parent < child);
    }
}
