//! hkv: index rows and hierarchical keys over an ordered key-value store.
//!
//! Rows of a table hierarchy share one physical key space. Every row is
//! addressed by a hierarchical key (HKey) that alternates structural ordinal
//! segments with primary-key values, root first, so a child row's key is a
//! byte-extension of its parent's. Index entries are encoded with the same
//! order-preserving codec, and each index carries precomputed projection
//! programs that rebuild any ancestor's HKey from an entry's bytes alone.
//!
//! This crate is the single public surface; the layered implementation
//! crates sit beneath it:
//!
//! * `hkv-types`: scalar values, fixed-scale decimals, and the ordered
//!   self-delimiting key codec.
//! * `hkv-schema`: group hierarchies, index definitions, HKeys, and the
//!   index-to-HKey projection programs.
//! * `hkv-spatial`: z-order projection of multi-dimensional columns onto a
//!   single ordered scalar.
//! * `hkv-index`: reusable index row buffers, field-aware comparison, and
//!   the per-worker buffer pool.

pub use hkv_error::{HkvError, Result};
pub use hkv_index::{compare_rows, IndexRowBuffer, IndexRowPool, RowKind};
pub use hkv_schema::{
    ColumnDef, Group, HKey, HKeySlot, IndexColumn, IndexDef, IndexKind, IndexToHKey,
    SpatialIndexDef, TableDef,
};
pub use hkv_spatial::{Space, SpatialColumnHandler, MAX_DIMENSIONS, MAX_Z_BITS};
pub use hkv_types::{
    ContextId, Decimal, IndexId, Key, KeySegment, ScalarType, ScalarValue, SegmentTag, TableId,
};
