//! Index row materialization for the hkv engine.
//!
//! Ties the lower layers together: a reusable [`IndexRowBuffer`] encodes and
//! decodes one index entry, projects hierarchical keys through its shape's
//! precomputed programs, compares field-by-field against sibling rows, and
//! cycles through a per-worker [`IndexRowPool`] between scans.

pub mod compare;
pub mod pool;
pub mod row;

#[cfg(test)]
pub(crate) mod testing;

pub use compare::compare_rows;
pub use pool::IndexRowPool;
pub use row::{IndexRowBuffer, RowKind};
