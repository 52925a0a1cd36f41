//! Catalog boundary model for the hkv engine.
//!
//! The catalog itself (DDL, persistence, versioning) is an external
//! collaborator; this crate holds the read-only shapes it hands to the
//! engine at schema load: the table hierarchy of one group, index
//! definitions, and the precomputed index-to-HKey projection programs.

pub mod group;
pub mod hkey;
pub mod index;
pub mod projection;

pub use group::{ColumnDef, Group, TableDef};
pub use hkey::HKey;
pub use index::{IndexColumn, IndexDef, IndexKind, SpatialIndexDef};
pub use projection::{HKeySlot, IndexToHKey};
