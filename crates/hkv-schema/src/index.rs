//! Index definitions.
//!
//! An index is either a *table index* (owned by one table) or a *group index*
//! (spanning a contiguous ancestor chain). Its physical row holds the
//! declared key columns followed by whichever hkey columns are not already
//! declared, so that an index entry alone can reconstruct any ancestor's
//! HKey. Everything here is computed once at schema load and then shared
//! read-only by every row buffer bound to the shape.

use hkv_error::{HkvError, Result};
use hkv_types::{IndexId, ScalarType, TableId};
use serde::{Deserialize, Serialize};

use crate::group::Group;
use crate::projection::{HKeySlot, IndexToHKey};

/// Upper bound on spatial dimensionality (z-values carry at most 57 bits).
pub const MAX_SPATIAL_DIMENSIONS: usize = 6;

/// One indexed column, identified by owning table and column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub table: TableId,
    pub column: usize,
    pub ty: ScalarType,
}

impl IndexColumn {
    /// Resolve a (table, column) pair against the group, picking up the
    /// declared type.
    pub fn of(group: &Group, table: TableId, column: usize) -> Result<Self> {
        let def = group.table(table)?;
        let col = def.columns.get(column).ok_or_else(|| {
            HkvError::definition(format!("{}: column {column} out of range", def.name))
        })?;
        Ok(Self {
            table,
            column,
            ty: col.ty,
        })
    }
}

/// Table-index vs. group-index ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Owned by exactly one table.
    Table(TableId),
    /// Spans the chain from `root_most` down to `leaf_most`.
    Group {
        root_most: TableId,
        leaf_most: TableId,
    },
}

impl IndexKind {
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Group { .. })
    }

    pub const fn leaf_most(self) -> TableId {
        match self {
            Self::Table(t) => t,
            Self::Group { leaf_most, .. } => leaf_most,
        }
    }
}

/// Spatial declaration: which contiguous range of declared columns holds the
/// coordinates, and the declared bounds of the coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialIndexDef {
    /// Position of the first coordinate column among the declared columns.
    pub first_spatial_field: usize,
    /// Inclusive lower bound per dimension.
    pub lo: Vec<f64>,
    /// Inclusive upper bound per dimension.
    pub hi: Vec<f64>,
}

impl SpatialIndexDef {
    pub fn dimensions(&self) -> usize {
        self.lo.len()
    }

    /// Position of the last coordinate column among the declared columns.
    pub fn last_spatial_field(&self) -> usize {
        self.first_spatial_field + self.dimensions() - 1
    }

    /// Whether `index_field` lies inside the declared coordinate range.
    pub fn covers(&self, index_field: usize) -> bool {
        (self.first_spatial_field..=self.last_spatial_field()).contains(&index_field)
    }
}

/// A complete, immutable index definition.
///
/// `all_columns` is the physical column list: the declared key columns plus
/// the undeclared hkey columns appended without duplicates. The projection
/// programs in `to_hkey` reference positions in this list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDef {
    id: IndexId,
    name: String,
    kind: IndexKind,
    key_columns: Vec<IndexColumn>,
    all_columns: Vec<IndexColumn>,
    spatial: Option<SpatialIndexDef>,
    /// One program per ancestor depth, root (0) to the leaf-most table.
    to_hkey: Vec<IndexToHKey>,
    /// HKey segment count per ancestor depth, for truncation.
    hkey_segment_counts: Vec<usize>,
    /// Table id per ancestor depth along the leaf-most path.
    path: Vec<TableId>,
}

impl IndexDef {
    pub fn new(
        id: IndexId,
        name: impl Into<String>,
        kind: IndexKind,
        key_columns: Vec<IndexColumn>,
        spatial: Option<SpatialIndexDef>,
        group: &Group,
    ) -> Result<Self> {
        let name = name.into();
        let leaf_most = kind.leaf_most();
        let path_tables = group.ancestor_path(leaf_most)?;

        if let IndexKind::Group { root_most, .. } = kind {
            if !path_tables.iter().any(|t| t.id == root_most) {
                return Err(HkvError::definition(format!(
                    "index {name}: {root_most} is not an ancestor of {leaf_most}"
                )));
            }
        }
        for col in &key_columns {
            if !path_tables.iter().any(|t| t.id == col.table) {
                return Err(HkvError::definition(format!(
                    "index {name}: column table {} not on the hierarchy path",
                    col.table
                )));
            }
        }
        if let Some(spatial) = &spatial {
            let dims = spatial.dimensions();
            if dims == 0 || dims > MAX_SPATIAL_DIMENSIONS {
                return Err(HkvError::definition(format!(
                    "index {name}: {dims} spatial dimensions (1..={MAX_SPATIAL_DIMENSIONS})"
                )));
            }
            if spatial.hi.len() != dims {
                return Err(HkvError::definition(format!(
                    "index {name}: {} hi bounds for {dims} dimensions",
                    spatial.hi.len()
                )));
            }
            if spatial.last_spatial_field() >= key_columns.len() {
                return Err(HkvError::definition(format!(
                    "index {name}: spatial range exceeds declared columns"
                )));
            }
            for (d, (lo, hi)) in spatial.lo.iter().zip(&spatial.hi).enumerate() {
                if lo >= hi {
                    return Err(HkvError::definition(format!(
                        "index {name}: dimension {d} bounds {lo}..{hi}"
                    )));
                }
            }
            for field in spatial.first_spatial_field..=spatial.last_spatial_field() {
                let ty = key_columns[field].ty;
                if !matches!(ty, ScalarType::Int | ScalarType::Int32 | ScalarType::Decimal) {
                    return Err(HkvError::definition(format!(
                        "index {name}: spatial column {field} has non-numeric type {ty}"
                    )));
                }
            }
        }

        // Physical column list: declared columns, then hkey columns of every
        // level not already present.
        let mut all_columns = key_columns.clone();
        for table in &path_tables {
            for &pk_pos in &table.pk {
                let already = all_columns
                    .iter()
                    .any(|c| c.table == table.id && c.column == pk_pos);
                if !already {
                    all_columns.push(IndexColumn::of(group, table.id, pk_pos)?);
                }
            }
        }

        // Per ancestor depth: one ordinal literal per level, then one copy
        // slot per primary-key field, naming the field's index-row position.
        let mut to_hkey = Vec::with_capacity(path_tables.len());
        let mut hkey_segment_counts = Vec::with_capacity(path_tables.len());
        for depth in 0..path_tables.len() {
            let mut slots = Vec::new();
            for table in &path_tables[..=depth] {
                slots.push(HKeySlot::Ordinal(table.ordinal));
                for &pk_pos in &table.pk {
                    let position = all_columns
                        .iter()
                        .position(|c| c.table == table.id && c.column == pk_pos)
                        .ok_or_else(|| {
                            HkvError::definition(format!(
                                "index {name}: missing hkey column for {} pk {pk_pos}",
                                table.name
                            ))
                        })?;
                    slots.push(HKeySlot::IndexField(position));
                }
            }
            to_hkey.push(IndexToHKey::new(slots));
            hkey_segment_counts.push(group.hkey_segment_count(path_tables[depth].id)?);
        }

        Ok(Self {
            id,
            name,
            kind,
            key_columns,
            all_columns,
            spatial,
            to_hkey,
            hkey_segment_counts,
            path: path_tables.iter().map(|t| t.id).collect(),
        })
    }

    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn is_group_index(&self) -> bool {
        self.kind.is_group()
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial.is_some()
    }

    pub fn spatial(&self) -> Option<&SpatialIndexDef> {
        self.spatial.as_ref()
    }

    /// Declared key columns.
    pub fn key_columns(&self) -> &[IndexColumn] {
        &self.key_columns
    }

    /// Declared plus undeclared hkey columns, uncollapsed.
    pub fn all_columns(&self) -> &[IndexColumn] {
        &self.all_columns
    }

    /// Number of segments a physical index row carries: the spatial range,
    /// if any, collapses to one z-value segment.
    pub fn physical_field_count(&self) -> usize {
        let collapsed = self
            .spatial
            .as_ref()
            .map_or(0, |s| s.dimensions() - 1);
        self.all_columns.len() - collapsed
    }

    /// Declared type of the i-th *physical* field. The collapsed z-value
    /// segment reads as a 64-bit integer.
    pub fn physical_field_type(&self, i: usize) -> Result<ScalarType> {
        if i >= self.physical_field_count() {
            return Err(HkvError::shape(format!(
                "index {}: field {i} out of {}",
                self.name,
                self.physical_field_count()
            )));
        }
        match &self.spatial {
            None => Ok(self.all_columns[i].ty),
            Some(s) => {
                if i == s.first_spatial_field {
                    Ok(ScalarType::Int)
                } else if i < s.first_spatial_field {
                    Ok(self.all_columns[i].ty)
                } else {
                    Ok(self.all_columns[i + s.dimensions() - 1].ty)
                }
            }
        }
    }

    /// Depth of the leaf-most owning table.
    pub fn leaf_depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Table at the given depth on the leaf-most path.
    pub fn table_at_depth(&self, depth: usize) -> Result<TableId> {
        self.path.get(depth).copied().ok_or_else(|| {
            HkvError::shape(format!(
                "index {}: depth {depth} beyond leaf depth {}",
                self.name,
                self.leaf_depth()
            ))
        })
    }

    /// Projection program targeting the ancestor at `depth`.
    pub fn to_hkey(&self, depth: usize) -> Result<&IndexToHKey> {
        self.to_hkey.get(depth).ok_or_else(|| {
            HkvError::shape(format!(
                "index {}: no projection program for depth {depth}",
                self.name
            ))
        })
    }

    /// HKey segment count of the ancestor at `depth`.
    pub fn hkey_segment_count(&self, depth: usize) -> Result<usize> {
        self.hkey_segment_counts.get(depth).copied().ok_or_else(|| {
            HkvError::shape(format!(
                "index {}: no hkey segment count for depth {depth}",
                self.name
            ))
        })
    }
}
