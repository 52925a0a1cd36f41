//! Table hierarchy of one group.
//!
//! Tables related by parent/child foreign keys share one physical key space:
//! a child row's key extends its parent's key by one ordinal segment plus the
//! child's primary-key segments. Depth is 0 at the root and increases by
//! exactly one per level; each table carries a unique non-negative ordinal
//! identifying its type inside the group.

use hkv_error::{HkvError, Result};
use hkv_types::{ScalarType, TableId};

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ScalarType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One table's position and shape within a group.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TableDef {
    pub id: TableId,
    pub name: String,
    /// Root = 0, strictly +1 per level.
    pub depth: u32,
    /// Structural type tag written between hierarchy levels in keys.
    pub ordinal: i32,
    pub parent: Option<TableId>,
    pub columns: Vec<ColumnDef>,
    /// Positions of the primary-key columns within `columns`, in key order.
    pub pk: Vec<usize>,
}

impl TableDef {
    pub fn pk_field_count(&self) -> usize {
        self.pk.len()
    }

    /// Declared type of the i-th primary-key field.
    pub fn pk_type(&self, i: usize) -> Result<ScalarType> {
        let pos = *self
            .pk
            .get(i)
            .ok_or_else(|| HkvError::shape(format!("{}: pk field {i} out of range", self.name)))?;
        Ok(self.columns[pos].ty)
    }
}

/// A validated group: one root table plus descendant chains.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Group {
    name: String,
    tables: Vec<TableDef>,
}

impl Group {
    /// Validate and adopt a set of tables. Rejected shapes: no single root,
    /// a child whose depth is not parent depth + 1, duplicate ids or
    /// ordinals, negative ordinals, primary-key positions out of range.
    pub fn new(name: impl Into<String>, tables: Vec<TableDef>) -> Result<Self> {
        let name = name.into();
        let roots = tables.iter().filter(|t| t.parent.is_none()).count();
        if roots != 1 {
            return Err(HkvError::definition(format!(
                "group {name}: expected exactly one root table, found {roots}"
            )));
        }
        for table in &tables {
            if table.ordinal < 0 {
                return Err(HkvError::definition(format!(
                    "table {}: negative ordinal {}",
                    table.name, table.ordinal
                )));
            }
            if tables
                .iter()
                .filter(|t| t.id == table.id || t.ordinal == table.ordinal)
                .count()
                > 1
            {
                return Err(HkvError::definition(format!(
                    "table {}: duplicate id or ordinal in group {name}",
                    table.name
                )));
            }
            for &pos in &table.pk {
                if pos >= table.columns.len() {
                    return Err(HkvError::definition(format!(
                        "table {}: pk position {pos} out of range",
                        table.name
                    )));
                }
            }
            match table.parent {
                None => {
                    if table.depth != 0 {
                        return Err(HkvError::definition(format!(
                            "root table {} has depth {}",
                            table.name, table.depth
                        )));
                    }
                }
                Some(parent_id) => {
                    let parent = tables.iter().find(|t| t.id == parent_id).ok_or_else(|| {
                        HkvError::definition(format!(
                            "table {}: parent {parent_id} not in group",
                            table.name
                        ))
                    })?;
                    if table.depth != parent.depth + 1 {
                        return Err(HkvError::definition(format!(
                            "table {}: depth {} under parent depth {}",
                            table.name, table.depth, parent.depth
                        )));
                    }
                }
            }
        }
        Ok(Self { name, tables })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn table(&self, id: TableId) -> Result<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| HkvError::shape(format!("{id} not in group {}", self.name)))
    }

    pub fn table_by_name(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| HkvError::shape(format!("table {name} not in group {}", self.name)))
    }

    /// Tables from the root down to `id`, inclusive.
    pub fn ancestor_path(&self, id: TableId) -> Result<Vec<&TableDef>> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let table = self.table(cur)?;
            path.push(table);
            current = table.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Whether `ancestor` is `descendant` itself or on its root path.
    pub fn is_ancestor_or_self(&self, ancestor: TableId, descendant: TableId) -> Result<bool> {
        Ok(self
            .ancestor_path(descendant)?
            .iter()
            .any(|t| t.id == ancestor))
    }

    /// Encoded segment count of an HKey that reaches down to `table`: one
    /// ordinal plus the primary-key fields, per level. Truncating a deeper
    /// row's HKey to this count yields exactly the ancestor's HKey.
    pub fn hkey_segment_count(&self, table: TableId) -> Result<usize> {
        Ok(self
            .ancestor_path(table)?
            .iter()
            .map(|t| 1 + t.pk_field_count())
            .sum())
    }
}
