//! Reusable index row buffers.
//!
//! An [`IndexRowBuffer`] is bound to one index shape at construction and then
//! cycles through write/read phases for the lifetime of a pool entry. In the
//! write phase it accumulates encoded field segments for a new index entry;
//! in the read phase it wraps stored key (and, for group indexes, value)
//! bytes and answers field decodes, hierarchical-key projection, and ordered
//! comparison against sibling rows of the same shape.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use hkv_error::{HkvError, Result};
use hkv_schema::{HKey, HKeySlot, IndexDef, TableDef};
use hkv_spatial::SpatialColumnHandler;
use hkv_types::{Key, KeySegment, ScalarValue};
use tracing::warn;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Physical layout of an index entry's stored value part.
///
/// Table-index entries are key-only. Group-index entries carry an optional
/// value holding the table bitmap that records which tables of the branch
/// contributed non-null fields to the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    TableIndex,
    GroupIndex { value: Option<Vec<u8>> },
}

/// A mutable, reusable index row.
#[derive(Debug)]
pub struct IndexRowBuffer {
    serial: u64,
    index: Arc<IndexDef>,
    key: Key,
    kind: RowKind,
    pkey_fields: usize,
    pkey_appends: usize,
    hkey_cache: Option<HKey>,
}

impl IndexRowBuffer {
    pub fn new(index: Arc<IndexDef>) -> Self {
        let kind = if index.is_group_index() {
            RowKind::GroupIndex { value: None }
        } else {
            RowKind::TableIndex
        };
        let pkey_fields = index.physical_field_count();
        Self {
            serial: NEXT_SERIAL.fetch_add(1, AtomicOrdering::Relaxed),
            index,
            key: Key::new(),
            kind,
            pkey_fields,
            pkey_appends: 0,
            hkey_cache: None,
        }
    }

    /// Stable identity of this buffer instance, independent of its contents.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[cfg(test)]
    pub(crate) fn force_serial(&mut self, serial: u64) {
        self.serial = serial;
    }

    pub fn index(&self) -> &Arc<IndexDef> {
        &self.index
    }

    pub fn is_group_row(&self) -> bool {
        matches!(self.kind, RowKind::GroupIndex { .. })
    }

    /// Number of physical key fields this row's shape carries.
    pub fn field_count(&self) -> usize {
        self.pkey_fields
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn key_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }

    /// Stored value bytes, if this row kind carries any.
    pub fn value_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            RowKind::TableIndex => None,
            RowKind::GroupIndex { value } => value.as_deref(),
        }
    }

    pub fn key_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Return the buffer to its pristine state, keeping the shape binding.
    pub fn reset(&mut self) {
        self.key.clear();
        self.pkey_appends = 0;
        self.hkey_cache = None;
        if let RowKind::GroupIndex { value } = &mut self.kind {
            *value = None;
        }
    }

    // ------------------------------------------------------------------
    // Write phase
    // ------------------------------------------------------------------

    /// Begin composing a fresh index entry.
    pub fn reset_for_write(&mut self) {
        self.reset();
    }

    /// Append one scalar field in shape order.
    pub fn append(&mut self, value: &ScalarValue) -> Result<()> {
        if self.pkey_appends >= self.pkey_fields {
            return Err(HkvError::shape(format!(
                "index {} holds {} fields, cannot append another",
                self.index.name(),
                self.pkey_fields
            )));
        }
        self.key.append_value(value);
        self.pkey_appends += 1;
        Ok(())
    }

    /// Append an arbitrary segment. Edge markers do not consume a field
    /// position; scalar and ordinal segments do.
    pub fn append_segment(&mut self, segment: &KeySegment) -> Result<()> {
        match segment {
            KeySegment::Before | KeySegment::After => {
                self.key.append(segment);
                Ok(())
            }
            KeySegment::Scalar(value) => self.append(value),
            KeySegment::Ordinal(ordinal) => {
                if self.pkey_appends >= self.pkey_fields {
                    return Err(HkvError::shape(format!(
                        "index {} holds {} fields, cannot append another",
                        self.index.name(),
                        self.pkey_fields
                    )));
                }
                self.key.append_ordinal(*ordinal);
                self.pkey_appends += 1;
                Ok(())
            }
        }
    }

    /// Compose the whole entry from one logical row's field values, given in
    /// index column order. Spatial column runs collapse into a single z-value
    /// segment at the position of the first spatial column.
    pub fn initialize(
        &mut self,
        row_values: &[ScalarValue],
        mut spatial: Option<&mut SpatialColumnHandler>,
    ) -> Result<()> {
        self.reset_for_write();
        let z = match spatial.as_deref_mut() {
            Some(handler) => Some(handler.z_value(row_values)?),
            None => None,
        };
        let logical_fields = self.index.all_columns().len();
        for index_field in 0..logical_fields {
            if let (Some(handler), Some(z)) = (spatial.as_deref(), z) {
                if handler.handle_spatial_column(&mut self.key, index_field, z) {
                    if index_field == handler.first_spatial_field() {
                        self.pkey_appends += 1;
                    }
                    continue;
                }
            }
            let value = row_values.get(index_field).ok_or_else(|| {
                HkvError::shape(format!(
                    "index {} expects {} field values, got {}",
                    self.index.name(),
                    logical_fields,
                    row_values.len()
                ))
            })?;
            self.key.append_value(value);
            self.pkey_appends += 1;
        }
        Ok(())
    }

    /// Record which tables contributed fields to a group-index entry.
    pub fn set_table_bitmap(&mut self, bitmap: u64) -> Result<()> {
        match &mut self.kind {
            RowKind::GroupIndex { value } => {
                *value = Some(bitmap.to_be_bytes().to_vec());
                Ok(())
            }
            RowKind::TableIndex => Err(HkvError::unsupported(format!(
                "table index {} carries no table bitmap",
                self.index.name()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Read phase
    // ------------------------------------------------------------------

    /// Bind this buffer over stored entry bytes for decoding.
    pub fn reset_for_read(&mut self, key_bytes: &[u8], value_bytes: Option<&[u8]>) -> Result<()> {
        self.key.set_bytes(key_bytes)?;
        self.pkey_appends = self.key.segment_count();
        self.hkey_cache = None;
        match &mut self.kind {
            RowKind::GroupIndex { value } => {
                *value = value_bytes.map(<[u8]>::to_vec);
            }
            RowKind::TableIndex => {
                if value_bytes.is_some() {
                    return Err(HkvError::unsupported(format!(
                        "table index {} entries are key-only",
                        self.index.name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Bind stored bytes and eagerly project the leaf table's hierarchical
    /// key, so later [`Self::hkey`] calls cannot observe a rebound buffer.
    pub fn copy_from(&mut self, key_bytes: &[u8], value_bytes: Option<&[u8]>) -> Result<()> {
        self.reset_for_read(key_bytes, value_bytes)?;
        let leaf = self.construct_hkey(self.index.leaf_depth())?;
        self.hkey_cache = Some(leaf);
        Ok(())
    }

    /// The leaf table's hierarchical key, cached by [`Self::copy_from`].
    pub fn hkey(&self) -> Result<&HKey> {
        self.hkey_cache
            .as_ref()
            .ok_or_else(|| HkvError::shape("hkey requested before a row was copied in".to_owned()))
    }

    /// Project the hierarchical key of `table`, which must lie on this
    /// index's branch path.
    pub fn ancestor_hkey(&self, table: &TableDef) -> Result<HKey> {
        let depth = table.depth as usize;
        let on_path = self.index.table_at_depth(depth)? == table.id;
        if !on_path {
            return Err(HkvError::shape(format!(
                "table {} is not on the branch of index {}",
                table.name,
                self.index.name()
            )));
        }
        let mut hkey = if depth == self.index.leaf_depth() {
            match &self.hkey_cache {
                Some(cached) => cached.clone(),
                None => self.construct_hkey(depth)?,
            }
        } else {
            self.construct_hkey(depth)?
        };
        hkey.truncate_to(self.index.hkey_segment_count(depth)?);
        Ok(hkey)
    }

    /// Evaluate the projection program for `depth` against the bound key.
    fn construct_hkey(&self, depth: usize) -> Result<HKey> {
        let program = self.index.to_hkey(depth)?;
        let spatial_shift = self
            .index
            .spatial()
            .map(|s| (s.first_spatial_field, s.dimensions() - 1));
        let mut hkey = HKey::new();
        for slot in program.slots() {
            match *slot {
                HKeySlot::Ordinal(ordinal) => hkey.key_mut().append_ordinal(ordinal),
                HKeySlot::IndexField(position) => {
                    let position = match spatial_shift {
                        Some((first, shift)) if position > first => position - shift,
                        _ => position,
                    };
                    if position >= self.pkey_fields {
                        return Err(HkvError::shape(format!(
                            "projection for index {} references field {} of {}",
                            self.index.name(),
                            position,
                            self.pkey_fields
                        )));
                    }
                    let raw = self.key.segment_raw(position).map_err(|_| {
                        warn!(
                            index = self.index.name(),
                            position, "stored index entry shorter than its shape"
                        );
                        HkvError::Corrupt {
                            detail: format!(
                                "index {} entry has no field {}",
                                self.index.name(),
                                position
                            ),
                        }
                    })?;
                    hkey.key_mut().append_raw_segment(raw);
                }
            }
        }
        Ok(hkey)
    }

    /// Which tables of the branch contributed non-null fields, for group
    /// indexes. `None` when the stored entry carried no value part.
    pub fn table_bitmap(&self) -> Result<Option<u64>> {
        match &self.kind {
            RowKind::GroupIndex { value } => match value {
                None => Ok(None),
                Some(bytes) => {
                    let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                        warn!(
                            index = self.index.name(),
                            len = bytes.len(),
                            "group index value part has wrong length"
                        );
                        HkvError::Corrupt {
                            detail: format!(
                                "group index {} bitmap is {} bytes, want 8",
                                self.index.name(),
                                bytes.len()
                            ),
                        }
                    })?;
                    Ok(Some(u64::from_be_bytes(raw)))
                }
            },
            RowKind::TableIndex => Err(HkvError::unsupported(format!(
                "table index {} carries no table bitmap",
                self.index.name()
            ))),
        }
    }

    /// Copy the encoded segment at `position` onto `target` without decoding.
    pub fn append_field_to(&self, position: usize, target: &mut Key) -> Result<()> {
        if position >= self.pkey_fields {
            return Err(HkvError::shape(format!(
                "field {position} out of range for index {} with {} fields",
                self.index.name(),
                self.pkey_fields
            )));
        }
        let raw = self.key.segment_raw(position)?;
        target.append_raw_segment(raw);
        Ok(())
    }

    /// Decode the physical field at `position` to its declared type.
    pub fn field(&self, position: usize) -> Result<ScalarValue> {
        let ty = self.index.physical_field_type(position)?;
        self.key.decode_segment(position, ty)
    }

    /// Ordered comparison against a sibling row of the same shape over the
    /// first `field_count` fields, honoring per-field sort direction.
    pub fn compare_to(
        &self,
        other: &IndexRowBuffer,
        field_count: usize,
        ascending: Option<&[bool]>,
    ) -> std::cmp::Ordering {
        crate::compare::compare_rows(self, other, field_count, ascending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{coi_group, group_index, table_index};
    use hkv_types::ScalarValue as V;

    #[test]
    fn write_then_read_round_trips_fields() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(Arc::clone(&index));
        row.reset_for_write();
        row.append(&V::Text("sku-9".to_owned())).unwrap();
        row.append(&V::Int(7)).unwrap();
        row.append(&V::Int(70)).unwrap();
        row.append(&V::Int(700)).unwrap();

        let stored = row.key_bytes().to_vec();
        let mut read = IndexRowBuffer::new(index);
        read.reset_for_read(&stored, None).unwrap();
        assert_eq!(read.field(0).unwrap(), V::Text("sku-9".to_owned()));
        assert_eq!(read.field(1).unwrap(), V::Int(7));
        assert_eq!(read.field(2).unwrap(), V::Int(70));
        assert_eq!(read.field(3).unwrap(), V::Int(700));
    }

    #[test]
    fn append_past_shape_is_refused() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(index);
        row.reset_for_write();
        for _ in 0..4 {
            row.append(&V::Int(1)).unwrap();
        }
        assert!(row.append(&V::Int(5)).is_err());
    }

    #[test]
    fn edge_segments_do_not_consume_fields() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(index);
        row.reset_for_write();
        row.append(&V::Int(1)).unwrap();
        row.append_segment(&KeySegment::After).unwrap();
        assert_eq!(row.key().segment_count(), 2);
    }

    #[test]
    fn copy_from_caches_leaf_hkey() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(index);
        row.reset_for_write();
        row.append(&V::Text("sku-1".to_owned())).unwrap();
        row.append(&V::Int(10)).unwrap();
        row.append(&V::Int(20)).unwrap();
        row.append(&V::Int(30)).unwrap();
        let stored = row.key_bytes().to_vec();

        let mut read = IndexRowBuffer::new(Arc::clone(row.index()));
        assert!(read.hkey().is_err());
        read.copy_from(&stored, None).unwrap();
        let hkey = read.hkey().unwrap();
        // ord(customer), cid, ord(order), oid, ord(item), iid
        assert_eq!(hkey.segment_count(), 6);
        assert_eq!(hkey.decode_ordinal(0).unwrap(), 1);
        assert_eq!(hkey.decode_ordinal(2).unwrap(), 2);
        assert_eq!(hkey.decode_ordinal(4).unwrap(), 3);
    }

    #[test]
    fn ancestor_hkey_is_prefix_of_leaf_hkey() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(index);
        row.reset_for_write();
        row.append(&V::Text("sku-1".to_owned())).unwrap();
        row.append(&V::Int(10)).unwrap();
        row.append(&V::Int(20)).unwrap();
        row.append(&V::Int(30)).unwrap();
        let stored = row.key_bytes().to_vec();

        let mut read = IndexRowBuffer::new(Arc::clone(row.index()));
        read.copy_from(&stored, None).unwrap();
        let leaf = read.hkey().unwrap().clone();
        let order = read.ancestor_hkey(group.table(hkv_types::TableId(2)).unwrap()).unwrap();
        assert_eq!(order.segment_count(), 4);
        assert!(leaf.as_bytes().starts_with(order.as_bytes()));
        let customer = read
            .ancestor_hkey(group.table(hkv_types::TableId(1)).unwrap())
            .unwrap();
        assert_eq!(customer.segment_count(), 2);
        assert!(order.as_bytes().starts_with(customer.as_bytes()));
    }

    #[test]
    fn short_stored_entry_surfaces_as_corrupt() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        // Validly encoded, but one segment where the shape holds four; the
        // leaf projection references fields this entry does not contain.
        let mut key = Key::new();
        key.append_value(&V::Text("sku-1".to_owned()));

        let mut row = IndexRowBuffer::new(Arc::clone(&index));
        assert!(matches!(
            row.copy_from(key.as_bytes(), None),
            Err(HkvError::Corrupt { .. })
        ));

        let mut row = IndexRowBuffer::new(index);
        row.reset_for_read(key.as_bytes(), None).unwrap();
        assert!(matches!(
            row.ancestor_hkey(group.table(hkv_types::TableId(2)).unwrap()),
            Err(HkvError::Corrupt { .. })
        ));
    }

    #[test]
    fn bitmap_round_trips_on_group_rows_only() {
        let group = coi_group();
        let gi = Arc::new(group_index(&group));
        let mut row = IndexRowBuffer::new(gi);
        row.reset_for_write();
        row.set_table_bitmap(0b101).unwrap();
        assert_eq!(row.table_bitmap().unwrap(), Some(0b101));

        let ti = Arc::new(table_index(&group));
        let mut table_row = IndexRowBuffer::new(ti);
        assert!(table_row.set_table_bitmap(1).is_err());
        assert!(table_row.table_bitmap().is_err());
    }

    #[test]
    fn table_rows_refuse_stored_values() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(Arc::clone(&index));
        row.reset_for_write();
        row.append(&V::Int(1)).unwrap();
        let stored = row.key_bytes().to_vec();
        let mut read = IndexRowBuffer::new(index);
        assert!(read.reset_for_read(&stored, Some(&[0u8; 8])).is_err());
    }

    #[test]
    fn reset_leaves_key_empty() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(index);
        row.reset_for_write();
        row.append(&V::Int(1)).unwrap();
        row.reset();
        assert!(row.key_empty());
    }
}
