//! Per-index spatial column handling.
//!
//! A spatial index declares a contiguous range of coordinate columns but
//! physically stores exactly one key segment for the whole range: the
//! z-value. The handler owns that collapse for the write path: it binds the
//! declared source columns of a row, projects them into the index's declared
//! coordinate space, and tells the per-column append loop which declared
//! positions to skip.

use hkv_error::{HkvError, Result};
use hkv_schema::IndexDef;
use hkv_types::{Key, ScalarValue};

use crate::space::{Space, MAX_Z_BITS};

/// Spatial projection state for one index shape.
///
/// Stateless across rows except for the scratch coordinate array, which is
/// overwritten per evaluation. Not shared between threads.
#[derive(Debug)]
pub struct SpatialColumnHandler {
    first_spatial_field: usize,
    last_spatial_field: usize,
    /// Declared f64 bounds per dimension.
    lo: Vec<f64>,
    hi: Vec<f64>,
    /// Grid cells per dimension, derived from an even split of the z-value
    /// bit budget.
    grid_max: Vec<i64>,
    space: Space,
    /// Scratch coordinates, overwritten by every `bind`.
    coords: Vec<f64>,
}

impl SpatialColumnHandler {
    /// Build the handler for a spatial index shape. Non-spatial shapes are a
    /// caller bug.
    pub fn new(index: &IndexDef) -> Result<Self> {
        let spatial = index.spatial().ok_or_else(|| {
            HkvError::shape(format!("index {} is not spatial", index.name()))
        })?;
        let dimensions = spatial.dimensions();

        // Split the z-bit budget evenly, earlier dimensions taking the
        // remainder, and grid each dimension at that resolution.
        let base_bits = MAX_Z_BITS as usize / dimensions;
        let extra = MAX_Z_BITS as usize % dimensions;
        let mut grid_max = Vec::with_capacity(dimensions);
        for d in 0..dimensions {
            let bits = base_bits + usize::from(d < extra);
            grid_max.push((1i64 << bits) - 1);
        }
        let space = Space::new(vec![0; dimensions], grid_max.clone())?;

        Ok(Self {
            first_spatial_field: spatial.first_spatial_field,
            last_spatial_field: spatial.last_spatial_field(),
            lo: spatial.lo.clone(),
            hi: spatial.hi.clone(),
            grid_max,
            space,
            coords: vec![0.0; dimensions],
        })
    }

    pub fn dimensions(&self) -> usize {
        self.coords.len()
    }

    pub fn first_spatial_field(&self) -> usize {
        self.first_spatial_field
    }

    pub fn last_spatial_field(&self) -> usize {
        self.last_spatial_field
    }

    /// Read the coordinate columns out of a row's declared-order values into
    /// the scratch array. Sources must be decimal, 64-bit or 32-bit integer
    /// columns; anything else (including NULL) fails loudly rather than
    /// guessing a conversion.
    pub fn bind(&mut self, row: &[ScalarValue]) -> Result<()> {
        for d in 0..self.dimensions() {
            let field = self.first_spatial_field + d;
            let value = row.get(field).ok_or_else(|| {
                HkvError::shape(format!(
                    "row has {} values, spatial field {field} missing",
                    row.len()
                ))
            })?;
            self.coords[d] = value.spatial_coordinate().ok_or_else(|| {
                HkvError::unsupported(format!(
                    "spatial dimension {d}: {value} is not a numeric coordinate"
                ))
            })?;
        }
        Ok(())
    }

    /// Project a row's coordinates to a z-value: bind, snap each coordinate
    /// onto the dimension's grid, interleave. Pure function of the bound
    /// coordinates and the declared bounds.
    pub fn z_value(&mut self, row: &[ScalarValue]) -> Result<u64> {
        self.bind(row)?;
        let mut point = vec![0i64; self.dimensions()];
        for d in 0..self.dimensions() {
            let span = self.hi[d] - self.lo[d];
            let unit = ((self.coords[d] - self.lo[d]) / span).clamp(0.0, 1.0);
            point[d] = (unit * self.grid_max[d] as f64).round() as i64;
        }
        self.space.shuffle(&point)
    }

    /// Write-path hook for the per-column append loop. At the first spatial
    /// field this appends `z` as the single segment standing in for the
    /// whole coordinate range; for every field inside the range it returns
    /// true so the caller skips its normal append.
    pub fn handle_spatial_column(&self, key: &mut Key, index_field: usize, z: u64) -> bool {
        if index_field < self.first_spatial_field || index_field > self.last_spatial_field {
            return false;
        }
        if index_field == self.first_spatial_field {
            key.append_z_value(z);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hkv_schema::{ColumnDef, Group, IndexColumn, IndexDef, IndexKind, SpatialIndexDef, TableDef};
    use hkv_types::{Decimal, IndexId, ScalarType, TableId};

    /// One-table group with an (id, x, y) layout and a 2-d spatial index on
    /// (x, y) declared after a leading id column, so the spatial range starts
    /// at field 1.
    fn spatial_index() -> IndexDef {
        let places = TableDef {
            id: TableId(1),
            name: "places".into(),
            depth: 0,
            ordinal: 1,
            parent: None,
            columns: vec![
                ColumnDef::new("pid", ScalarType::Int),
                ColumnDef::new("x", ScalarType::Int),
                ColumnDef::new("y", ScalarType::Decimal),
            ],
            pk: vec![0],
        };
        let group = Group::new("places", vec![places]).unwrap();
        let id_col = IndexColumn::of(&group, TableId(1), 0).unwrap();
        let x = IndexColumn::of(&group, TableId(1), 1).unwrap();
        let y = IndexColumn::of(&group, TableId(1), 2).unwrap();
        IndexDef::new(
            IndexId(1),
            "places_xy",
            IndexKind::Table(TableId(1)),
            vec![id_col, x, y],
            Some(SpatialIndexDef {
                first_spatial_field: 1,
                lo: vec![0.0, 0.0],
                hi: vec![1000.0, 1000.0],
            }),
            &group,
        )
        .unwrap()
    }

    fn row(id: i64, x: i64, y: Decimal) -> Vec<ScalarValue> {
        vec![
            ScalarValue::Int(id),
            ScalarValue::Int(x),
            ScalarValue::Decimal(y),
        ]
    }

    #[test]
    fn z_value_is_pure() {
        let idx = spatial_index();
        let mut handler = SpatialColumnHandler::new(&idx).unwrap();
        let r = row(1, 3, Decimal::from_int(4));
        let a = handler.z_value(&r).unwrap();
        let b = handler.z_value(&r).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn z_value_is_not_symmetric() {
        let idx = spatial_index();
        let mut handler = SpatialColumnHandler::new(&idx).unwrap();
        let a = handler.z_value(&row(1, 3, Decimal::from_int(4))).unwrap();
        let b = handler.z_value(&row(1, 4, Decimal::from_int(3))).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn equal_coordinates_from_different_source_kinds_agree() {
        let idx = spatial_index();
        let mut handler = SpatialColumnHandler::new(&idx).unwrap();
        // x as Int 3 vs x as Int 3, y as Decimal 4 vs 4.0: same point.
        let a = handler.z_value(&row(1, 3, Decimal::from_int(4))).unwrap();
        let b = handler
            .z_value(&row(9, 3, Decimal::new(40, 1).unwrap()))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn handle_spatial_column_collapses_the_range() {
        let idx = spatial_index();
        let mut handler = SpatialColumnHandler::new(&idx).unwrap();
        let z = handler.z_value(&row(1, 3, Decimal::from_int(4))).unwrap();

        let mut key = Key::new();
        assert!(!handler.handle_spatial_column(&mut key, 0, z));
        assert!(handler.handle_spatial_column(&mut key, 1, z));
        assert!(handler.handle_spatial_column(&mut key, 2, z));
        assert!(!handler.handle_spatial_column(&mut key, 3, z));
        // Exactly one segment was appended for the whole range.
        assert_eq!(key.segment_count(), 1);
        assert_eq!(
            key.decode_segment(0, ScalarType::Int).unwrap(),
            ScalarValue::Int(z as i64)
        );
    }

    #[test]
    fn non_numeric_sources_fail_loudly() {
        let idx = spatial_index();
        let mut handler = SpatialColumnHandler::new(&idx).unwrap();
        let bad = vec![
            ScalarValue::Int(1),
            ScalarValue::Text("3".into()),
            ScalarValue::Decimal(Decimal::from_int(4)),
        ];
        assert!(matches!(
            handler.z_value(&bad),
            Err(HkvError::Unsupported { .. })
        ));

        let null = vec![
            ScalarValue::Int(1),
            ScalarValue::Null,
            ScalarValue::Decimal(Decimal::from_int(4)),
        ];
        assert!(matches!(
            handler.z_value(&null),
            Err(HkvError::Unsupported { .. })
        ));
    }

    #[test]
    fn short_rows_are_shape_mismatch() {
        let idx = spatial_index();
        let mut handler = SpatialColumnHandler::new(&idx).unwrap();
        let short = vec![ScalarValue::Int(1), ScalarValue::Int(3)];
        assert!(matches!(
            handler.z_value(&short),
            Err(HkvError::ShapeMismatch { .. })
        ));
    }
}
