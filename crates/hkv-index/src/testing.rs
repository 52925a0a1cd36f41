//! Shared fixtures for this crate's tests.

use hkv_schema::{ColumnDef, Group, IndexColumn, IndexDef, IndexKind, TableDef};
use hkv_types::{IndexId, ScalarType, TableId};

/// Customer(depth 0, ordinal 1) -> Order(depth 1, ordinal 2) ->
/// Item(depth 2, ordinal 3), single-int primary keys.
pub(crate) fn coi_group() -> Group {
    let customer = TableDef {
        id: TableId(1),
        name: "customer".into(),
        depth: 0,
        ordinal: 1,
        parent: None,
        columns: vec![
            ColumnDef::new("cid", ScalarType::Int),
            ColumnDef::new("cname", ScalarType::Text),
        ],
        pk: vec![0],
    };
    let order = TableDef {
        id: TableId(2),
        name: "order".into(),
        depth: 1,
        ordinal: 2,
        parent: Some(TableId(1)),
        columns: vec![
            ColumnDef::new("oid", ScalarType::Int),
            ColumnDef::new("cid", ScalarType::Int),
            ColumnDef::new("odate", ScalarType::Int),
        ],
        pk: vec![0],
    };
    let item = TableDef {
        id: TableId(3),
        name: "item".into(),
        depth: 2,
        ordinal: 3,
        parent: Some(TableId(2)),
        columns: vec![
            ColumnDef::new("iid", ScalarType::Int),
            ColumnDef::new("oid", ScalarType::Int),
            ColumnDef::new("sku", ScalarType::Text),
        ],
        pk: vec![0],
    };
    Group::new("coi", vec![customer, order, item]).unwrap()
}

/// Table index on item(sku). Physical fields: sku, cid, oid, iid.
pub(crate) fn table_index(group: &Group) -> IndexDef {
    let sku = IndexColumn::of(group, TableId(3), 2).unwrap();
    IndexDef::new(
        IndexId(10),
        "item_sku",
        IndexKind::Table(TableId(3)),
        vec![sku],
        None,
        group,
    )
    .unwrap()
}

/// Group index on order(odate) spanning customer..order.
pub(crate) fn group_index(group: &Group) -> IndexDef {
    let odate = IndexColumn::of(group, TableId(2), 2).unwrap();
    IndexDef::new(
        IndexId(20),
        "co_odate",
        IndexKind::Group {
            root_most: TableId(1),
            leaf_most: TableId(2),
        },
        vec![odate],
        None,
        group,
    )
    .unwrap()
}
