//! Field-aware ordered comparison of index rows.
//!
//! Compares the raw encoded bytes of two rows of the same shape without
//! decoding any segment. The encoding guarantees that unsigned lexicographic
//! byte order equals logical field order, and that every segment ends in a
//! single zero byte, so field boundaries can be counted while scanning.

use std::cmp::Ordering;

use crate::row::IndexRowBuffer;

/// Compare `a` against `b` over their first `field_count` fields.
///
/// `ascending`, when given, flips the result per field: a byte difference
/// found while inside field `f` is reversed when `ascending[f]` is false.
/// Fields past the end of the slice sort ascending. A `field_count` of zero
/// compares equal without looking at either row.
///
/// When one key part is a strict prefix of the other, the shorter row sorts
/// first. Keys that are bytewise identical fall through to the value parts:
/// a row with no value part sorts before any row carrying one.
pub fn compare_rows(
    a: &IndexRowBuffer,
    b: &IndexRowBuffer,
    field_count: usize,
    ascending: Option<&[bool]>,
) -> Ordering {
    if field_count == 0 {
        return Ordering::Equal;
    }
    let mut field = 0;
    match compare_part(
        a.key_bytes(),
        b.key_bytes(),
        field_count,
        ascending,
        &mut field,
    ) {
        Scan::Decided(ordering) => ordering,
        Scan::Exhausted => match (a.value_bytes(), b.value_bytes()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => directed(Ordering::Less, field, ascending),
            (Some(_), None) => directed(Ordering::Greater, field, ascending),
            (Some(va), Some(vb)) => match compare_part(va, vb, field_count, ascending, &mut field)
            {
                Scan::Decided(ordering) => ordering,
                Scan::Exhausted => Ordering::Equal,
            },
        },
    }
}

enum Scan {
    Decided(Ordering),
    /// Both parts byte-equal to their ends without exhausting the budget
    /// against trailing bytes; the value part may still decide.
    Exhausted,
}

/// Scan two encoded parts in lock step, counting completed fields at each
/// zero terminator. Reaching the field budget with bytes still remaining in
/// either part decides equality for the requested prefix; reaching it at the
/// exact end of both parts leaves the value-part fallback open.
fn compare_part(
    a: &[u8],
    b: &[u8],
    field_count: usize,
    ascending: Option<&[bool]>,
    field: &mut usize,
) -> Scan {
    let shared = a.len().min(b.len());
    for i in 0..shared {
        let (ba, bb) = (a[i], b[i]);
        if ba != bb {
            return Scan::Decided(directed(ba.cmp(&bb), *field, ascending));
        }
        if ba == 0 {
            *field += 1;
            if *field == field_count {
                return if i + 1 == a.len() && i + 1 == b.len() {
                    Scan::Exhausted
                } else {
                    Scan::Decided(Ordering::Equal)
                };
            }
        }
    }
    match a.len().cmp(&b.len()) {
        Ordering::Equal => Scan::Exhausted,
        diff => Scan::Decided(directed(diff, *field, ascending)),
    }
}

fn directed(ordering: Ordering, field: usize, ascending: Option<&[bool]>) -> Ordering {
    let asc = ascending
        .and_then(|flags| flags.get(field))
        .copied()
        .unwrap_or(true);
    if asc {
        ordering
    } else {
        ordering.reverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{coi_group, group_index, table_index};
    use hkv_types::ScalarValue as V;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn item_row(sku: &str, cid: i64, oid: i64, iid: i64) -> IndexRowBuffer {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut row = IndexRowBuffer::new(index);
        row.reset_for_write();
        row.append(&V::Text(sku.to_owned())).unwrap();
        row.append(&V::Int(cid)).unwrap();
        row.append(&V::Int(oid)).unwrap();
        row.append(&V::Int(iid)).unwrap();
        row
    }

    #[test]
    fn zero_field_count_is_equal() {
        let a = item_row("a", 1, 1, 1);
        let b = item_row("z", 9, 9, 9);
        assert_eq!(compare_rows(&a, &b, 0, None), Ordering::Equal);
    }

    #[test]
    fn first_differing_field_decides() {
        let a = item_row("apple", 1, 1, 1);
        let b = item_row("banana", 0, 0, 0);
        assert_eq!(compare_rows(&a, &b, 4, None), Ordering::Less);
        assert_eq!(compare_rows(&b, &a, 4, None), Ordering::Greater);
    }

    #[test]
    fn equal_prefix_stops_at_field_count() {
        let a = item_row("same", 5, 10, 1);
        let b = item_row("same", 5, 10, 2);
        assert_eq!(compare_rows(&a, &b, 3, None), Ordering::Equal);
        assert_eq!(compare_rows(&a, &b, 4, None), Ordering::Less);
    }

    #[test]
    fn descending_flag_flips_the_deciding_field() {
        let a = item_row("same", 5, 10, 1);
        let b = item_row("same", 5, 99, 1);
        let flags = [true, true, false, true];
        assert_eq!(compare_rows(&a, &b, 4, Some(&flags)), Ordering::Greater);
        assert_eq!(compare_rows(&a, &b, 4, None), Ordering::Less);
    }

    #[test]
    fn shorter_key_sorts_first() {
        let group = coi_group();
        let index = Arc::new(table_index(&group));
        let mut short = IndexRowBuffer::new(Arc::clone(&index));
        short.reset_for_write();
        short.append(&V::Text("same".to_owned())).unwrap();
        short.append(&V::Int(5)).unwrap();
        let long = item_row("same", 5, 10, 1);
        assert_eq!(compare_rows(&short, &long, 4, None), Ordering::Less);
        assert_eq!(compare_rows(&long, &short, 4, None), Ordering::Greater);
    }

    #[test]
    fn absent_value_part_sorts_before_present() {
        let group = coi_group();
        let index = Arc::new(group_index(&group));
        let mut bare = IndexRowBuffer::new(Arc::clone(&index));
        bare.reset_for_write();
        bare.append(&V::Int(7)).unwrap();
        bare.append(&V::Int(1)).unwrap();
        bare.append(&V::Int(2)).unwrap();
        let mut marked = IndexRowBuffer::new(index);
        marked.reset_for_write();
        marked.append(&V::Int(7)).unwrap();
        marked.append(&V::Int(1)).unwrap();
        marked.append(&V::Int(2)).unwrap();
        marked.set_table_bitmap(0).unwrap();
        // Identical keys; the bitmap-carrying row sorts after, even when its
        // bitmap is all zeroes.
        assert_eq!(compare_rows(&bare, &marked, 3, None), Ordering::Less);
        assert_eq!(compare_rows(&marked, &bare, 3, None), Ordering::Greater);
        assert_eq!(compare_rows(&marked, &marked, 3, None), Ordering::Equal);
    }

    proptest! {
        #[test]
        fn comparison_is_antisymmetric(
            a in (any::<i64>(), any::<i64>(), any::<i64>()),
            b in (any::<i64>(), any::<i64>(), any::<i64>()),
        ) {
            let ra = item_row("k", a.0, a.1, a.2);
            let rb = item_row("k", b.0, b.1, b.2);
            let fwd = compare_rows(&ra, &rb, 4, None);
            let rev = compare_rows(&rb, &ra, 4, None);
            prop_assert_eq!(fwd, rev.reverse());
        }

        #[test]
        fn comparison_agrees_with_field_order(
            cid_a in any::<i64>(),
            cid_b in any::<i64>(),
        ) {
            let ra = item_row("k", cid_a, 0, 0);
            let rb = item_row("k", cid_b, 0, 0);
            prop_assert_eq!(compare_rows(&ra, &rb, 2, None), cid_a.cmp(&cid_b));
        }

        #[test]
        fn shorter_prefixes_inherit_equality(
            a in (any::<i64>(), any::<i64>(), any::<i64>()),
            b in (any::<i64>(), any::<i64>(), any::<i64>()),
            f1 in 0usize..4,
            f2 in 0usize..=4,
        ) {
            prop_assume!(f1 < f2);
            let ra = item_row("k", a.0, a.1, a.2);
            let rb = item_row("k", b.0, b.1, b.2);
            if compare_rows(&ra, &rb, f2, None) == Ordering::Equal {
                prop_assert_eq!(compare_rows(&ra, &rb, f1, None), Ordering::Equal);
            }
        }

        #[test]
        fn all_descending_reverses_everything(
            a in (any::<i64>(), any::<i64>()),
            b in (any::<i64>(), any::<i64>()),
        ) {
            let ra = item_row("k", a.0, a.1, 0);
            let rb = item_row("k", b.0, b.1, 0);
            let flags = [false; 4];
            let fwd = compare_rows(&ra, &rb, 3, None);
            let rev = compare_rows(&ra, &rb, 3, Some(&flags));
            prop_assert_eq!(fwd, rev.reverse());
        }
    }
}
