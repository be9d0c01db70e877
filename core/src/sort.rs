//! Chained multi-key sorting
//!
//! Keys are compared in priority order; the first key on which two rows
//! differ decides. Rows equal on every key keep their input order (the sort
//! is stable). Nulls, missing fields and empty strings always sort after
//! every non-null value, in both directions.
//!
//! Values are ranked by kind first, then compared within their kind:
//!
//! * numbers and numeric strings come first and compare numerically
//! * booleans come next and compare `false < true`
//! * everything else comes last and compares its string form with
//!   [`locale_cmp`]

use std::cmp::Ordering;

use serde_json::Value;

use crate::models::value::{is_missing, numeric_form, string_form};
use crate::models::{FieldAccess, SortDirection, SortKey};

/// Rows sorted by the chain, stable; the input is left untouched
pub fn sort_records<R: FieldAccess + Clone>(rows: &[R], chain: &[SortKey]) -> Vec<R> {
    let mut sorted = rows.to_vec();
    if chain.is_empty() {
        return sorted;
    }

    // `sort_by` is a stable merge sort
    sorted.sort_by(|a, b| compare_rows(a, b, chain));
    sorted
}

/// Compare two rows over the whole chain
pub fn compare_rows<R: FieldAccess + ?Sized>(a: &R, b: &R, chain: &[SortKey]) -> Ordering {
    chain
        .iter()
        .map(|key| compare_values(a.field(&key.column), b.field(&key.column), key.direction))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Compare two field values for one key
///
/// The direction only applies between non-null values; nulls go last.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    match (is_missing(a), is_missing(b)) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = match (a, b) {
                (Some(a), Some(b)) => compare_present(a, b),
                _ => Ordering::Equal,
            };
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

/// Kind of a non-null value, in sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Number,
    Boolean,
    Text,
}

fn kind_of(v: &Value) -> Kind {
    if !numeric_form(v).is_nan() {
        Kind::Number
    } else if v.is_boolean() {
        Kind::Boolean
    } else {
        Kind::Text
    }
}

fn compare_present(a: &Value, b: &Value) -> Ordering {
    let (ka, kb) = (kind_of(a), kind_of(b));
    if ka != kb {
        return ka.cmp(&kb);
    }

    match ka {
        Kind::Number => numeric_form(a).total_cmp(&numeric_form(b)),
        Kind::Boolean => a.as_bool().cmp(&b.as_bool()),
        Kind::Text => locale_cmp(&string_form(a), &string_form(b)),
    }
}

/// Locale-aware string order
///
/// Letters compare case-insensitively first so that `"apple" < "Banana"`;
/// strings equal ignoring case fall back to their exact text so the order is
/// total. Leading and trailing whitespace is ignored.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim(), b.trim());
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, RecordData};
    use proptest::prelude::*;
    use serde_json::json;

    fn rec(id: i64, pairs: &[(&str, Value)]) -> Record {
        let data: RecordData = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Record::new(id, data)
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_stable_on_ties() {
        let rows = vec![
            rec(1, &[("x", json!(1))]),
            rec(2, &[("x", json!(1))]),
            rec(3, &[("x", json!(0))]),
        ];

        let out = sort_records(&rows, &[SortKey::asc("x")]);
        assert_eq!(ids(&out), vec![3, 1, 2]);
    }

    #[test]
    fn test_nulls_last_descending() {
        let rows = vec![
            rec(1, &[("x", json!(5))]),
            rec(2, &[("x", Value::Null)]),
            rec(3, &[("x", json!(1))]),
        ];

        let out = sort_records(&rows, &[SortKey::desc("x")]);
        assert_eq!(ids(&out), vec![1, 3, 2]);
    }

    #[test]
    fn test_nulls_last_ascending() {
        let rows = vec![
            rec(1, &[("x", Value::Null)]),
            rec(2, &[]),
            rec(3, &[("x", json!(""))]),
            rec(4, &[("x", json!(2))]),
        ];

        let out = sort_records(&rows, &[SortKey::asc("x")]);
        assert_eq!(ids(&out), vec![4, 1, 2, 3]);
    }

    #[test]
    fn test_chain_priority() {
        let rows = vec![
            rec(1, &[("city", json!("Quito")), ("age", json!(20))]),
            rec(2, &[("city", json!("Lima")), ("age", json!(20))]),
            rec(3, &[("city", json!("Lima")), ("age", json!(35))]),
        ];

        let out = sort_records(&rows, &[SortKey::asc("city"), SortKey::desc("age")]);
        assert_eq!(ids(&out), vec![3, 2, 1]);
    }

    #[test]
    fn test_numeric_strings_compare_numerically() {
        let rows = vec![
            rec(1, &[("n", json!("10"))]),
            rec(2, &[("n", json!(9))]),
            rec(3, &[("n", json!("100"))]),
        ];

        let out = sort_records(&rows, &[SortKey::asc("n")]);
        assert_eq!(ids(&out), vec![2, 1, 3]);
    }

    #[test]
    fn test_locale_order_ignores_case_first() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("Zeta", "alpha"), Ordering::Greater);
        assert_ne!(locale_cmp("a", "A"), Ordering::Equal);
        assert_eq!(locale_cmp(" b", "b"), Ordering::Equal);
    }

    #[test]
    fn test_mixed_kinds_rank_by_kind() {
        let order = compare_values(Some(&json!(12)), Some(&json!("abc")), SortDirection::Asc);
        assert_eq!(order, Ordering::Less);

        let order = compare_values(Some(&json!(true)), Some(&json!(false)), SortDirection::Asc);
        assert_eq!(order, Ordering::Greater);

        // "1a" is text, so it sorts after every number
        let order = compare_values(Some(&json!("1a")), Some(&json!(2)), SortDirection::Asc);
        assert_eq!(order, Ordering::Greater);
        let order = compare_values(Some(&json!(false)), Some(&json!("abc")), SortDirection::Asc);
        assert_eq!(order, Ordering::Less);
    }

    #[test]
    fn test_large_mixed_column_sorts_without_cycles() {
        let rows: Vec<Record> = (0..2000)
            .map(|i| {
                let value = match i % 4 {
                    0 => json!(i),
                    1 => json!(format!("{}a", i)),
                    2 => json!(format!("{}", i)),
                    _ => json!(i % 3 == 0),
                };
                rec(i, &[("x", value)])
            })
            .collect();

        for chain in [vec![SortKey::asc("x")], vec![SortKey::desc("x")]] {
            let out = sort_records(&rows, &chain);
            assert_eq!(out.len(), rows.len());
            for pair in out.windows(2) {
                assert_ne!(compare_rows(&pair[0], &pair[1], &chain), Ordering::Greater);
            }
        }

        let out = sort_records(&rows, &[SortKey::asc("x")]);
        let kinds: Vec<Kind> = out.iter().map(|r| kind_of(&r.record_data["x"])).collect();
        let mut ranked = kinds.clone();
        ranked.sort();
        assert_eq!(kinds, ranked);
        assert_eq!(out[0].record_data["x"], json!(0));
    }

    proptest! {
        #[test]
        fn prop_sort_is_stable_permutation(values in prop::collection::vec(prop::option::of(0i64..4), 0..30)) {
            let rows: Vec<Record> = values
                .iter()
                .enumerate()
                .map(|(i, v)| rec(i as i64, &[("x", v.map_or(Value::Null, |n| json!(n)))]))
                .collect();

            let out = sort_records(&rows, &[SortKey::desc("x")]);
            prop_assert_eq!(out.len(), rows.len());

            for pair in out.windows(2) {
                let order = compare_rows(&pair[0], &pair[1], &[SortKey::desc("x")]);
                prop_assert_ne!(order, Ordering::Greater);
                // equal keys keep input order
                if order == Ordering::Equal {
                    prop_assert!(pair[0].id < pair[1].id);
                }
            }
        }
    }
}
