//! Filter evaluation
//!
//! A row passes a filter set iff it passes every filter (logical AND, there
//! is no OR). Evaluation is a pure scan: the input is never mutated and the
//! relative order of passing rows is kept.
//!
//! `equals` coerces by column type:
//!
//! * integer and decimal columns compare numerically; a side that is not a
//!   number never matches
//! * boolean columns compare normalized booleans (`true/false/1/0/yes/no/si`)
//! * date and datetime columns compare parsed dates (resp. date-times) and
//!   fall back to exact text when either side does not parse
//! * every other column, and filters on unknown columns, compare the string
//!   form case-sensitively
//!
//! A null, missing or empty field equals only an empty filter value.

use serde_json::Value;

use crate::models::value::{self, is_missing, numeric_form, parse_number, string_form};
use crate::models::{parse_date, parse_datetime, Column, DataType, FieldAccess, Filter, FilterCondition};

/// Whether `row` passes a single filter
///
/// `column` is the schema entry for `filter.column`, used to pick the
/// `equals` coercion; `None` for columns unknown to the schema.
pub fn matches<R: FieldAccess + ?Sized>(row: &R, filter: &Filter, column: Option<&Column>) -> bool {
    let v = row.field(&filter.column);
    let f = filter.value.as_deref().unwrap_or("");

    match filter.condition {
        FilterCondition::Equals => equals(v, f, column.map(|c| c.data_type)),
        FilterCondition::NotEquals => !equals(v, f, column.map(|c| c.data_type)),
        FilterCondition::Contains => contains(v, f),
        FilterCondition::NotContains => !contains(v, f),
        FilterCondition::Greater => v.map_or(f64::NAN, numeric_form) > parse_number(f),
        FilterCondition::Lower => v.map_or(f64::NAN, numeric_form) < parse_number(f),
        FilterCondition::IsNull => is_missing(v),
        FilterCondition::IsNotNull => !is_missing(v),
    }
}

/// Whether `row` passes every filter
pub fn matches_all<R: FieldAccess + ?Sized>(row: &R, filters: &[Filter], columns: &[Column]) -> bool {
    filters
        .iter()
        .all(|filter| matches(row, filter, find_column(columns, &filter.column)))
}

/// Rows passing every filter, in input order
///
/// With no filters the output equals the input.
pub fn apply_filters<R: FieldAccess + Clone>(rows: &[R], filters: &[Filter], columns: &[Column]) -> Vec<R> {
    if filters.is_empty() {
        return rows.to_vec();
    }

    rows.iter()
        .filter(|row| matches_all(*row, filters, columns))
        .cloned()
        .collect()
}

fn find_column<'a>(columns: &'a [Column], name: &str) -> Option<&'a Column> {
    columns.iter().find(|c| c.name == name)
}

fn equals(v: Option<&Value>, f: &str, data_type: Option<DataType>) -> bool {
    let v = match v {
        Some(v) if !value::is_null_like(v) => v,
        _ => return f.is_empty(),
    };

    match data_type {
        Some(DataType::Integer) | Some(DataType::Decimal) => {
            let (a, b) = (numeric_form(v), parse_number(f));
            !a.is_nan() && !b.is_nan() && a == b
        }
        Some(DataType::Boolean) => match (value::bool_form(v), value::parse_bool(f)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        Some(DataType::Date) => {
            let text = string_form(v);
            match (parse_date(&text), parse_date(f)) {
                (Some(a), Some(b)) => a == b,
                _ => text == f,
            }
        }
        Some(DataType::Datetime) => {
            let text = string_form(v);
            match (parse_datetime(&text), parse_datetime(f)) {
                (Some(a), Some(b)) => a == b,
                _ => text == f,
            }
        }
        _ => string_form(v) == f,
    }
}

fn contains(v: Option<&Value>, f: &str) -> bool {
    let text = v.map(string_form).unwrap_or_default();
    text.to_lowercase().contains(&f.to_lowercase())
}
