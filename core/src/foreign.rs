//! Foreign key resolution
//!
//! Replaces raw foreign record ids with display text taken from the
//! referenced table. Resolution is per load: every call fetches the
//! referenced tables again and nothing is cached across calls.
//!
//! Resolution never fails a page load. When a referenced table cannot be
//! fetched, or an id points to a record that no longer exists, the raw id
//! stays in place.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;

use crate::api::TableApi;
use crate::error::EngineError;
use crate::models::value::{id_form, is_missing};
use crate::models::{Column, Record, RecordId, ResolvedRecord, TableId};

/// Field shown when a foreign key column names no display field
const FALLBACK_DISPLAY_FIELD: &str = "name";

/// Output of one resolution pass
#[derive(Debug, Default)]
pub struct Resolution {
    /// Records with display values
    pub records: Vec<ResolvedRecord>,

    /// Non-fatal errors, one per column whose table could not be fetched
    pub errors: Vec<EngineError>,
}

/// Resolves foreign key columns through the external API
pub struct ForeignKeyResolver<'a> {
    api: &'a dyn TableApi,
}

impl<'a> ForeignKeyResolver<'a> {
    /// Create a resolver over `api`
    pub fn new(api: &'a dyn TableApi) -> Self {
        ForeignKeyResolver { api }
    }

    /// Resolve every foreign key column of `columns` in `records`
    pub async fn resolve(&self, columns: &[Column], records: Vec<Record>) -> Resolution {
        let foreign: Vec<&Column> = columns
            .iter()
            .filter(|c| c.referenced_table().is_some())
            .collect();

        if foreign.is_empty() || records.is_empty() {
            return Resolution {
                records: records.into_iter().map(ResolvedRecord::unresolved).collect(),
                errors: Vec::new(),
            };
        }

        let mut errors = Vec::new();
        let mut tables: HashMap<TableId, HashMap<RecordId, Record>> = HashMap::new();

        for column in &foreign {
            let Some(table_id) = column.referenced_table() else {
                continue;
            };
            if tables.contains_key(&table_id) {
                continue;
            }

            match self.api.fetch_all_records(table_id).await {
                Ok(rows) => {
                    debug!("Fetched {} records of foreign table {}", rows.len(), table_id);
                    tables.insert(table_id, rows.into_iter().map(|r| (r.id, r)).collect());
                }
                Err(e) => {
                    warn!(
                        "Foreign table {} for column '{}' could not be fetched, keeping raw ids: {}",
                        table_id, column.name, e
                    );
                    errors.push(EngineError::ForeignResolution {
                        column: column.name.clone(),
                        source: e,
                    });
                }
            }
        }

        let records = records
            .into_iter()
            .map(|record| {
                let mut resolved = ResolvedRecord::unresolved(record);
                for column in &foreign {
                    let lookup = column.referenced_table().and_then(|t| tables.get(&t));
                    if let (Some(lookup), Some(raw)) = (lookup, resolved.raw_data.get(&column.name)) {
                        let display = display_for(raw, column, lookup, resolved.id);
                        resolved.record_data.insert(column.name.clone(), display);
                    }
                }
                resolved
            })
            .collect();

        Resolution { records, errors }
    }
}

/// Display value for a raw foreign key value, which may be one id or a list
fn display_for(raw: &Value, column: &Column, lookup: &HashMap<RecordId, Record>, record_id: RecordId) -> Value {
    match raw {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| display_for(item, column, lookup, record_id))
                .collect(),
        ),
        _ if is_missing(Some(raw)) => raw.clone(),
        _ => {
            let referenced = id_form(raw).and_then(|id| lookup.get(&id));
            match referenced {
                Some(referenced) => display_text(referenced, column),
                None => {
                    warn!(
                        "Record {} column '{}' references missing record {}, showing raw id",
                        record_id, column.name, raw
                    );
                    raw.clone()
                }
            }
        }
    }
}

/// Configured display field, then `name`, then the referenced id
fn display_text(referenced: &Record, column: &Column) -> Value {
    let configured = column.foreign_column_name.as_deref();

    configured
        .into_iter()
        .chain(std::iter::once(FALLBACK_DISPLAY_FIELD))
        .filter_map(|field| referenced.record_data.get(field))
        .find(|v| !is_missing(Some(v)))
        .cloned()
        .unwrap_or_else(|| Value::String(referenced.id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockTableApi;
    use crate::error::ApiError;
    use crate::models::{DataType, RecordData};
    use mockall::predicate::eq;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> RecordData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new(1, "title", DataType::Text),
            Column::new(2, "client", DataType::ForeignKeySelect).foreign_key(20, Some("company")),
        ]
    }

    fn clients() -> Vec<Record> {
        vec![
            Record::new(5, data(&[("company", json!("Acme")), ("name", json!("Ana"))])),
            Record::new(6, data(&[("name", json!("Beto"))])),
            Record::new(7, data(&[])),
        ]
    }

    #[tokio::test]
    async fn test_resolves_display_field_with_fallbacks() {
        let mut api = MockTableApi::new();
        api.expect_fetch_all_records()
            .with(eq(20))
            .times(1)
            .returning(|_| Ok(clients()));

        let records = vec![
            Record::new(1, data(&[("client", json!(5))])),
            Record::new(2, data(&[("client", json!("6"))])),
            Record::new(3, data(&[("client", json!(7))])),
        ];

        let resolution = ForeignKeyResolver::new(&api).resolve(&columns(), records).await;

        assert!(resolution.errors.is_empty());
        let shown: Vec<&Value> = resolution.records.iter().map(|r| &r.record_data["client"]).collect();
        assert_eq!(shown, vec![&json!("Acme"), &json!("Beto"), &json!("7")]);
        assert_eq!(resolution.records[1].raw("client"), Some(&json!("6")));
    }

    #[tokio::test]
    async fn test_dangling_reference_keeps_raw_id() {
        let mut api = MockTableApi::new();
        api.expect_fetch_all_records().returning(|_| Ok(clients()));

        let records = vec![Record::new(1, data(&[("client", json!(99))]))];
        let resolution = ForeignKeyResolver::new(&api).resolve(&columns(), records).await;

        assert_eq!(resolution.records[0].record_data["client"], json!(99));
        assert!(resolution.errors.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_raw_ids() {
        let mut api = MockTableApi::new();
        api.expect_fetch_all_records()
            .returning(|_| Err(ApiError::Network("connection refused".into())));

        let records = vec![Record::new(1, data(&[("client", json!(5)), ("title", json!("x"))]))];
        let resolution = ForeignKeyResolver::new(&api).resolve(&columns(), records).await;

        assert_eq!(resolution.records[0].record_data["client"], json!(5));
        assert_eq!(resolution.errors.len(), 1);
        assert!(matches!(
            &resolution.errors[0],
            EngineError::ForeignResolution { column, .. } if column == "client"
        ));
    }

    #[tokio::test]
    async fn test_list_values_and_nulls() {
        let mut api = MockTableApi::new();
        api.expect_fetch_all_records().returning(|_| Ok(clients()));

        let records = vec![
            Record::new(1, data(&[("client", json!([5, 99]))])),
            Record::new(2, data(&[("client", Value::Null)])),
        ];
        let resolution = ForeignKeyResolver::new(&api).resolve(&columns(), records).await;

        assert_eq!(resolution.records[0].record_data["client"], json!(["Acme", 99]));
        assert_eq!(resolution.records[1].record_data["client"], Value::Null);
    }

    #[tokio::test]
    async fn test_no_foreign_columns_skips_fetch() {
        let api = MockTableApi::new();
        let columns = vec![Column::new(1, "title", DataType::Text)];
        let records = vec![Record::new(1, data(&[("title", json!("x"))]))];

        let resolution = ForeignKeyResolver::new(&api).resolve(&columns, records).await;
        assert_eq!(resolution.records.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_resolution_refetches() {
        let mut api = MockTableApi::new();
        api.expect_fetch_all_records().times(2).returning(|_| Ok(clients()));

        let resolver = ForeignKeyResolver::new(&api);
        for _ in 0..2 {
            let records = vec![Record::new(1, data(&[("client", json!(5))]))];
            let resolution = resolver.resolve(&columns(), records).await;
            assert_eq!(resolution.records[0].record_data["client"], json!("Acme"));
        }
    }
}
