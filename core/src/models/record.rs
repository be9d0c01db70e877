//! Logical table records
//!
//! Records carry an open `record_data` map keyed by column name. The engine
//! keeps the raw values as fetched next to their display form, where
//! foreign key ids have been replaced by readable text.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RecordId;

/// Open map of column name to value
pub type RecordData = HashMap<String, Value>;

/// Read access to a row's fields by column name
///
/// Filter and sort evaluation are written against this trait so they run
/// over raw records, resolved records and plain maps alike.
pub trait FieldAccess {
    /// Value of the named field, `None` when the field is missing
    fn field(&self, name: &str) -> Option<&Value>;
}

impl FieldAccess for RecordData {
    fn field(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// A record of a logical table as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier
    pub id: RecordId,

    /// Column values keyed by column name
    #[serde(default)]
    pub record_data: RecordData,

    /// Manual ordering position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl Record {
    /// Create a record from its id and values
    pub fn new(id: RecordId, record_data: RecordData) -> Self {
        Record {
            id,
            record_data,
            position: None,
        }
    }

    /// Set the manual ordering position
    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}

impl FieldAccess for Record {
    fn field(&self, name: &str) -> Option<&Value> {
        self.record_data.get(name)
    }
}

/// One page of records plus the total count on the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    /// Records on this page
    #[serde(default)]
    pub records: Vec<Record>,

    /// Total number of records in the table
    #[serde(default)]
    pub total: u64,
}

/// Page request, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number starting at 1
    pub page: u32,

    /// Records per page
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

impl PageRequest {
    /// Create a page request, clamping page and size to at least 1
    pub fn new(page: u32, page_size: u32) -> Self {
        PageRequest {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// First page with the given size
    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }
}

/// A record with foreign key ids replaced by display text
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    /// Record identifier
    pub id: RecordId,

    /// Manual ordering position
    pub position: Option<i64>,

    /// Display values, foreign keys resolved
    pub record_data: RecordData,

    /// Values as fetched from the backend
    pub raw_data: RecordData,
}

impl ResolvedRecord {
    /// Wrap a record without any resolution applied
    pub fn unresolved(record: Record) -> Self {
        ResolvedRecord {
            id: record.id,
            position: record.position,
            raw_data: record.record_data.clone(),
            record_data: record.record_data,
        }
    }

    /// Raw (unresolved) value of a field
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.raw_data.get(name)
    }
}

impl FieldAccess for ResolvedRecord {
    fn field(&self, name: &str) -> Option<&Value> {
        self.record_data.get(name)
    }
}
