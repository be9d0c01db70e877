//! Data models for logical tables and their views
//!
//! This module provides the data structures exchanged with the backend:
//! columns, records, views, view columns, sorts, assigned users and
//! scheduled reminders, plus the value coercions shared by the evaluators.

mod assignment;
mod column;
mod filter;
mod record;
mod view;
pub mod value;

pub use assignment::{AssignedUser, NotificationDraft, ScheduledNotification};
pub use column::{parse_date, parse_datetime, Column, ColumnDraft, DataType};
pub use filter::{Filter, FilterCondition};
pub use record::{FieldAccess, PageRequest, Record, RecordData, RecordPage, ResolvedRecord};
pub use view::{
    ColumnFilter, ColumnLayout, SortDirection, SortDraft, SortKey, SortRecord, View,
    ViewColumnDraft, ViewColumnEntry, ViewColumnRecord, ViewDraft,
};

/// Logical table identifier
pub type TableId = i64;

/// Column identifier
pub type ColumnId = i64;

/// Record identifier
pub type RecordId = i64;

/// View identifier
pub type ViewId = i64;

/// `view_columns` entry identifier
pub type ViewColumnId = i64;

/// Sort entry identifier
pub type SortId = i64;

/// System user identifier
pub type UserId = i64;

/// Name given to the view created automatically for a table without views
pub const DEFAULT_VIEW_NAME: &str = "Vista General";
