//! External CRUD API consumed by the engine
//!
//! The engine never stores tables, records or view configuration itself; it
//! reads and writes them through this trait. `erp-views-client` provides the
//! HTTP implementation; tests use mocks and an in-memory fake.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApiResult;
use crate::models::{
    AssignedUser, Column, ColumnDraft, ColumnId, NotificationDraft, PageRequest, Record,
    RecordData, RecordId, RecordPage, ScheduledNotification, SortDraft, SortId, SortRecord,
    TableId, UserId, View, ViewColumnDraft, ViewColumnId, ViewColumnRecord, ViewDraft, ViewId,
};

/// Operations of the logical-table backend
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Column definitions of a table
    async fn fetch_structure(&self, table_id: TableId) -> ApiResult<Vec<Column>>;

    /// Add a column to a table
    async fn create_column(&self, table_id: TableId, draft: &ColumnDraft) -> ApiResult<Column>;

    /// Update a column definition
    async fn update_column(&self, table_id: TableId, column_id: ColumnId, draft: &ColumnDraft) -> ApiResult<Column>;

    /// Delete a column
    async fn delete_column(&self, table_id: TableId, column_id: ColumnId) -> ApiResult<()>;

    /// One page of a table's records
    async fn fetch_records(&self, table_id: TableId, page: PageRequest) -> ApiResult<RecordPage>;

    /// Every record of a table, used to resolve foreign keys into it
    async fn fetch_all_records(&self, table_id: TableId) -> ApiResult<Vec<Record>>;

    /// Create a record
    async fn create_record(&self, table_id: TableId, data: &RecordData) -> ApiResult<Record>;

    /// Replace a record's data
    async fn update_record(&self, table_id: TableId, record_id: RecordId, data: &RecordData) -> ApiResult<Record>;

    /// Delete a record
    async fn delete_record(&self, table_id: TableId, record_id: RecordId) -> ApiResult<()>;

    /// Set the manual ordering position of a record
    async fn update_record_position(&self, record_id: RecordId, position: i64) -> ApiResult<()>;

    /// Views of a table
    async fn list_views(&self, table_id: TableId) -> ApiResult<Vec<View>>;

    /// Create a view
    async fn create_view(&self, draft: &ViewDraft) -> ApiResult<View>;

    /// Update a view
    async fn update_view(&self, view: &View) -> ApiResult<View>;

    /// Delete a view
    async fn delete_view(&self, view_id: ViewId) -> ApiResult<()>;

    /// Layout and filter entries of a view
    async fn list_view_columns(&self, view_id: ViewId) -> ApiResult<Vec<ViewColumnRecord>>;

    /// Create a layout or filter entry
    async fn create_view_column(&self, draft: &ViewColumnDraft) -> ApiResult<ViewColumnRecord>;

    /// Update a layout or filter entry
    async fn update_view_column(&self, record: &ViewColumnRecord) -> ApiResult<ViewColumnRecord>;

    /// Delete a layout or filter entry
    async fn delete_view_column(&self, view_id: ViewId, entry_id: ViewColumnId) -> ApiResult<()>;

    /// Sort entries of a view
    async fn list_sorts(&self, view_id: ViewId) -> ApiResult<Vec<SortRecord>>;

    /// Create a sort entry
    async fn create_sort(&self, draft: &SortDraft) -> ApiResult<SortRecord>;

    /// Update a sort entry
    async fn update_sort(&self, sort: &SortRecord) -> ApiResult<SortRecord>;

    /// Delete a sort entry
    async fn delete_sort(&self, view_id: ViewId, sort_id: SortId) -> ApiResult<()>;

    /// Users assigned to a record
    async fn fetch_assigned_users(&self, record_id: RecordId) -> ApiResult<Vec<AssignedUser>>;

    /// Replace the users assigned to a record
    async fn set_assigned_users(&self, record_id: RecordId, user_ids: &[UserId]) -> ApiResult<()>;

    /// Schedule a reminder on a record's date
    async fn create_scheduled_notification(&self, draft: &NotificationDraft) -> ApiResult<ScheduledNotification>;
}
