//! In-memory `TableApi` backend for engine tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::TableApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AssignedUser, Column, ColumnDraft, ColumnId, NotificationDraft, PageRequest, Record, RecordData,
    RecordId, RecordPage, ScheduledNotification, SortDraft, SortId, SortRecord, TableId, UserId, View,
    ViewColumnDraft, ViewColumnId, ViewColumnRecord, ViewDraft, ViewId,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    columns: HashMap<TableId, Vec<Column>>,
    records: HashMap<TableId, Vec<Record>>,
    views: Vec<View>,
    view_columns: Vec<ViewColumnRecord>,
    sorts: Vec<SortRecord>,
    users: HashMap<UserId, AssignedUser>,
    assignments: HashMap<RecordId, Vec<UserId>>,
    notifications: Vec<ScheduledNotification>,
    failing: HashSet<&'static str>,
    failing_positions: HashSet<RecordId>,
    calls: HashMap<&'static str, usize>,
}

impl Inner {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }

    fn enter(&mut self, op: &'static str) -> ApiResult<()> {
        *self.calls.entry(op).or_default() += 1;
        if self.failing.contains(op) {
            return Err(ApiError::Server {
                status: 500,
                message: format!("{} failed", op),
            });
        }
        Ok(())
    }
}

/// Backend keeping every entity in memory, with failure injection
#[derive(Default)]
pub struct MemoryApi {
    inner: Mutex<Inner>,
    gates: Mutex<HashMap<ViewId, Arc<Notify>>>,
    listing_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn add_table(&self, table_id: TableId, columns: Vec<Column>, records: Vec<Record>) {
        self.with(|inner| {
            inner.columns.insert(table_id, columns);
            inner.records.insert(table_id, records);
        });
    }

    pub fn add_view(&self, view: View) {
        self.with(|inner| inner.views.push(view));
    }

    pub fn add_view_column(&self, record: ViewColumnRecord) {
        self.with(|inner| inner.view_columns.push(record));
    }

    pub fn add_sort(&self, sort: SortRecord) {
        self.with(|inner| inner.sorts.push(sort));
    }

    pub fn add_user(&self, user: AssignedUser) {
        self.with(|inner| {
            inner.users.insert(user.id, user);
        });
    }

    /// Make every call of `op` fail with a server error
    pub fn fail_on(&self, op: &'static str) {
        self.with(|inner| {
            inner.failing.insert(op);
        });
    }

    /// Let calls of `op` succeed again
    pub fn recover(&self, op: &'static str) {
        self.with(|inner| {
            inner.failing.remove(op);
        });
    }

    /// Make position updates of `record_id` fail
    pub fn fail_position_of(&self, record_id: RecordId) {
        self.with(|inner| {
            inner.failing_positions.insert(record_id);
        });
    }

    /// Hold `list_view_columns` of `view_id` until the returned handle is notified
    pub fn gate_view(&self, view_id: ViewId) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(view_id, gate.clone());
        gate
    }

    /// Make the next `list_views` call read the views immediately but
    /// answer only once the returned handle is notified
    pub fn gate_views_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.listing_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self, op: &str) -> usize {
        self.with(|inner| inner.calls.get(op).copied().unwrap_or(0))
    }

    pub fn views(&self) -> Vec<View> {
        self.with(|inner| inner.views.clone())
    }

    pub fn view_columns(&self, view_id: ViewId) -> Vec<ViewColumnRecord> {
        self.with(|inner| {
            inner
                .view_columns
                .iter()
                .filter(|r| r.view_id == view_id)
                .cloned()
                .collect()
        })
    }

    pub fn sorts(&self, view_id: ViewId) -> Vec<SortRecord> {
        self.with(|inner| inner.sorts.iter().filter(|s| s.view_id == view_id).cloned().collect())
    }

    pub fn record(&self, table_id: TableId, record_id: RecordId) -> Option<Record> {
        self.with(|inner| {
            inner
                .records
                .get(&table_id)
                .and_then(|rows| rows.iter().find(|r| r.id == record_id).cloned())
        })
    }

    pub fn assignment(&self, record_id: RecordId) -> Vec<UserId> {
        self.with(|inner| inner.assignments.get(&record_id).cloned().unwrap_or_default())
    }

    pub fn notifications(&self) -> Vec<ScheduledNotification> {
        self.with(|inner| inner.notifications.clone())
    }
}

fn not_found(what: &str, id: i64) -> ApiError {
    ApiError::NotFound(format!("{} {}", what, id))
}

#[async_trait]
impl TableApi for MemoryApi {
    async fn fetch_structure(&self, table_id: TableId) -> ApiResult<Vec<Column>> {
        self.with(|inner| {
            inner.enter("fetch_structure")?;
            inner
                .columns
                .get(&table_id)
                .cloned()
                .ok_or_else(|| not_found("table", table_id))
        })
    }

    async fn create_column(&self, table_id: TableId, draft: &ColumnDraft) -> ApiResult<Column> {
        self.with(|inner| {
            inner.enter("create_column")?;
            let id = inner.id();
            let column = Column {
                id,
                name: draft.name.clone(),
                data_type: draft.data_type,
                is_required: draft.is_required,
                is_foreign_key: draft.is_foreign_key,
                foreign_table_id: draft.foreign_table_id,
                foreign_column_name: draft.foreign_column_name.clone(),
            };
            inner.columns.entry(table_id).or_default().push(column.clone());
            Ok(column)
        })
    }

    async fn update_column(&self, table_id: TableId, column_id: ColumnId, draft: &ColumnDraft) -> ApiResult<Column> {
        self.with(|inner| {
            inner.enter("update_column")?;
            let column = inner
                .columns
                .get_mut(&table_id)
                .and_then(|cols| cols.iter_mut().find(|c| c.id == column_id))
                .ok_or_else(|| not_found("column", column_id))?;
            column.name = draft.name.clone();
            column.data_type = draft.data_type;
            column.is_required = draft.is_required;
            column.is_foreign_key = draft.is_foreign_key;
            column.foreign_table_id = draft.foreign_table_id;
            column.foreign_column_name = draft.foreign_column_name.clone();
            Ok(column.clone())
        })
    }

    async fn delete_column(&self, table_id: TableId, column_id: ColumnId) -> ApiResult<()> {
        self.with(|inner| {
            inner.enter("delete_column")?;
            let columns = inner.columns.entry(table_id).or_default();
            let before = columns.len();
            columns.retain(|c| c.id != column_id);
            if columns.len() == before {
                return Err(not_found("column", column_id));
            }
            inner.view_columns.retain(|r| r.column_id != column_id);
            inner.sorts.retain(|s| s.column_id != column_id);
            Ok(())
        })
    }

    async fn fetch_records(&self, table_id: TableId, page: PageRequest) -> ApiResult<RecordPage> {
        self.with(|inner| {
            inner.enter("fetch_records")?;
            let mut rows = inner.records.get(&table_id).cloned().unwrap_or_default();
            rows.sort_by_key(|r| (r.position.unwrap_or(i64::MAX), r.id));
            let total = rows.len() as u64;
            let skip = ((page.page.max(1) - 1) * page.page_size) as usize;
            let records = rows.into_iter().skip(skip).take(page.page_size as usize).collect();
            Ok(RecordPage { records, total })
        })
    }

    async fn fetch_all_records(&self, table_id: TableId) -> ApiResult<Vec<Record>> {
        self.with(|inner| {
            inner.enter("fetch_all_records")?;
            inner
                .records
                .get(&table_id)
                .cloned()
                .ok_or_else(|| not_found("table", table_id))
        })
    }

    async fn create_record(&self, table_id: TableId, data: &RecordData) -> ApiResult<Record> {
        self.with(|inner| {
            inner.enter("create_record")?;
            let id = inner.id();
            let record = Record::new(id, data.clone());
            inner.records.entry(table_id).or_default().push(record.clone());
            Ok(record)
        })
    }

    async fn update_record(&self, table_id: TableId, record_id: RecordId, data: &RecordData) -> ApiResult<Record> {
        self.with(|inner| {
            inner.enter("update_record")?;
            let record = inner
                .records
                .get_mut(&table_id)
                .and_then(|rows| rows.iter_mut().find(|r| r.id == record_id))
                .ok_or_else(|| not_found("record", record_id))?;
            record.record_data = data.clone();
            Ok(record.clone())
        })
    }

    async fn delete_record(&self, table_id: TableId, record_id: RecordId) -> ApiResult<()> {
        self.with(|inner| {
            inner.enter("delete_record")?;
            let rows = inner.records.entry(table_id).or_default();
            let before = rows.len();
            rows.retain(|r| r.id != record_id);
            if rows.len() == before {
                return Err(not_found("record", record_id));
            }
            Ok(())
        })
    }

    async fn update_record_position(&self, record_id: RecordId, position: i64) -> ApiResult<()> {
        self.with(|inner| {
            inner.enter("update_record_position")?;
            if inner.failing_positions.contains(&record_id) {
                return Err(ApiError::Network(format!("position of record {} lost", record_id)));
            }
            let record = inner
                .records
                .values_mut()
                .flat_map(|rows| rows.iter_mut())
                .find(|r| r.id == record_id)
                .ok_or_else(|| not_found("record", record_id))?;
            record.position = Some(position);
            Ok(())
        })
    }

    async fn list_views(&self, table_id: TableId) -> ApiResult<Vec<View>> {
        let listing = self.with(|inner| {
            inner.enter("list_views")?;
            Ok(inner.views.iter().filter(|v| v.table_id == table_id).cloned().collect())
        });
        let gate = self.listing_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        listing
    }

    async fn create_view(&self, draft: &ViewDraft) -> ApiResult<View> {
        // let concurrent callers interleave here
        tokio::task::yield_now().await;
        self.with(|inner| {
            inner.enter("create_view")?;
            let view = View {
                id: inner.id(),
                table_id: draft.table_id,
                name: draft.name.clone(),
                sort_by: None,
                sort_direction: None,
                position: draft.position,
            };
            inner.views.push(view.clone());
            Ok(view)
        })
    }

    async fn update_view(&self, view: &View) -> ApiResult<View> {
        self.with(|inner| {
            inner.enter("update_view")?;
            let stored = inner
                .views
                .iter_mut()
                .find(|v| v.id == view.id)
                .ok_or_else(|| not_found("view", view.id))?;
            *stored = view.clone();
            Ok(view.clone())
        })
    }

    async fn delete_view(&self, view_id: ViewId) -> ApiResult<()> {
        self.with(|inner| {
            inner.enter("delete_view")?;
            inner.views.retain(|v| v.id != view_id);
            inner.view_columns.retain(|r| r.view_id != view_id);
            inner.sorts.retain(|s| s.view_id != view_id);
            Ok(())
        })
    }

    async fn list_view_columns(&self, view_id: ViewId) -> ApiResult<Vec<ViewColumnRecord>> {
        let gate = self.gates.lock().unwrap().get(&view_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.with(|inner| {
            inner.enter("list_view_columns")?;
            Ok(inner
                .view_columns
                .iter()
                .filter(|r| r.view_id == view_id)
                .cloned()
                .collect())
        })
    }

    async fn create_view_column(&self, draft: &ViewColumnDraft) -> ApiResult<ViewColumnRecord> {
        self.with(|inner| {
            inner.enter("create_view_column")?;
            let record = ViewColumnRecord {
                id: inner.id(),
                view_id: draft.view_id,
                column_id: draft.column_id,
                visible: draft.visible,
                position_num: draft.position_num,
                width_px: draft.width_px,
                filter_condition: draft.filter_condition,
                filter_value: draft.filter_value.clone(),
            };
            inner.view_columns.push(record.clone());
            Ok(record)
        })
    }

    async fn update_view_column(&self, record: &ViewColumnRecord) -> ApiResult<ViewColumnRecord> {
        self.with(|inner| {
            inner.enter("update_view_column")?;
            let stored = inner
                .view_columns
                .iter_mut()
                .find(|r| r.id == record.id)
                .ok_or_else(|| not_found("view column", record.id))?;
            *stored = record.clone();
            Ok(record.clone())
        })
    }

    async fn delete_view_column(&self, _view_id: ViewId, entry_id: ViewColumnId) -> ApiResult<()> {
        self.with(|inner| {
            inner.enter("delete_view_column")?;
            inner.view_columns.retain(|r| r.id != entry_id);
            Ok(())
        })
    }

    async fn list_sorts(&self, view_id: ViewId) -> ApiResult<Vec<SortRecord>> {
        self.with(|inner| {
            inner.enter("list_sorts")?;
            Ok(inner.sorts.iter().filter(|s| s.view_id == view_id).cloned().collect())
        })
    }

    async fn create_sort(&self, draft: &SortDraft) -> ApiResult<SortRecord> {
        self.with(|inner| {
            inner.enter("create_sort")?;
            let sort = SortRecord {
                id: inner.id(),
                view_id: draft.view_id,
                column_id: draft.column_id,
                direction: draft.direction,
                position: draft.position,
            };
            inner.sorts.push(sort.clone());
            Ok(sort)
        })
    }

    async fn update_sort(&self, sort: &SortRecord) -> ApiResult<SortRecord> {
        self.with(|inner| {
            inner.enter("update_sort")?;
            let stored = inner
                .sorts
                .iter_mut()
                .find(|s| s.id == sort.id)
                .ok_or_else(|| not_found("sort", sort.id))?;
            *stored = sort.clone();
            Ok(sort.clone())
        })
    }

    async fn delete_sort(&self, _view_id: ViewId, sort_id: SortId) -> ApiResult<()> {
        self.with(|inner| {
            inner.enter("delete_sort")?;
            inner.sorts.retain(|s| s.id != sort_id);
            Ok(())
        })
    }

    async fn fetch_assigned_users(&self, record_id: RecordId) -> ApiResult<Vec<AssignedUser>> {
        self.with(|inner| {
            inner.enter("fetch_assigned_users")?;
            let ids = inner.assignments.get(&record_id).cloned().unwrap_or_default();
            Ok(ids
                .into_iter()
                .map(|id| {
                    inner.users.get(&id).cloned().unwrap_or(AssignedUser {
                        id,
                        name: None,
                        email: None,
                    })
                })
                .collect())
        })
    }

    async fn set_assigned_users(&self, record_id: RecordId, user_ids: &[UserId]) -> ApiResult<()> {
        self.with(|inner| {
            inner.enter("set_assigned_users")?;
            inner.assignments.insert(record_id, user_ids.to_vec());
            Ok(())
        })
    }

    async fn create_scheduled_notification(&self, draft: &NotificationDraft) -> ApiResult<ScheduledNotification> {
        self.with(|inner| {
            inner.enter("create_scheduled_notification")?;
            let scheduled = ScheduledNotification {
                id: inner.id(),
                table_id: draft.table_id,
                record_id: draft.record_id,
                column_id: draft.column_id,
                target_date: draft.target_date,
                notify_before_days: draft.notify_before_days,
                assigned_users: draft.assigned_users.clone(),
            };
            inner.notifications.push(scheduled.clone());
            Ok(scheduled)
        })
    }
}
