//! Assigned users and scheduled reminders
//!
//! Per-record decorations. They are fetched on demand, never take part in
//! filtering or sorting, and their failures never affect rendering.

use log::{debug, info, warn};

use super::TableViewEngine;
use crate::error::{to_mutation_error, EngineError, Result};
use crate::models::{
    parse_date, value::string_form, AssignedUser, ColumnId, NotificationDraft, RecordId,
    ScheduledNotification, UserId,
};

impl TableViewEngine {
    /// Users assigned to a record
    ///
    /// Fetched on first use and cached until the page is loaded again.
    pub async fn assigned_users(&self, record_id: RecordId) -> Result<Vec<AssignedUser>> {
        if let Some(users) = self.state.read().await.assignees.get(&record_id) {
            return Ok(users.clone());
        }

        let users = self
            .api
            .fetch_assigned_users(record_id)
            .await
            .map_err(|e| EngineError::NotLoaded(format!("assigned users of record {}: {}", record_id, e)))?;

        debug!("Record {}: {} assigned users", record_id, users.len());
        self.state
            .write()
            .await
            .assignees
            .insert(record_id, users.clone());
        Ok(users)
    }

    /// Assign a user to a record
    ///
    /// The complete id list is sent; the cached entry is dropped so the next
    /// read sees the backend's view.
    pub async fn add_assignee(&self, record_id: RecordId, user_id: UserId) -> Result<Vec<UserId>> {
        let mut ids = self.assignee_ids(record_id).await?;
        if ids.contains(&user_id) {
            return Ok(ids);
        }
        ids.push(user_id);
        self.put_assignees(record_id, ids, "Assign user").await
    }

    /// Remove a user from a record
    pub async fn remove_assignee(&self, record_id: RecordId, user_id: UserId) -> Result<Vec<UserId>> {
        let mut ids = self.assignee_ids(record_id).await?;
        if !ids.contains(&user_id) {
            return Ok(ids);
        }
        ids.retain(|id| *id != user_id);
        self.put_assignees(record_id, ids, "Unassign user").await
    }

    async fn assignee_ids(&self, record_id: RecordId) -> Result<Vec<UserId>> {
        Ok(self
            .assigned_users(record_id)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect())
    }

    async fn put_assignees(&self, record_id: RecordId, ids: Vec<UserId>, operation: &str) -> Result<Vec<UserId>> {
        self.api
            .set_assigned_users(record_id, &ids)
            .await
            .map_err(to_mutation_error(operation))?;

        self.state.write().await.assignees.remove(&record_id);
        info!("Record {}: {} users assigned", record_id, ids.len());
        Ok(ids)
    }

    /// Schedule a reminder `notify_before_days` before the date stored in a
    /// record's date or datetime column
    ///
    /// `assigned_users` picks who is notified. With `None` the record's
    /// assigned users are attached; if they cannot be fetched the reminder
    /// is sent without them.
    pub async fn schedule_reminder(
        &self,
        record_id: RecordId,
        column_id: ColumnId,
        notify_before_days: u32,
        assigned_users: Option<Vec<UserId>>,
    ) -> Result<ScheduledNotification> {
        let target_date = {
            let state = self.state.read().await;
            let column = state.schema.column(column_id).ok_or_else(|| {
                EngineError::InvalidOperation(format!("column {} does not exist", column_id))
            })?;
            if !column.data_type.is_temporal() {
                return Err(EngineError::Validation(format!(
                    "column '{}' is not a date column",
                    column.name
                )));
            }
            let record = state.records.get(record_id).ok_or_else(|| {
                EngineError::NotLoaded(format!("record {} is not on the current page", record_id))
            })?;
            let raw = record.raw(&column.name).map(string_form).unwrap_or_default();
            parse_date(&raw).ok_or_else(|| {
                EngineError::Validation(format!(
                    "record {} has no valid date in column '{}'",
                    record_id, column.name
                ))
            })?
        };

        let assigned_users = match assigned_users {
            Some(ids) => ids,
            None => match self.assignee_ids(record_id).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("Record {}: scheduling reminder without assigned users: {}", record_id, e);
                    Vec::new()
                }
            },
        };

        let draft = NotificationDraft {
            table_id: self.table_id,
            record_id,
            column_id,
            target_date,
            notify_before_days,
            assigned_users,
        };

        let scheduled = self
            .api
            .create_scheduled_notification(&draft)
            .await
            .map_err(to_mutation_error("Schedule reminder"))?;

        info!(
            "Record {}: reminder {} scheduled for {}",
            record_id, scheduled.id, scheduled.target_date
        );
        Ok(scheduled)
    }
}
