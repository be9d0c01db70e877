//! Record mutations
//!
//! Every confirmed mutation is followed by a full reload of the current
//! page; the record store is never patched in place.

use log::{debug, info, warn};

use super::TableViewEngine;
use crate::batch::{run_sequential, BatchOutcome};
use crate::error::{to_mutation_error, EngineError, Result};
use crate::models::{Column, Record, RecordData, RecordId};

impl TableViewEngine {
    /// Validate and create a record, then reload the page
    pub async fn create_record(&self, data: RecordData) -> Result<Record> {
        let columns = self.columns().await;
        validate_record(&columns, &data)?;

        let record = self
            .api
            .create_record(self.table_id, &data)
            .await
            .map_err(to_mutation_error("Create record"))?;

        info!("Table {}: created record {}", self.table_id, record.id);
        self.reload_after_mutation().await;
        Ok(record)
    }

    /// Validate and replace a record's data, then reload the page
    pub async fn update_record(&self, record_id: RecordId, data: RecordData) -> Result<Record> {
        let columns = self.columns().await;
        validate_record(&columns, &data)?;

        let record = self
            .api
            .update_record(self.table_id, record_id, &data)
            .await
            .map_err(to_mutation_error("Update record"))?;

        info!("Table {}: updated record {}", self.table_id, record_id);
        self.reload_after_mutation().await;
        Ok(record)
    }

    /// Delete a record, then reload the page
    pub async fn delete_record(&self, record_id: RecordId) -> Result<()> {
        self.api
            .delete_record(self.table_id, record_id)
            .await
            .map_err(to_mutation_error("Delete record"))?;

        info!("Table {}: deleted record {}", self.table_id, record_id);
        self.reload_after_mutation().await;
        Ok(())
    }

    /// Move record `moved` to the place record `target` holds in the
    /// table's manual order
    ///
    /// Records are addressed by id so the move does not depend on the
    /// filters or sort of the active view. One position update is sent per
    /// record whose position changes, one at a time in page order. The first
    /// failure stops the batch; the page is reloaded either way so it
    /// reflects what reached the backend, and the failure is returned as
    /// [`EngineError::PartialReorder`].
    pub async fn reorder_records(&self, moved: RecordId, target: RecordId) -> Result<BatchOutcome> {
        let plan = {
            let state = self.state.read().await;
            let index_of = |id: RecordId| {
                state.records.index_of(id).ok_or_else(|| {
                    EngineError::InvalidOperation(format!("record {} is not on the current page", id))
                })
            };
            let (from, to) = (index_of(moved)?, index_of(target)?);
            debug!("Table {}: moving record {} from slot {} to {}", self.table_id, moved, from, to);
            state.records.reorder_plan(from, to)
        };

        if plan.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let api = &self.api;
        let outcome = run_sequential(plan, |record_id, position| async move {
            api.update_record_position(record_id, position).await
        })
        .await;

        self.reload_after_mutation().await;

        match outcome.first_failure().cloned() {
            None => {
                info!(
                    "Table {}: moved record {} to the place of {} ({} positions updated)",
                    self.table_id,
                    moved,
                    target,
                    outcome.succeeded.len()
                );
                Ok(outcome)
            }
            Some(failure) => Err(EngineError::PartialReorder {
                failed_record: failure.id,
                reason: failure.error,
                outcome,
            }),
        }
    }

    async fn reload_after_mutation(&self) {
        if let Err(e) = self.reload_records().await {
            warn!("Table {}: page left empty after mutation: {}", self.table_id, e);
        }
    }
}

/// Check `data` against the schema before it is sent
///
/// Every column is checked, so a missing required column fails even when
/// `data` does not mention it. Fields that name no column are rejected.
pub(crate) fn validate_record(columns: &[Column], data: &RecordData) -> Result<()> {
    if let Some(unknown) = data.keys().find(|name| !columns.iter().any(|c| &c.name == *name)) {
        return Err(EngineError::Validation(format!("unknown column '{}'", unknown)));
    }

    let problems: Vec<String> = columns
        .iter()
        .filter_map(|column| column.validate_value(data.get(&column.name)).err())
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(problems.join("; ")))
    }
}
