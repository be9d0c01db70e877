//! Schema edits
//!
//! After a confirmed column change the schema is fetched again and the
//! active view is reconciled with it: entries for columns that no longer
//! exist are dropped, new columns show up visible after the configured ones.

use log::{info, warn};

use super::TableViewEngine;
use crate::error::{to_mutation_error, EngineError, Result};
use crate::models::{Column, ColumnDraft, ColumnId};
use crate::views::ViewState;

impl TableViewEngine {
    /// Add a column to the table
    pub async fn add_column(&self, draft: ColumnDraft) -> Result<Column> {
        let columns = self.columns().await;
        validate_draft(&columns, &draft, None)?;

        let column = self
            .api
            .create_column(self.table_id, &draft)
            .await
            .map_err(to_mutation_error("Add column"))?;

        info!("Table {}: added column '{}' ({})", self.table_id, column.name, column.id);
        self.reload_schema().await?;
        Ok(column)
    }

    /// Change a column definition
    ///
    /// Records are reloaded too, since a renamed column changes the keys of
    /// every record and foreign key settings change display values.
    pub async fn update_column(&self, column_id: ColumnId, draft: ColumnDraft) -> Result<Column> {
        let columns = self.columns().await;
        if !columns.iter().any(|c| c.id == column_id) {
            return Err(EngineError::InvalidOperation(format!("column {} does not exist", column_id)));
        }
        validate_draft(&columns, &draft, Some(column_id))?;

        let column = self
            .api
            .update_column(self.table_id, column_id, &draft)
            .await
            .map_err(to_mutation_error("Update column"))?;

        info!("Table {}: updated column {}", self.table_id, column_id);
        self.reload_schema().await?;
        if let Err(e) = self.reload_records().await {
            warn!("Table {}: records not reloaded after column update: {}", self.table_id, e);
        }
        Ok(column)
    }

    /// Delete a column
    pub async fn delete_column(&self, column_id: ColumnId) -> Result<()> {
        self.api
            .delete_column(self.table_id, column_id)
            .await
            .map_err(to_mutation_error("Delete column"))?;

        info!("Table {}: deleted column {}", self.table_id, column_id);
        self.reload_schema().await
    }

    /// Fetch the schema again and reconcile the active view with it
    pub async fn reload_schema(&self) -> Result<()> {
        let columns = self
            .api
            .fetch_structure(self.table_id)
            .await
            .map_err(EngineError::SchemaLoad)?;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.schema.replace(columns);

        let schema = &state.schema;
        let active = match &mut state.view_state {
            ViewState::Ready(active) => Some(active),
            ViewState::PersistingEdit { previous } => Some(previous),
            _ => None,
        };
        if let Some(active) = active {
            let dropped = active.config.retain_columns(|id| schema.column(id).is_some());
            active.session_filters.retain(|f| schema.column_by_name(&f.column).is_some());
            if dropped > 0 {
                info!(
                    "View {}: dropped {} entries of removed columns",
                    active.view_id(),
                    dropped
                );
            }
        }
        Ok(())
    }
}

fn validate_draft(columns: &[Column], draft: &ColumnDraft, editing: Option<ColumnId>) -> Result<()> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("column name cannot be empty".to_string()));
    }
    if columns.iter().any(|c| c.name == name && Some(c.id) != editing) {
        return Err(EngineError::Validation(format!("a column named '{}' already exists", name)));
    }
    if draft.is_foreign_key && draft.foreign_table_id.is_none() {
        return Err(EngineError::Validation(format!(
            "foreign key column '{}' needs a referenced table",
            name
        )));
    }
    Ok(())
}
