//! Edits of the active view: column layout, filters, sorts
//!
//! Every persisted edit follows the same path: the view state moves to
//! `PersistingEdit`, the write goes to the backend, and only the entries the
//! backend returned are committed to the new `Ready` snapshot. A rejected
//! write restores the previous snapshot. If the user switched views while
//! the write was pending the local update is dropped.

use log::{debug, error, info, warn};

use super::TableViewEngine;
use crate::error::{to_mutation_error, ApiError, EngineError, Result};
use crate::models::{
    Column, ColumnFilter, ColumnId, ColumnLayout, Filter, FilterCondition, SortDirection, SortDraft, SortId,
    ViewColumnDraft, ViewColumnEntry, ViewColumnId, ViewColumnRecord,
};
use crate::views::{plan_column_move, ActiveView, LayoutChange, Projection};

/// Snapshot being edited and the view generation it belongs to
struct Edit {
    generation: u64,
    active: ActiveView,
}

impl TableViewEngine {
    async fn begin_edit(&self) -> Result<Edit> {
        let mut state = self.state.write().await;
        let active = state.view_state.begin_edit()?;
        debug!("View {}: edit started", active.view_id());
        Ok(Edit {
            generation: state.generation,
            active,
        })
    }

    /// Commit `next`, or restore the previous snapshot when `None`
    async fn finish_edit(&self, generation: u64, next: Option<ActiveView>) {
        let mut state = self.state.write().await;
        if state.generation != generation {
            warn!(
                "View switched while an edit was pending; dropping the local update of generation {}",
                generation
            );
            return;
        }
        state.view_state.finish_edit(next);
    }

    /// Build one entry write from the snapshot, persist it and commit the
    /// entry the backend returns
    async fn persist_entry<F>(&self, operation: &str, write: F) -> Result<()>
    where
        F: FnOnce(&ActiveView) -> Result<EntryWrite>,
    {
        let Edit { generation, mut active } = self.begin_edit().await?;

        let request = match write(&active) {
            Ok(request) => request,
            Err(e) => {
                self.finish_edit(generation, None).await;
                return Err(e);
            }
        };

        let result = match &request {
            EntryWrite::Create(draft) => self.api.create_view_column(draft).await.map(Some),
            EntryWrite::Update(record) => self.api.update_view_column(record).await.map(Some),
            EntryWrite::Delete(id) => self.api.delete_view_column(active.view_id(), *id).await.map(|_| None),
        };

        match result {
            Ok(saved) => {
                match (saved, request) {
                    (Some(record), _) => apply_entry(&mut active, ViewColumnEntry::from(record)),
                    (None, EntryWrite::Delete(id)) => {
                        active.config.filters.retain(|f| f.id != id);
                        active.config.layouts.retain(|l| l.id != id);
                    }
                    (None, _) => {}
                }
                info!("View {}: {} saved", active.view_id(), operation);
                self.finish_edit(generation, Some(active)).await;
                Ok(())
            }
            Err(e) => {
                error!("View {}: {} failed: {}", active.view_id(), operation, e);
                self.finish_edit(generation, None).await;
                Err(to_mutation_error(operation)(e))
            }
        }
    }

    /// Show or hide a column in the active view
    pub async fn set_column_visibility(&self, column_id: ColumnId, visible: bool) -> Result<()> {
        let columns = self.columns().await;
        require_column(&columns, column_id)?;

        self.persist_entry("Set column visibility", |active| {
            Ok(match active.config.layout_for(column_id) {
                Some(layout) => EntryWrite::Update(ColumnLayout { visible, ..layout.clone() }.to_record()),
                None => {
                    let position = current_index(&columns, active, column_id);
                    EntryWrite::Create(ViewColumnDraft::layout(
                        active.view_id(),
                        column_id,
                        visible,
                        Some(position),
                        None,
                    ))
                }
            })
        })
        .await
    }

    /// Set the width of a column in the active view
    pub async fn set_column_width(&self, column_id: ColumnId, width_px: u32) -> Result<()> {
        if width_px == 0 {
            return Err(EngineError::Validation("column width must be positive".to_string()));
        }
        let columns = self.columns().await;
        require_column(&columns, column_id)?;

        self.persist_entry("Set column width", |active| {
            Ok(match active.config.layout_for(column_id) {
                Some(layout) => EntryWrite::Update(
                    ColumnLayout {
                        width_px: Some(width_px),
                        ..layout.clone()
                    }
                    .to_record(),
                ),
                None => {
                    let position = current_index(&columns, active, column_id);
                    EntryWrite::Create(ViewColumnDraft::layout(
                        active.view_id(),
                        column_id,
                        true,
                        Some(position),
                        Some(width_px),
                    ))
                }
            })
        })
        .await
    }

    /// Move a column to `to_index` in the active view's column order
    ///
    /// Only layout entries are written, one at a time. If a write fails the
    /// layouts already confirmed are kept and the error is returned.
    pub async fn move_column(&self, column_id: ColumnId, to_index: usize) -> Result<()> {
        let columns = self.columns().await;
        require_column(&columns, column_id)?;

        let Edit { generation, mut active } = self.begin_edit().await?;
        let view_id = active.view_id();

        let changes = match plan_column_move(view_id, &columns, &active.config.layouts, column_id, to_index) {
            Some(changes) => changes,
            None => {
                self.finish_edit(generation, None).await;
                return Err(EngineError::InvalidOperation(format!(
                    "column {} is not part of view {}",
                    column_id, view_id
                )));
            }
        };
        debug!("View {}: moving column {} needs {} layout writes", view_id, column_id, changes.len());

        let mut failure: Option<(ColumnId, ApiError)> = None;
        for change in changes {
            let target = change.column_id();
            let result = match &change {
                LayoutChange::Create(draft) => self.api.create_view_column(draft).await,
                LayoutChange::Update(layout) => self.api.update_view_column(&layout.to_record()).await,
            };
            match result {
                Ok(record) => apply_entry(&mut active, ViewColumnEntry::from(record)),
                Err(e) => {
                    failure = Some((target, e));
                    break;
                }
            }
        }

        self.finish_edit(generation, Some(active)).await;
        match failure {
            None => {
                info!("View {}: column {} moved to {}", view_id, column_id, to_index);
                Ok(())
            }
            Some((target, e)) => {
                error!("View {}: layout of column {} could not be saved: {}", view_id, target, e);
                Err(to_mutation_error("Move column")(e))
            }
        }
    }

    /// Add a persisted filter to the active view
    pub async fn add_filter(&self, column_id: ColumnId, condition: FilterCondition, value: Option<String>) -> Result<()> {
        let columns = self.columns().await;
        require_column(&columns, column_id)?;
        let value = validate_filter_value(condition, value)?;

        self.persist_entry("Add filter", |active| {
            Ok(EntryWrite::Create(ViewColumnDraft::filter(
                active.view_id(),
                column_id,
                condition,
                value,
            )))
        })
        .await
    }

    /// Change the condition and value of a persisted filter
    pub async fn update_filter(&self, filter_id: ViewColumnId, condition: FilterCondition, value: Option<String>) -> Result<()> {
        let value = validate_filter_value(condition, value)?;

        self.persist_entry("Update filter", |active| {
            let filter = find_filter(active, filter_id)?;
            Ok(EntryWrite::Update(
                ColumnFilter {
                    condition,
                    value,
                    ..filter.clone()
                }
                .to_record(),
            ))
        })
        .await
    }

    /// Remove a persisted filter
    pub async fn remove_filter(&self, filter_id: ViewColumnId) -> Result<()> {
        self.persist_entry("Remove filter", |active| {
            find_filter(active, filter_id)?;
            Ok(EntryWrite::Delete(filter_id))
        })
        .await
    }

    /// Add a filter to the active view for this session only
    pub async fn add_session_filter(&self, filter: Filter) -> Result<()> {
        if filter.condition.takes_value() && filter.value.as_deref().map_or(true, str::is_empty) {
            return Err(EngineError::Validation(format!(
                "filter '{}' needs a value",
                filter.condition
            )));
        }
        let mut state = self.state.write().await;
        let active = state
            .view_state
            .ready_mut()
            .ok_or_else(|| EngineError::InvalidOperation("no view is ready".to_string()))?;
        active.session_filters.push(filter);
        Ok(())
    }

    /// Drop the session filters of the active view
    pub async fn clear_session_filters(&self) {
        let mut state = self.state.write().await;
        if let Some(active) = state.view_state.ready_mut() {
            active.session_filters.clear();
        }
    }

    /// Append a sort key to the active view
    pub async fn add_sort(&self, column_id: ColumnId, direction: SortDirection) -> Result<()> {
        let columns = self.columns().await;
        require_column(&columns, column_id)?;

        let Edit { generation, mut active } = self.begin_edit().await?;
        if active.config.sorts.iter().any(|s| s.column_id == column_id) {
            self.finish_edit(generation, None).await;
            return Err(EngineError::InvalidOperation(format!(
                "view {} is already sorted by column {}",
                active.view_id(),
                column_id
            )));
        }

        let draft = SortDraft {
            view_id: active.view_id(),
            column_id,
            direction,
            position: active.config.sorts.len() as i64,
        };
        match self.api.create_sort(&draft).await {
            Ok(sort) => {
                active.config.sorts.push(sort);
                self.finish_edit(generation, Some(active)).await;
                Ok(())
            }
            Err(e) => {
                self.finish_edit(generation, None).await;
                Err(to_mutation_error("Add sort")(e))
            }
        }
    }

    /// Change the direction of a sort key
    pub async fn update_sort_direction(&self, sort_id: SortId, direction: SortDirection) -> Result<()> {
        let Edit { generation, mut active } = self.begin_edit().await?;

        let Some(index) = active.config.sorts.iter().position(|s| s.id == sort_id) else {
            self.finish_edit(generation, None).await;
            return Err(EngineError::InvalidOperation(format!("sort {} does not exist", sort_id)));
        };

        let mut sort = active.config.sorts[index].clone();
        sort.direction = direction;
        match self.api.update_sort(&sort).await {
            Ok(saved) => {
                active.config.sorts[index] = saved;
                self.finish_edit(generation, Some(active)).await;
                Ok(())
            }
            Err(e) => {
                self.finish_edit(generation, None).await;
                Err(to_mutation_error("Update sort")(e))
            }
        }
    }

    /// Remove a sort key and renumber the remaining keys
    ///
    /// The key is removed once the delete is confirmed. A failed renumbering
    /// keeps the keys confirmed so far and returns the error.
    pub async fn remove_sort(&self, sort_id: SortId) -> Result<()> {
        let Edit { generation, mut active } = self.begin_edit().await?;
        let view_id = active.view_id();

        if !active.config.sorts.iter().any(|s| s.id == sort_id) {
            self.finish_edit(generation, None).await;
            return Err(EngineError::InvalidOperation(format!("sort {} does not exist", sort_id)));
        }

        if let Err(e) = self.api.delete_sort(view_id, sort_id).await {
            self.finish_edit(generation, None).await;
            return Err(to_mutation_error("Remove sort")(e));
        }
        active.config.sorts.retain(|s| s.id != sort_id);

        let mut failure = None;
        for index in 0..active.config.sorts.len() {
            let position = index as i64;
            if active.config.sorts[index].position == position {
                continue;
            }
            let mut sort = active.config.sorts[index].clone();
            sort.position = position;
            match self.api.update_sort(&sort).await {
                Ok(saved) => active.config.sorts[index] = saved,
                Err(e) => {
                    warn!("View {}: sort {} could not be renumbered: {}", view_id, sort.id, e);
                    failure = Some(e);
                    break;
                }
            }
        }

        self.finish_edit(generation, Some(active)).await;
        match failure {
            Some(e) => Err(to_mutation_error("Renumber sorts")(e)),
            None => Ok(()),
        }
    }
}

/// A single write of a `view_columns` entity
enum EntryWrite {
    Create(ViewColumnDraft),
    Update(ViewColumnRecord),
    Delete(ViewColumnId),
}

fn apply_entry(active: &mut ActiveView, entry: ViewColumnEntry) {
    match entry {
        ViewColumnEntry::Layout(layout) => active.config.upsert_layout(layout),
        ViewColumnEntry::Filter(filter) => match active.config.filters.iter_mut().find(|f| f.id == filter.id) {
            Some(existing) => *existing = filter,
            None => active.config.filters.push(filter),
        },
    }
}

fn require_column(columns: &[Column], column_id: ColumnId) -> Result<()> {
    if columns.iter().any(|c| c.id == column_id) {
        Ok(())
    } else {
        Err(EngineError::InvalidOperation(format!("column {} does not exist", column_id)))
    }
}

fn current_index(columns: &[Column], active: &ActiveView, column_id: ColumnId) -> i64 {
    Projection::build(columns, &active.config.layouts)
        .columns()
        .iter()
        .position(|c| c.column.id == column_id)
        .map_or(0, |index| index as i64)
}

fn find_filter(active: &ActiveView, filter_id: ViewColumnId) -> Result<&ColumnFilter> {
    active
        .config
        .filters
        .iter()
        .find(|f| f.id == filter_id)
        .ok_or_else(|| EngineError::InvalidOperation(format!("filter {} does not exist", filter_id)))
}

fn validate_filter_value(condition: FilterCondition, value: Option<String>) -> Result<Option<String>> {
    if !condition.takes_value() {
        return Ok(None);
    }
    match value {
        Some(value) if !value.is_empty() => Ok(Some(value)),
        _ => Err(EngineError::Validation(format!("filter '{}' needs a value", condition))),
    }
}
