//! View selection, the default view and view management

use std::sync::atomic::Ordering;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::TableViewEngine;
use crate::batch::run_sequential;
use crate::error::{to_mutation_error, to_view_config_error, EngineError, Result};
use crate::models::{View, ViewColumnDraft, ViewDraft, ViewId};
use crate::stores::LoadStatus;
use crate::views::{ActiveView, ViewConfig, ViewState};

/// How a view switch ended
#[derive(Debug)]
pub enum ViewSelection {
    /// Configuration fetched and applied
    Applied,

    /// Configuration could not be fetched; the view is shown unconfigured
    Degraded(EngineError),

    /// Another view was selected before this one finished loading
    Superseded,
}

impl TableViewEngine {
    /// Views of the table ordered by position
    pub async fn list_views(&self) -> Vec<View> {
        self.state.read().await.views.views().to_vec()
    }

    /// Make `view_id` the active view
    ///
    /// Filters, sorts, visibility and session filters of the previous view
    /// are replaced as a whole. A pending config fetch of a previously
    /// selected view is cancelled, and a response arriving after a newer
    /// switch is discarded.
    pub async fn select_view(&self, view_id: ViewId) -> Result<ViewSelection> {
        let (generation, token, view) = {
            let mut state = self.state.write().await;
            let view = state.views.get(view_id).cloned().ok_or_else(|| {
                EngineError::InvalidOperation(format!("view {} does not exist", view_id))
            })?;

            if let Some(previous) = state.view_fetch.take() {
                previous.cancel();
            }
            state.generation += 1;
            let token = CancellationToken::new();
            state.view_fetch = Some(token.clone());
            state.view_state = ViewState::Loading { view_id };
            (state.generation, token, view)
        };

        debug!("Loading configuration of view {} (generation {})", view_id, generation);

        let fetch = async {
            tokio::try_join!(self.api.list_view_columns(view_id), self.api.list_sorts(view_id))
        };
        let fetched = tokio::select! {
            _ = token.cancelled() => {
                debug!("Configuration fetch of view {} cancelled", view_id);
                return Ok(ViewSelection::Superseded);
            }
            fetched = fetch => fetched,
        };

        let mut state = self.state.write().await;
        if state.generation != generation {
            warn!(
                "Discarding configuration of view {}: generation {} superseded by {}",
                view_id, generation, state.generation
            );
            return Ok(ViewSelection::Superseded);
        }
        state.view_fetch = None;

        let (config, selection) = match fetched {
            Ok((entries, sorts)) => (ViewConfig::from_records(view, entries, sorts), ViewSelection::Applied),
            Err(e) => {
                warn!("View {}: configuration unavailable, showing it unconfigured: {}", view_id, e);
                (ViewConfig::unconfigured(view), ViewSelection::Degraded(to_view_config_error(e)))
            }
        };

        state.view_state = ViewState::Ready(ActiveView::new(config));
        info!("View {} active", view_id);
        Ok(selection)
    }

    /// Create the default view when the table has columns but no views
    ///
    /// Returns the created view, or `None` when nothing had to be done or
    /// another call is already creating it. Concurrent calls create at most
    /// one view.
    pub async fn ensure_default_view(&self) -> Result<Option<View>> {
        if !self.needs_default_view().await {
            return Ok(None);
        }

        if self
            .default_view_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Table {}: default view creation already in flight", self.table_id);
            return Ok(None);
        }

        let result = self.create_default_view_if_missing().await;

        self.default_view_in_flight.store(false, Ordering::SeqCst);
        result
    }

    /// Create the default view unless the backend already lists views
    ///
    /// The registry may hold a listing taken before a concurrent load
    /// created the default view, so the backend is asked again first.
    async fn create_default_view_if_missing(&self) -> Result<Option<View>> {
        if !self.needs_default_view().await {
            return Ok(None);
        }

        let views = self
            .api
            .list_views(self.table_id)
            .await
            .map_err(to_view_config_error)?;
        if !views.is_empty() {
            debug!(
                "Table {}: backend already has {} views, default view not needed",
                self.table_id,
                views.len()
            );
            self.state.write().await.views.replace(views);
            return Ok(None);
        }

        self.create_default_view().await.map(Some)
    }

    async fn needs_default_view(&self) -> bool {
        let state = self.state.read().await;
        *state.views.status() == LoadStatus::Loaded
            && state.views.is_empty()
            && !state.schema.is_empty()
    }

    async fn create_default_view(&self) -> Result<View> {
        let draft = ViewDraft {
            table_id: self.table_id,
            name: self.config.default_view_name.clone(),
            position: 0,
        };

        let view = self
            .api
            .create_view(&draft)
            .await
            .map_err(to_mutation_error("Create default view"))?;

        let columns = self.columns().await;
        let layouts: Vec<(i64, ViewColumnDraft)> = columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                (
                    column.id,
                    ViewColumnDraft::layout(view.id, column.id, true, Some(index as i64), None),
                )
            })
            .collect();

        let api = &self.api;
        let outcome = run_sequential(layouts, |_, draft| async move {
            api.create_view_column(&draft).await.map(|_| ())
        })
        .await;
        if !outcome.is_complete() {
            // columns without a layout are still shown in schema order
            warn!(
                "Default view {}: {} of {} column layouts were not created",
                view.id,
                outcome.failed.len() + outcome.not_attempted.len(),
                columns.len()
            );
        }

        self.state.write().await.views.upsert(view.clone());
        info!("Table {}: created default view '{}' ({})", self.table_id, view.name, view.id);
        Ok(view)
    }

    /// Create a view after the existing ones; it is not selected
    pub async fn create_view(&self, name: &str) -> Result<View> {
        let name = validate_view_name(name)?;
        let position = self.state.read().await.views.next_position();
        let draft = ViewDraft {
            table_id: self.table_id,
            name,
            position,
        };

        let view = self
            .api
            .create_view(&draft)
            .await
            .map_err(to_mutation_error("Create view"))?;

        self.state.write().await.views.upsert(view.clone());
        info!("Created view '{}' ({})", view.name, view.id);
        Ok(view)
    }

    /// Rename a view
    pub async fn rename_view(&self, view_id: ViewId, name: &str) -> Result<View> {
        let name = validate_view_name(name)?;
        let current = self.state.read().await.views.get(view_id).cloned().ok_or_else(|| {
            EngineError::InvalidOperation(format!("view {} does not exist", view_id))
        })?;

        let renamed = self
            .api
            .update_view(&View { name, ..current })
            .await
            .map_err(to_mutation_error("Rename view"))?;

        let mut state = self.state.write().await;
        state.views.upsert(renamed.clone());
        match &mut state.view_state {
            ViewState::Ready(active) | ViewState::PersistingEdit { previous: active }
                if active.view_id() == view_id =>
            {
                active.config.view = renamed.clone();
            }
            _ => {}
        }
        Ok(renamed)
    }

    /// Delete a view; the last view of a table cannot be deleted
    ///
    /// When the active view is deleted the first remaining view is selected.
    pub async fn delete_view(&self, view_id: ViewId) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.views.get(view_id).is_none() {
                return Err(EngineError::InvalidOperation(format!("view {} does not exist", view_id)));
            }
            if state.views.views().len() <= 1 {
                return Err(EngineError::InvalidOperation(
                    "the last view of a table cannot be deleted".to_string(),
                ));
            }
        }

        self.api
            .delete_view(view_id)
            .await
            .map_err(to_mutation_error("Delete view"))?;

        let next = {
            let mut state = self.state.write().await;
            state.views.remove(view_id);
            let was_active = match &state.view_state {
                ViewState::Loading { view_id: loading } => *loading == view_id,
                other => other.active().map_or(false, |a| a.view_id() == view_id),
            };
            if was_active {
                state.view_state = ViewState::NoViewSelected;
                state.views.first().map(|v| v.id)
            } else {
                None
            }
        };
        info!("Deleted view {}", view_id);

        if let Some(next) = next {
            if let ViewSelection::Degraded(e) = self.select_view(next).await? {
                warn!("View {} selected after delete is unconfigured: {}", next, e);
            }
        }
        Ok(())
    }
}

fn validate_view_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("view name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}
