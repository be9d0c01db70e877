//! Table view engine
//!
//! [`TableViewEngine`] composes the stores, the foreign key resolver, the
//! view registry and the evaluators into the table to render, and routes
//! user edits to the external API.
//!
//! Reads degrade: a failed fetch leaves an empty but valid store and the
//! error is reported next to the result. Writes propagate: local state only
//! changes after the backend confirms, and a rejected write leaves it as it
//! was.
//!
//! Locks over engine state are never held across an API call.

mod augment;
mod columns;
mod edits;
mod records;
mod selection;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::api::TableApi;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::filter::{apply_filters, matches_all};
use crate::foreign::{ForeignKeyResolver, Resolution};
use crate::models::{
    AssignedUser, Column, Filter, PageRequest, Record, RecordId, ResolvedRecord, SortKey,
    TableId, View,
};
use crate::sort::sort_records;
use crate::stores::{LoadStatus, RecordStore, SchemaStore};
use crate::views::{active_filters, sort_chain, OrderedColumn, Projection, ViewRegistry, ViewState};

pub use selection::ViewSelection;

/// The rendered table of the active view
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    /// Active view, `None` while no view is selected
    pub view: Option<View>,

    /// Shown columns in view order
    pub columns: Vec<OrderedColumn>,

    /// Visibility per column name
    pub column_visibility: HashMap<String, bool>,

    /// Every column name in view order, hidden ones included
    pub ordered_column_names: Vec<String>,

    /// Filters applied, persisted ones first, then session filters
    pub active_filters: Vec<Filter>,

    /// Sort chain applied
    pub sort_chain: Vec<SortKey>,

    /// Filtered and sorted rows with display values
    pub rows: Vec<ResolvedRecord>,

    /// Total records of the table on the backend
    pub total: u64,
}

/// Errors collected while loading; none of them stop the load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Degraded reads, in the order they happened
    pub errors: Vec<EngineError>,
}

impl LoadReport {
    /// Whether every read succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Mutable state behind the engine lock
#[derive(Debug)]
struct EngineState {
    schema: SchemaStore,
    records: RecordStore,
    views: ViewRegistry,
    view_state: ViewState,
    /// Constant filter from the embedding context, matched on raw values
    base_filter: Vec<Filter>,
    /// Bumped on every view switch; responses for older generations are dropped
    generation: u64,
    /// Cancels the config fetch of the view being loaded
    view_fetch: Option<CancellationToken>,
    /// Assigned users per record, valid until the next load
    assignees: HashMap<RecordId, Vec<AssignedUser>>,
}

/// View engine over one logical table
pub struct TableViewEngine {
    api: Arc<dyn TableApi>,
    table_id: TableId,
    config: EngineConfig,
    state: RwLock<EngineState>,
    default_view_in_flight: AtomicBool,
}

impl TableViewEngine {
    /// Create an engine with empty stores; call [`load`](Self::load) next
    pub fn new(api: Arc<dyn TableApi>, table_id: TableId, config: EngineConfig) -> Self {
        let page = PageRequest::first(config.page_size);
        Self::with_stores(
            api,
            config,
            SchemaStore::new(table_id),
            RecordStore::new(table_id, page),
            ViewRegistry::new(table_id),
        )
    }

    /// Create an engine over stores built by the caller
    pub fn with_stores(
        api: Arc<dyn TableApi>,
        config: EngineConfig,
        schema: SchemaStore,
        records: RecordStore,
        views: ViewRegistry,
    ) -> Self {
        let table_id = schema.table_id();
        TableViewEngine {
            api,
            table_id,
            config,
            state: RwLock::new(EngineState {
                schema,
                records,
                views,
                view_state: ViewState::NoViewSelected,
                base_filter: Vec::new(),
                generation: 0,
                view_fetch: None,
                assignees: HashMap::new(),
            }),
            default_view_in_flight: AtomicBool::new(false),
        }
    }

    /// Table the engine works on
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current columns of the table
    pub async fn columns(&self) -> Vec<Column> {
        self.state.read().await.schema.columns().to_vec()
    }

    /// Current state of the active view
    pub async fn view_state(&self) -> ViewState {
        self.state.read().await.view_state.clone()
    }

    /// Set the constant filter of the embedding context
    ///
    /// It is matched against raw record values, before foreign key display
    /// text, and ANDed with the view's filters.
    pub async fn set_base_filter(&self, filters: Vec<Filter>) {
        self.state.write().await.base_filter = filters;
    }

    /// Load schema, records and views, then select a view
    ///
    /// The three fetches run concurrently. A failed fetch leaves its store
    /// empty and is reported in the returned [`LoadReport`]. When the table
    /// has columns but no views the default view is created. The previously
    /// active view stays selected if it still exists, otherwise the first
    /// view is selected.
    pub async fn load(&self) -> LoadReport {
        let page = self.state.read().await.records.page();
        let table_id = self.table_id;

        let (schema, records, views) = tokio::join!(
            self.api.fetch_structure(table_id),
            self.api.fetch_records(table_id, page),
            self.api.list_views(table_id),
        );

        let mut report = LoadReport::default();

        let columns = match schema {
            Ok(columns) => Some(columns),
            Err(e) => {
                warn!("Table {}: structure could not be loaded: {}", table_id, e);
                report.errors.push(EngineError::SchemaLoad(e));
                None
            }
        };

        let page = match records {
            Ok(page) => {
                let total = page.total;
                let resolution = self
                    .resolve_foreign_keys(columns.as_deref().unwrap_or(&[]), page.records)
                    .await;
                report.errors.extend(resolution.errors);
                Ok((resolution.records, total))
            }
            Err(e) => Err(e),
        };

        {
            let mut guard = self.state.write().await;
            let state = &mut *guard;

            match columns {
                Some(columns) => state.schema.replace(columns),
                None => state.schema.mark_failed("structure request failed"),
            }

            match page {
                Ok((rows, total)) => state.records.replace(rows, total),
                Err(e) => {
                    warn!("Table {}: records could not be loaded: {}", table_id, e);
                    state.records.mark_failed(e.to_string());
                    report.errors.push(EngineError::RecordLoad(e));
                }
            }

            match views {
                Ok(views) => state.views.replace(views),
                Err(e) => {
                    warn!("Table {}: views could not be loaded: {}", table_id, e);
                    state.views.mark_failed(e.to_string());
                    report.errors.push(EngineError::ViewConfig(e.to_string()));
                }
            }

            state.assignees.clear();
        }

        if let Err(e) = self.ensure_default_view().await {
            report.errors.push(e);
        }

        let target = {
            let state = self.state.read().await;
            let current = match &state.view_state {
                ViewState::Loading { view_id } => Some(*view_id),
                other => other.active().map(|a| a.view_id()),
            };
            current
                .filter(|id| state.views.get(*id).is_some())
                .or_else(|| state.views.first().map(|v| v.id))
        };

        match target {
            Some(view_id) => match self.select_view(view_id).await {
                Ok(ViewSelection::Degraded(e)) => report.errors.push(e),
                Ok(_) => {}
                Err(e) => report.errors.push(e),
            },
            None => {
                self.state.write().await.view_state = ViewState::NoViewSelected;
            }
        }

        info!(
            "Table {}: load finished with {} degraded reads",
            table_id,
            report.errors.len()
        );
        report
    }

    /// Fetch the current page again and replace the record store
    ///
    /// On failure the store is left empty and the error is returned.
    /// Foreign key errors are logged and do not fail the reload.
    pub async fn reload_records(&self) -> Result<()> {
        let page = self.state.read().await.records.page();
        debug!("Table {}: reloading page {}", self.table_id, page.page);

        match self.api.fetch_records(self.table_id, page).await {
            Ok(fetched) => {
                let columns = self.columns().await;
                let resolution = self.resolve_foreign_keys(&columns, fetched.records).await;
                let mut state = self.state.write().await;
                state.records.replace(resolution.records, fetched.total);
                state.assignees.clear();
                Ok(())
            }
            Err(e) => {
                warn!("Table {}: records could not be reloaded: {}", self.table_id, e);
                self.state.write().await.records.mark_failed(e.to_string());
                Err(EngineError::RecordLoad(e))
            }
        }
    }

    /// Change page and page size, then reload records
    pub async fn set_page(&self, page: u32, page_size: u32) -> Result<()> {
        let request = PageRequest::new(page, page_size);
        self.state.write().await.records.set_page(request);
        self.reload_records().await
    }

    /// Table of the active view
    ///
    /// `None` until both schema and records have settled (loaded or
    /// failed), and while a selected view's configuration is still being
    /// fetched. Rows go through the base filter, the view's filters and
    /// session filters, then the sort chain. With no view selected every
    /// column is shown in schema order, unfiltered and unsorted.
    pub async fn render(&self) -> Option<TableView> {
        let state = self.state.read().await;
        if !state.schema.status().is_settled() || !state.records.status().is_settled() {
            return None;
        }
        if let ViewState::Loading { view_id } = state.view_state {
            debug!("Table {}: view {} still loading, nothing to render", self.table_id, view_id);
            return None;
        }

        let columns = state.schema.columns();
        let active = state.view_state.active();

        let (view, projection, filters, chain) = match active {
            Some(active) => {
                let config = &active.config;
                let mut filters = active_filters(columns, &config.filters);
                filters.extend(active.session_filters.iter().cloned());
                let chain = sort_chain(
                    columns,
                    &config.view,
                    &config.sorts,
                    self.config.legacy_sort_fallback,
                );
                (
                    Some(config.view.clone()),
                    Projection::build(columns, &config.layouts),
                    filters,
                    chain,
                )
            }
            None => (None, Projection::build(columns, &[]), Vec::new(), Vec::new()),
        };

        let base: Vec<ResolvedRecord> = state
            .records
            .records()
            .iter()
            .filter(|r| matches_all(&r.raw_data, &state.base_filter, columns))
            .cloned()
            .collect();
        let filtered = apply_filters(&base, &filters, columns);
        let rows = sort_records(&filtered, &chain);

        Some(TableView {
            view,
            columns: projection.visible_columns(),
            column_visibility: projection.column_visibility(),
            ordered_column_names: projection.ordered_column_names(),
            active_filters: filters,
            sort_chain: chain,
            rows,
            total: state.records.total(),
        })
    }

    /// Whether schema and records are both loaded without error
    pub async fn is_loaded(&self) -> bool {
        let state = self.state.read().await;
        *state.schema.status() == LoadStatus::Loaded && *state.records.status() == LoadStatus::Loaded
    }

    async fn resolve_foreign_keys(&self, columns: &[Column], records: Vec<Record>) -> Resolution {
        if !self.config.resolve_foreign_keys {
            return Resolution {
                records: records.into_iter().map(ResolvedRecord::unresolved).collect(),
                errors: Vec::new(),
            };
        }
        ForeignKeyResolver::new(self.api.as_ref()).resolve(columns, records).await
    }
}
