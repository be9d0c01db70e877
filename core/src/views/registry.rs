//! Views of a table and the configuration of the active one

use log::{debug, warn};

use crate::models::{
    ColumnFilter, ColumnId, ColumnLayout, SortRecord, TableId, View, ViewColumnEntry,
    ViewColumnRecord, ViewId,
};
use crate::stores::LoadStatus;

/// Layout entries, filter entries and sort entries of one view
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    /// The view itself
    pub view: View,

    /// At most one layout per column
    pub layouts: Vec<ColumnLayout>,

    /// Persisted filters, any number per column
    pub filters: Vec<ColumnFilter>,

    /// Sort entries ordered by priority
    pub sorts: Vec<SortRecord>,
}

impl ViewConfig {
    /// Configuration with no entries: every column visible in schema order,
    /// no filters and no sort
    pub fn unconfigured(view: View) -> Self {
        ViewConfig {
            view,
            layouts: Vec::new(),
            filters: Vec::new(),
            sorts: Vec::new(),
        }
    }

    /// Build the configuration from wire records
    ///
    /// Entries of other views are ignored. When a column has more than one
    /// layout entry the one with the lowest id wins.
    pub fn from_records(view: View, entries: Vec<ViewColumnRecord>, sorts: Vec<SortRecord>) -> Self {
        let mut config = Self::unconfigured(view);

        let mut entries = entries;
        entries.sort_by_key(|e| e.id);

        for record in entries {
            if record.view_id != config.view.id {
                warn!(
                    "View {}: ignoring view column {} that belongs to view {}",
                    config.view.id, record.id, record.view_id
                );
                continue;
            }

            match ViewColumnEntry::from(record) {
                ViewColumnEntry::Layout(layout) => {
                    if config.layout_for(layout.column_id).is_some() {
                        warn!(
                            "View {}: duplicate layout {} for column {} ignored",
                            config.view.id, layout.id, layout.column_id
                        );
                        continue;
                    }
                    config.layouts.push(layout);
                }
                ViewColumnEntry::Filter(filter) => config.filters.push(filter),
            }
        }

        let mut sorts: Vec<SortRecord> = sorts
            .into_iter()
            .filter(|s| s.view_id == config.view.id)
            .collect();
        sorts.sort_by_key(|s| (s.position, s.id));
        config.sorts = sorts;

        debug!(
            "View {}: {} layouts, {} filters, {} sorts",
            config.view.id,
            config.layouts.len(),
            config.filters.len(),
            config.sorts.len()
        );
        config
    }

    /// Layout entry of a column
    pub fn layout_for(&self, column_id: ColumnId) -> Option<&ColumnLayout> {
        self.layouts.iter().find(|l| l.column_id == column_id)
    }

    /// Insert or replace the layout entry of its column
    pub fn upsert_layout(&mut self, layout: ColumnLayout) {
        match self.layouts.iter_mut().find(|l| l.column_id == layout.column_id) {
            Some(existing) => *existing = layout,
            None => self.layouts.push(layout),
        }
    }

    /// Drop every entry that references a column not accepted by `exists`
    ///
    /// Returns how many entries were dropped.
    pub fn retain_columns(&mut self, exists: impl Fn(ColumnId) -> bool) -> usize {
        let before = self.layouts.len() + self.filters.len() + self.sorts.len();
        self.layouts.retain(|l| exists(l.column_id));
        self.filters.retain(|f| exists(f.column_id));
        self.sorts.retain(|s| exists(s.column_id));
        before - (self.layouts.len() + self.filters.len() + self.sorts.len())
    }
}

/// Named views of one logical table
#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    table_id: TableId,
    views: Vec<View>,
    status: LoadStatus,
}

impl ViewRegistry {
    /// Create an empty, not yet loaded registry
    pub fn new(table_id: TableId) -> Self {
        ViewRegistry {
            table_id,
            views: Vec::new(),
            status: LoadStatus::NotLoaded,
        }
    }

    /// Table the views belong to
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Load state
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Replace all views after a successful fetch
    pub fn replace(&mut self, views: Vec<View>) {
        let table_id = self.table_id;
        self.views = views.into_iter().filter(|v| v.table_id == table_id).collect();
        self.views.sort_by_key(|v| (v.position, v.id));
        self.status = LoadStatus::Loaded;
    }

    /// Record a failed fetch
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.views.clear();
        self.status = LoadStatus::Failed(reason.into());
    }

    /// Views ordered by position
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Whether the table has no views
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Look up a view
    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    /// View shown when nothing else is selected
    pub fn first(&self) -> Option<&View> {
        self.views.first()
    }

    /// Position for a new view, after every existing one
    pub fn next_position(&self) -> i64 {
        self.views.iter().map(|v| v.position + 1).max().unwrap_or(0)
    }

    /// Insert or replace a view confirmed by the backend
    pub fn upsert(&mut self, view: View) {
        match self.views.iter_mut().find(|v| v.id == view.id) {
            Some(existing) => *existing = view,
            None => self.views.push(view),
        }
        self.views.sort_by_key(|v| (v.position, v.id));
    }

    /// Remove a view deleted on the backend
    pub fn remove(&mut self, id: ViewId) -> Option<View> {
        let index = self.views.iter().position(|v| v.id == id)?;
        Some(self.views.remove(index))
    }
}
