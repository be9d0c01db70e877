//! Column definitions of one logical table

use log::{debug, warn};

use crate::models::{Column, ColumnId, TableId};

use super::LoadStatus;

/// Schema of a logical table as last fetched
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    table_id: TableId,
    columns: Vec<Column>,
    status: LoadStatus,
}

impl SchemaStore {
    /// Create an empty, not yet loaded store
    pub fn new(table_id: TableId) -> Self {
        SchemaStore {
            table_id,
            columns: Vec::new(),
            status: LoadStatus::NotLoaded,
        }
    }

    /// Create a loaded store from known columns
    pub fn with_columns(table_id: TableId, columns: Vec<Column>) -> Self {
        let mut store = Self::new(table_id);
        store.replace(columns);
        store
    }

    /// Table the schema belongs to
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Load state
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Replace the columns after a successful fetch
    ///
    /// Columns whose name repeats an earlier column are dropped: records are
    /// keyed by column name, so a duplicate could never be told apart.
    pub fn replace(&mut self, columns: Vec<Column>) {
        let mut unique: Vec<Column> = Vec::with_capacity(columns.len());
        for column in columns {
            if unique.iter().any(|c| c.name == column.name) {
                warn!(
                    "Table {}: dropping column {} with duplicate name '{}'",
                    self.table_id, column.id, column.name
                );
                continue;
            }
            unique.push(column);
        }

        debug!("Table {}: schema holds {} columns", self.table_id, unique.len());
        self.columns = unique;
        self.status = LoadStatus::Loaded;
    }

    /// Record a failed fetch, leaving an empty schema
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.columns.clear();
        self.status = LoadStatus::Failed(reason.into());
    }

    /// Columns in schema order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Whether the table has any columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column by id
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Look up a column by name
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Name of a column, if it exists
    pub fn column_name(&self, id: ColumnId) -> Option<&str> {
        self.column(id).map(|c| c.name.as_str())
    }

    /// Columns that reference another table
    pub fn foreign_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.referenced_table().is_some())
    }
}
