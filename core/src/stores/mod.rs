//! Client-side caches of a table's schema and current record page
//!
//! Both stores are plain data: the engine loads them through the
//! [`TableApi`](crate::api::TableApi) and replaces them wholesale, they never
//! talk to the backend themselves.

mod records;
mod schema;

pub use records::RecordStore;
pub use schema::SchemaStore;

/// Load state of a store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Never loaded
    #[default]
    NotLoaded,

    /// Last load succeeded
    Loaded,

    /// Last load failed; the store holds an empty-but-valid state
    Failed(String),
}

impl LoadStatus {
    /// Whether a load has completed, successfully or not
    pub fn is_settled(&self) -> bool {
        !matches!(self, LoadStatus::NotLoaded)
    }
}
