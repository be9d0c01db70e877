//! # ERP Views Core
//!
//! View engine for the logical tables of the ERP administration console.
//! Given a table's columns, a page of its records and the table's named
//! views, this crate produces the ordered, filtered, foreign-key-resolved
//! rows to render, and keeps view configuration editable through the
//! external CRUD API described by [`TableApi`].

#![forbid(unsafe_code)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod foreign;
pub mod models;
pub mod sort;
pub mod stores;
pub mod views;

#[cfg(test)]
mod test_support;

/// Re-export common types for ease of use
pub use api::TableApi;
pub use batch::{BatchFailure, BatchOutcome};
pub use config::EngineConfig;
pub use engine::{LoadReport, TableView, TableViewEngine, ViewSelection};
pub use error::{ApiError, ApiResult, EngineError, Result};
pub use models::{Column, DataType, Filter, FilterCondition, Record, SortDirection, SortKey, View};

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_manifest() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!VERSION.is_empty());
    }
}
