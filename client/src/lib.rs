//! Client library for the ERP logical-table view engine
//!
//! This library provides [`HttpTableApi`], the REST implementation of the
//! engine's `TableApi`, and the layered [`ClientSettings`] used by the
//! `erp-views` command-line tool.

pub mod error;
pub mod http;
pub mod settings;

pub use error::{ClientError, Result};
pub use http::HttpTableApi;
pub use settings::ClientSettings;
