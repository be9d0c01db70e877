//! Configuration for the view engine
//!
//! This module provides the options that shape how the engine loads and
//! renders a logical table (page size, default view naming, foreign key
//! resolution, the legacy sort fallback) and the default log filter.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::DEFAULT_VIEW_NAME;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Records fetched per page
    pub page_size: u32,

    /// Name of the view created for a table that has columns but no views
    pub default_view_name: String,

    /// Whether foreign key ids are replaced by display text on load
    pub resolve_foreign_keys: bool,

    /// Whether a view without sort entries falls back to its legacy
    /// `sort_by` / `sort_direction` fields
    pub legacy_sort_fallback: bool,

    /// Default `env_logger` filter when `RUST_LOG` is unset, e.g. `info`
    /// or `erp_views_core=debug`
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            page_size: 50,
            default_view_name: DEFAULT_VIEW_NAME.to_string(),
            resolve_foreign_keys: true,
            legacy_sort_fallback: true,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self, EngineError> {
        let file = std::fs::File::open(path)?;
        let config: EngineConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> Result<(), EngineError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.page_size == 0 {
            return Err(EngineError::Config("page_size must be at least 1".to_string()));
        }
        if self.default_view_name.trim().is_empty() {
            return Err(EngineError::Config("default_view_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config
    }

    /// Create a production configuration
    pub fn production() -> Self {
        let mut config = Self::default();
        config.log_level = "warn".to_string();
        config.page_size = 100;
        config
    }

    /// Create a testing configuration
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config.page_size = 10;
        config
    }
}
