//! Client settings
//!
//! Settings are layered: an optional TOML/JSON/YAML file first, then
//! `ERP_VIEWS__*` environment variables (a `.env` file in the working
//! directory is read into the environment beforehand). Nested engine
//! options use a double underscore, e.g. `ERP_VIEWS__ENGINE__PAGE_SIZE=25`.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use erp_views_core::EngineConfig;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Prefix of the environment variables read into the settings
pub const ENV_PREFIX: &str = "ERP_VIEWS";

/// Settings of the HTTP client and the engine it drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the backend
    pub base_url: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Bearer token for the backend
    pub auth_token: Option<String>,

    /// Engine options
    pub engine: EngineConfig,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
            auth_token: None,
            engine: EngineConfig::default(),
        }
    }
}

impl ClientSettings {
    /// Load settings from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings: ClientSettings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML document, without the environment layer
    pub fn from_toml(source: &str) -> Result<Self> {
        let settings: ClientSettings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::Other(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Other(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.engine
            .validate()
            .map_err(|e| ClientError::Other(e.to_string()))
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_toml_settings() {
        let settings = ClientSettings::from_toml(
            r#"
base_url = "https://erp.example.com"
request_timeout_secs = 5
auth_token = "secret"

[engine]
page_size = 25
resolve_foreign_keys = false
log_level = "erp_views_core=debug"
"#,
        )
        .unwrap();

        assert_eq!(settings.base_url, "https://erp.example.com");
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.auth_token.as_deref(), Some("secret"));
        assert_eq!(settings.engine.page_size, 25);
        assert!(!settings.engine.resolve_foreign_keys);
        assert_eq!(settings.engine.log_level, "erp_views_core=debug");
        assert_eq!(settings.engine.default_view_name, "Vista General");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings = ClientSettings::from_toml("").unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ClientSettings::from_toml(r#"base_url = "erp.example.com""#).is_err());
        assert!(ClientSettings::from_toml("request_timeout_secs = 0").is_err());
        assert!(ClientSettings::from_toml("[engine]\npage_size = 0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "base_url = \"http://127.0.0.1:9000\"").unwrap();
        writeln!(file, "[engine]").unwrap();
        writeln!(file, "page_size = 15").unwrap();

        let settings = ClientSettings::load(Some(file.path())).unwrap();

        assert_eq!(settings.base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.engine.page_size, 15);
    }

    #[test]
    fn test_missing_file_is_settings_error() {
        let result = ClientSettings::load(Some(Path::new("/nonexistent/erp-views.toml")));
        assert!(matches!(result, Err(ClientError::Settings(_))));
    }
}
