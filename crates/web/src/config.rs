//! Application configuration.
//!
//! The configuration decides how request paths are normalized before matching, how many
//! contexts the pool keeps around, and a few response defaults. It can be built in code
//! through [`AppBuilder`](crate::AppBuilder) or loaded from JSON:
//!
//! ```
//! use micro_app::Config;
//!
//! let config = Config::from_json_str(r#"{ "case_sensitive": true, "ctx_pool_capacity": 64 }"#).unwrap();
//! assert!(config.case_sensitive);
//! assert!(!config.strict_routing);
//! assert_eq!(config.ctx_pool_capacity, 64);
//! ```

use serde::Deserialize;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CTX_POOL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name reported in logs.
    pub app_name: String,

    /// When disabled, `/Foo` and `/foo` resolve to the same route.
    pub case_sensitive: bool,

    /// When disabled, `/foo/` and `/foo` resolve to the same route.
    pub strict_routing: bool,

    /// Maximum number of released contexts kept for reuse.
    pub ctx_pool_capacity: usize,

    /// Value of the `Server` header added to every response.
    pub server_header: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            case_sensitive: false,
            strict_routing: false,
            ctx_pool_capacity: DEFAULT_CTX_POOL_CAPACITY,
            server_header: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("read config error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl Config {
    /// # Errors
    /// Fails when the input is not a valid config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    /// Fails when the file cannot be read or is not a valid config document.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.case_sensitive);
        assert!(!config.strict_routing);
        assert_eq!(config.ctx_pool_capacity, DEFAULT_CTX_POOL_CAPACITY);
        assert!(config.server_header.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json_str(r#"{"app_name": "demo", "server_header": "micro"}"#).unwrap();
        assert_eq!(config.app_name, "demo");
        assert_eq!(config.server_header.as_deref(), Some("micro"));
        assert_eq!(config.ctx_pool_capacity, DEFAULT_CTX_POOL_CAPACITY);
    }

    #[test]
    fn test_invalid_json() {
        let result = Config::from_json_str(r#"{"strict_routing": "yes"}"#);
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
