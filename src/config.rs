//! Engine configuration
//!
//! Controls how expressions are rendered to SQL and the default for the
//! namesake lineage check. Loaded from JSON; every field has a default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for config loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Config file could not be read or parsed
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration for SQL emission and operator defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quote character for identifiers (default: backtick)
    #[serde(default = "default_identifier_quote")]
    pub identifier_quote: char,

    /// Prefix for derived-table aliases (default: "$")
    #[serde(default = "default_alias_prefix")]
    pub subquery_alias_prefix: String,

    /// Lineage check used by `join_in` and `restrict_in`; `join` and
    /// `restrict` always check
    #[serde(default = "default_semantic_check")]
    pub semantic_check: bool,
}

fn default_identifier_quote() -> char {
    '`'
}

fn default_alias_prefix() -> String {
    "$".to_string()
}

fn default_semantic_check() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identifier_quote: default_identifier_quote(),
            subquery_alias_prefix: default_alias_prefix(),
            semantic_check: default_semantic_check(),
        }
    }
}

impl EngineConfig {
    /// Config that quotes identifiers with double quotes (ANSI style)
    pub fn ansi() -> Self {
        Self {
            identifier_quote: '"',
            ..Self::default()
        }
    }

    /// Parse a config from a JSON string
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<config>".to_string(),
            source: e,
        })
    }

    /// Load a config from a JSON file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Quote an identifier, doubling any embedded quote character
    pub fn quote(&self, name: &str) -> String {
        let q = self.identifier_quote;
        let mut out = String::with_capacity(name.len() + 2);
        out.push(q);
        for c in name.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }
}
