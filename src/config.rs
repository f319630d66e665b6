//! Engine configuration loaded from TOML.
//!
//! ```toml
//! [query]
//! schema = "v1"
//! max_top = 200
//! default_top = 100
//! strict_schema = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings shared by the builder and the engine facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Database schema that qualifies every table name.
    pub schema: Option<String>,
    /// Row limit of expansions that carry no `$top`.
    pub max_top: u64,
    /// Root `$top` used when the request has none.
    pub default_top: Option<u64>,
    /// Reject unknown properties, functions and relations instead of
    /// degrading with a warning.
    pub strict_schema: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            schema: None,
            max_top: 200,
            default_top: None,
            strict_schema: false,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    query: EngineConfig,
}

impl EngineConfig {
    /// Parses a TOML document; a missing `[query]` table yields defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<RawConfig>(contents).map(|raw| raw.query)
    }

    /// Reads and parses the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Renders the configuration back into the `[query]` table layout.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&RawConfig {
            query: self.clone(),
        })
        .map_err(|source| ConfigError::Serialize { source })
    }
}

/// Failures while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read engine config {path}: {source}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML or has mistyped keys.
    #[error("failed to parse engine config {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// The configuration could not be rendered.
    #[error("failed to serialize engine config: {source}")]
    Serialize {
        /// Underlying TOML error.
        source: toml::ser::Error,
    },
}

impl ConfigError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "ConfigRead",
            ConfigError::Parse { .. } => "ConfigParse",
            ConfigError::Serialize { .. } => "ConfigSerialize",
        }
    }
}
