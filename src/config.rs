//! Server configuration, read from an optional TOML file.

use crate::path::expand_tilde;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Number of parsed mapping files kept in memory
    pub cache_capacity: NonZeroUsize,

    /// Document viewers are registered for when they do not name one
    pub document: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cache_capacity: crate::cache::DEFAULT_CAPACITY,
            document: None,
        }
    }
}

impl Config {
    /// Load `path` (`~` is expanded), or the defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let path = PathBuf::from(expand_tilde(path).as_ref());
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config: Self =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        // A relative document is relative to the config file.
        if let Some(document) = config.document.take() {
            let document = PathBuf::from(expand_tilde(&document.to_string_lossy()).as_ref());
            config.document = Some(match path.parent() {
                Some(dir) if document.is_relative() => dir.join(document),
                _ => document,
            });
        }
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn document(&self) -> Option<&Path> {
        self.document.as_deref()
    }
}
