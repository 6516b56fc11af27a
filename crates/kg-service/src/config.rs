//! Loading [`KgConfig`] from a TOML file.

use kg_types::KgConfig;
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "KG_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "kg.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Path from `KG_CONFIG`, else `kg.toml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Read and parse the file. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<KgConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(KgConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: display,
                source,
            })
        }
    };
    parse_config(&text).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

pub fn parse_config(text: &str) -> Result<KgConfig, toml::de::Error> {
    toml::from_str(text)
}
