//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `artgraph.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it overrides.
//!
//! ## Config File Location
//!
//! ```text
//! data/
//! ├── artgraph.toml            # Optional (overrides stock defaults)
//! ├── artists.yaml
//! ├── characters/characters.yaml
//! └── art/*.gallery
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! public_dir = "static/_"   # Content-addressed output, relative to the data root
//! url_prefix = "/_"         # Public URL prefix of the output directory
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early. Command-line flags
//! override the data root and the public directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name within the data root.
pub const CONFIG_FILENAME: &str = "artgraph.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `artgraph.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtgraphConfig {
    /// Output directory for derivatives, relative to the data root unless
    /// absolute.
    pub public_dir: String,
    /// URL prefix under which `public_dir` is served.
    pub url_prefix: String,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for ArtgraphConfig {
    fn default() -> Self {
        Self {
            public_dir: "static/_".to_string(),
            url_prefix: "/_".to_string(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ArtgraphConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.public_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "public_dir must not be empty".into(),
            ));
        }
        if !(self.url_prefix.starts_with('/') || self.url_prefix.contains("://")) {
            return Err(ConfigError::Validation(
                "url_prefix must start with '/' or be an absolute URL".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Output directory resolved against the data root.
    pub fn public_dir_in(&self, data_root: &Path) -> PathBuf {
        let dir = Path::new(&self.public_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            data_root.join(dir)
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers and concurrent transcodes.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ArtgraphConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `artgraph.toml` from the data root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(data_root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = data_root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ArtgraphConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ArtgraphConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the data root, merged over stock defaults.
pub fn load_config(data_root: &Path) -> Result<ArtgraphConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(data_root)?)
}

/// Returns a fully-commented stock `artgraph.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# artgraph configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Place this file at the root of the data directory as `artgraph.toml`.

# Output directory for content-addressed derivatives (one directory per
# source content hash). Relative paths are resolved against the data root.
# The directory is excluded from the content fingerprint.
public_dir = "static/_"

# URL prefix under which public_dir is served. Every asset URL in the
# resolved model is "<url_prefix>/<hash>/<file>".
url_prefix = "/_"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers; also the number of concurrent transcodes.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ArtgraphConfig::default();
        assert_eq!(config.public_dir, "static/_");
        assert_eq!(config.url_prefix, "/_");
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).unwrap(), ArtgraphConfig::default());
    }

    #[test]
    fn load_config_merges_partial_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "url_prefix = \"https://cdn.example/_\"\n\n[processing]\nmax_processes = 2\n",
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.url_prefix, "https://cdn.example/_");
        assert_eq!(config.processing.max_processes, Some(2));
        // Unspecified values are defaults
        assert_eq!(config.public_dir, "static/_");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "public_directory = \"out\"\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "public_dir = [").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let relative_prefix = ArtgraphConfig {
            url_prefix: "assets".into(),
            ..Default::default()
        };
        assert!(matches!(relative_prefix.validate(), Err(ConfigError::Validation(_))));

        let zero_workers = ArtgraphConfig {
            processing: ProcessingConfig {
                max_processes: Some(0),
            },
            ..Default::default()
        };
        assert!(zero_workers.validate().is_err());

        let empty_dir = ArtgraphConfig {
            public_dir: " ".into(),
            ..Default::default()
        };
        assert!(empty_dir.validate().is_err());
    }

    #[test]
    fn public_dir_resolves_against_data_root() {
        let config = ArtgraphConfig::default();
        assert_eq!(
            config.public_dir_in(Path::new("/data")),
            Path::new("/data/static/_")
        );
        let absolute = ArtgraphConfig {
            public_dir: "/srv/public".into(),
            ..Default::default()
        };
        assert_eq!(absolute.public_dir_in(Path::new("/data")), Path::new("/srv/public"));
    }

    #[test]
    fn merge_toml_overlays_nested_tables() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[processing]\nmax_processes = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["processing"]["max_processes"].as_integer(), Some(3));
        assert_eq!(merged["url_prefix"].as_str(), Some("/_"));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: ArtgraphConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ArtgraphConfig::default());
    }

    #[test]
    fn effective_threads_never_exceeds_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        let capped = ProcessingConfig {
            max_processes: Some(cores + 10),
        };
        assert_eq!(effective_threads(&capped), cores);
        let one = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&one), 1);
    }
}
