//! Application configuration.
//!
//! Handles loading, validating, and merging `resort.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top, so the file
//! only needs the keys it changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! media_root = "media"          # Uploaded originals and derived variants
//! media_url = "/media/"         # URL prefix for files under media_root
//! cache_dir = "CACHE/images"    # Derived variants, relative to media_root
//!
//! [database]
//! path = "resort.db"            # SQLite database file
//!
//! [images]
//! placeholder_quality = 50      # WebP quality of inline placeholders (1-100)
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "resort.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `resort.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Media root, URL prefix and variant cache location.
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    /// Placeholder encoding settings.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = self.images.placeholder_quality;
        if !(1..=100).contains(&q) {
            return Err(ConfigError::Validation(
                "images.placeholder_quality must be 1-100".into(),
            ));
        }
        if !self.storage.media_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "storage.media_url must end with '/'".into(),
            ));
        }
        let cache = Path::new(&self.storage.cache_dir);
        if self.storage.cache_dir.trim().is_empty()
            || cache
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ConfigError::Validation(
                "storage.cache_dir must be a relative path inside media_root".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding uploads and the variant cache.
    pub media_root: PathBuf,
    /// URL prefix for stored files. Must end with `/`.
    pub media_url: String,
    /// Variant cache directory, relative to `media_root`.
    pub cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("media"),
            media_url: "/media/".to_string(),
            cache_dir: "CACHE/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("resort.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// WebP quality of inline placeholders (1 = worst, 100 = best).
    pub placeholder_quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            placeholder_quality: 50,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
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
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// A missing file yields the stock defaults. Unknown keys are rejected and
/// the result is validated.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `resort.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Resort Content Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.

# ---------------------------------------------------------------------------
# Media storage
# ---------------------------------------------------------------------------
[storage]
# Directory holding uploaded originals and derived image variants.
media_root = "media"
# URL prefix under which media_root is served. Must end with "/".
media_url = "/media/"
# Where derived variants are written, relative to media_root.
# Everything in here can be deleted; it is rebuilt on demand.
cache_dir = "CACHE/images"

# ---------------------------------------------------------------------------
# Database
# ---------------------------------------------------------------------------
[database]
# SQLite database file. Created by `resort-content init`.
path = "resort.db"

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# WebP quality (1-100) of the inline base64 placeholders served as
# <field>_placeholder_base64.
placeholder_quality = 50

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for process-images / regenerate-variants.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
