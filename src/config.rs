//! Run configuration.
//!
//! Handles loading, validating, and layering `wikidown.toml`. Values are
//! resolved in three layers, later layers overriding earlier ones key by key:
//!
//! ```text
//! stock defaults  →  wikidown.toml (or --config FILE)  →  CLI flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! method = "pandoc"         # "pandoc" or "godown"
//!
//! [normalize]
//! remove = []               # Literal strings deleted from every document
//!
//! [pandoc]
//! program = "pandoc"        # Executable used by the pandoc method
//! from = "html"             # Value passed to -r
//! to = "markdown"           # Value passed to -w
//! timeout_secs = 120        # Per-file limit, 0 disables it
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys and unknown method names are rejected so a typo cannot
//! silently select the wrong backend.

use crate::types::Method;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "wikidown.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full run configuration.
///
/// Read-only once resolved: every worker shares the same instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Conversion method for the whole run.
    pub method: Method,
    /// Markdown normalization settings.
    pub normalize: NormalizeConfig,
    /// Subprocess settings for the `pandoc` method.
    pub pandoc: PandocConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ConvertConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pandoc.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pandoc.program must not be empty".into(),
            ));
        }
        if self.pandoc.from.is_empty() || self.pandoc.to.is_empty() {
            return Err(ConfigError::Validation(
                "pandoc.from and pandoc.to must not be empty".into(),
            ));
        }
        if self.normalize.remove.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Validation(
                "normalize.remove must not contain empty strings".into(),
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

/// Markdown normalization settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Exact substrings removed from every converted document before the
    /// regex rules run (e.g. boilerplate footers the export adds to each page).
    pub remove: Vec<String>,
}

/// Settings for the external `pandoc` filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PandocConfig {
    /// Executable name or path.
    pub program: String,
    /// Input format (`-r`).
    pub from: String,
    /// Output format (`-w`).
    pub to: String,
    /// Per-file time limit in seconds; `0` means wait forever.
    pub timeout_secs: u64,
}

impl PandocConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Arguments passed to the program, in order.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-r".to_string(),
            self.from.clone(),
            "-w".to_string(),
            self.to.clone(),
        ]
    }
}

impl Default for PandocConfig {
    fn default() -> Self {
        Self {
            program: "pandoc".to_string(),
            from: "html".to_string(),
            to: "markdown".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of pages converted at once.
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
/// This is the base layer that file and CLI overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ConvertConfig::default()).expect("default config must serialize")
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
) -> Result<ConvertConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConvertConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Build the CLI layer from flags that were actually given.
///
/// Returns `None` when no flag overrides anything.
pub fn cli_overrides(method: Option<Method>, jobs: Option<usize>) -> Option<toml::Value> {
    let mut table = toml::Table::new();
    if let Some(method) = method {
        table.insert("method".into(), toml::Value::String(method.to_string()));
    }
    if let Some(jobs) = jobs {
        let mut processing = toml::Table::new();
        processing.insert(
            "max_processes".into(),
            toml::Value::Integer(i64::try_from(jobs).unwrap_or(i64::MAX)),
        );
        table.insert("processing".into(), toml::Value::Table(processing));
    }
    (!table.is_empty()).then_some(toml::Value::Table(table))
}

/// Load the run configuration.
///
/// `explicit` is the `--config` path, which must exist. Without it,
/// [`DEFAULT_CONFIG_FILE`] in `cwd` is used when present. `overrides` is the
/// CLI layer from [`cli_overrides`].
pub fn load_config(
    explicit: Option<&Path>,
    cwd: &Path,
    overrides: Option<toml::Value>,
) -> Result<ConvertConfig, ConfigError> {
    let file_layer = match explicit {
        Some(path) => {
            Some(load_raw_config(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?)
        }
        None => load_raw_config(&cwd.join(DEFAULT_CONFIG_FILE))?,
    };
    let base = match file_layer {
        Some(file) => merge_toml(stock_defaults_value(), file),
        None => stock_defaults_value(),
    };
    resolve_config(base, overrides)
}

/// Returns a fully-commented stock `wikidown.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# wikidown configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Precedence: stock defaults < this file < command-line flags.
# Unknown keys will cause an error.

# Conversion method for the whole run:
#   "pandoc" - pipe every page through the external pandoc filter
#   "godown" - convert in-process, no external tools needed
method = "pandoc"

# ---------------------------------------------------------------------------
# Markdown normalization
# ---------------------------------------------------------------------------
[normalize]
# Exact substrings deleted from every converted document, before any of the
# built-in cleanup rules run.
# Example: remove = ["Document generated by Confluence", "Powered by Atlassian"]
remove = []

# ---------------------------------------------------------------------------
# pandoc method
# ---------------------------------------------------------------------------
[pandoc]
# Executable name (looked up on PATH) or absolute path.
program = "pandoc"

# Formats passed as `-r <from> -w <to>`.
from = "html"
to = "markdown"

# Kill pandoc and fail the page if it runs longer than this. 0 = no limit.
timeout_secs = 120

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum pages converted in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
