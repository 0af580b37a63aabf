//! Studio configuration.
//!
//! Handles loading, validating, and merging `shotflow.toml`. User files are
//! sparse: every value they leave out falls back to the stock default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [generation]
//! stages = ["analysis", "background-removal", "model-synthesis", "composite", "enhance"]
//! tick_interval_ms = 2000   # Time spent on each stage
//! artifact_count = 4        # Images produced by one generation run
//! artifact_url_template = "https://render.shotflow.local/jobs/{job}/{index}.png"
//!
//! [catalog]
//! model_types = ["female", "male", "child", "mannequin"]
//! backgrounds = ["studio-white", "urban", "nature", "interior"]
//! styles = ["minimal", "editorial", "lifestyle", "luxury"]
//! lighting = ["soft", "natural", "dramatic", "golden-hour"]
//!
//! [export]
//! format = "png"            # png | jpeg | webp
//! resolution = "original"   # original | 2k | 4k
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{ExportFormat, Resolution};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Largest artifact batch a single generation run may produce.
pub const MAX_ARTIFACT_COUNT: usize = 16;

/// Studio configuration loaded from `shotflow.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    /// Simulated generation job settings.
    pub generation: GenerationConfig,
    /// Style facet option lists.
    pub catalog: CatalogConfig,
    /// Export defaults.
    pub export: ExportConfig,
}

impl StudioConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;
        if generation.stages.is_empty() {
            return Err(ConfigError::Validation(
                "generation.stages must not be empty".into(),
            ));
        }
        if generation.stages.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "generation.stages must not contain blank names".into(),
            ));
        }
        if generation.tick_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "generation.tick_interval_ms must be positive".into(),
            ));
        }
        if generation.artifact_count == 0 || generation.artifact_count > MAX_ARTIFACT_COUNT {
            return Err(ConfigError::Validation(format!(
                "generation.artifact_count must be 1-{MAX_ARTIFACT_COUNT}"
            )));
        }
        if !generation.artifact_url_template.contains("{index}") {
            return Err(ConfigError::Validation(
                "generation.artifact_url_template must contain {index}".into(),
            ));
        }
        Ok(())
    }
}

/// Simulated generation job settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Ordered names of the job's processing steps.
    pub stages: Vec<String>,
    /// Length of one step, in milliseconds.
    pub tick_interval_ms: u64,
    /// Number of artifacts a finished job yields.
    pub artifact_count: usize,
    /// URL pattern for produced artifacts; `{job}` and `{index}` are substituted.
    pub artifact_url_template: String,
}

impl GenerationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            stages: [
                "analysis",
                "background-removal",
                "model-synthesis",
                "composite",
                "enhance",
            ]
            .map(String::from)
            .to_vec(),
            tick_interval_ms: 2000,
            artifact_count: 4,
            artifact_url_template: "https://render.shotflow.local/jobs/{job}/{index}.png"
                .to_string(),
        }
    }
}

/// Option lists offered for each style facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub model_types: Vec<String>,
    pub backgrounds: Vec<String>,
    pub styles: Vec<String>,
    pub lighting: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            model_types: ["female", "male", "child", "mannequin"]
                .map(String::from)
                .to_vec(),
            backgrounds: ["studio-white", "urban", "nature", "interior"]
                .map(String::from)
                .to_vec(),
            styles: ["minimal", "editorial", "lifestyle", "luxury"]
                .map(String::from)
                .to_vec(),
            lighting: ["soft", "natural", "dramatic", "golden-hour"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Defaults for the download screen's export batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub resolution: Resolution,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(StudioConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `stages` list replaces the stock list rather than extending it.
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
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but
/// is not valid TOML.
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
) -> Result<StudioConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StudioConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged over stock defaults and validated.
///
/// A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<StudioConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `shotflow.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# shotflow configuration
# ======================
# Every key is optional. Values left out fall back to the defaults shown.

[generation]
# Ordered processing steps of a generation run. Progress advances one
# step per tick; after the last step the run spends one more tick
# finalizing before its images are available.
stages = ["analysis", "background-removal", "model-synthesis", "composite", "enhance"]

# Duration of a single step, in milliseconds.
tick_interval_ms = 2000

# Number of images a finished run produces (1-16).
artifact_count = 4

# URL pattern for produced images. {job} is the run id, {index} the
# zero-based image number.
artifact_url_template = "https://render.shotflow.local/jobs/{job}/{index}.png"

[catalog]
# Options offered for each of the four required style facets.
model_types = ["female", "male", "child", "mannequin"]
backgrounds = ["studio-white", "urban", "nature", "interior"]
styles = ["minimal", "editorial", "lifestyle", "luxury"]
lighting = ["soft", "natural", "dramatic", "golden-hour"]

[export]
# Default file format for downloads: png, jpeg or webp.
format = "png"

# Default download resolution: original, 2k or 4k.
resolution = "original"
"##
}
