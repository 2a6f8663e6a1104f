//! Toolkit Configuration - dataset, window, figure and baseline tunables as TOML values
//!
//! Each section implements `Default` with the values from [`super::defaults`],
//! so a missing or partial `wqdab.toml` behaves exactly like the built-ins.

use super::defaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "WQDAB_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "wqdab.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a toolkit run.
///
/// Load with `ToolkitConfig::load()` which searches:
/// 1. `$WQDAB_CONFIG` env var
/// 2. `./wqdab.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolkitConfig {
    /// Project layout overrides
    #[serde(default)]
    pub paths: PathsConfig,

    /// Dataset file and column names
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Anomaly window extraction
    #[serde(default)]
    pub windows: WindowConfig,

    /// Figure sizes and file naming
    #[serde(default)]
    pub plots: PlotConfig,

    /// Baseline scorer parameters
    #[serde(default)]
    pub baselines: BaselineConfig,
}

impl ToolkitConfig {
    /// Load configuration using the standard search order:
    /// 1. `$WQDAB_CONFIG` environment variable
    /// 2. `./wqdab.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded toolkit config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded toolkit config from ./{}", CONFIG_FILE_NAME);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", CONFIG_FILE_NAME);
                }
            }
        }

        info!("No {} found, using built-in defaults", CONFIG_FILE_NAME);
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys only produce warnings; parse and range errors are fatal.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Write the config to a file, e.g. to seed a project with the defaults.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Toolkit config saved");
        Ok(())
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Column names must be non-empty and the time and event columns distinct
    /// - Figure sizes, DPI, bin counts and panel counts must be positive
    /// - The window margin must not be negative
    /// - Baseline tree/sample/neighbour counts must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.dataset.file_name.trim().is_empty() {
            errors.push("dataset.file_name must not be empty".to_string());
        }
        if self.dataset.time_column.trim().is_empty() {
            errors.push("dataset.time_column must not be empty".to_string());
        }
        if self.dataset.event_column.trim().is_empty() {
            errors.push("dataset.event_column must not be empty".to_string());
        }
        if self.dataset.time_column == self.dataset.event_column {
            errors.push(format!(
                "dataset.time_column and dataset.event_column are both '{}'",
                self.dataset.time_column
            ));
        }
        if self.dataset.sensors.iter().any(|s| s.trim().is_empty()) {
            errors.push("dataset.sensors contains an empty name".to_string());
        }

        if self.windows.margin_minutes < 0 {
            errors.push(format!(
                "windows.margin_minutes ({}) must be >= 0",
                self.windows.margin_minutes
            ));
        }

        if self.plots.dpi == 0 {
            errors.push("plots.dpi must be > 0".to_string());
        }
        check_size(&mut errors, "plots.zoom_size", self.plots.zoom_size);
        check_size(&mut errors, "plots.batch_size", self.plots.batch_size);
        if self.plots.zoom_prefix.trim().is_empty() {
            errors.push("plots.zoom_prefix must not be empty".to_string());
        }
        if self.plots.max_panels_per_figure == 0 {
            errors.push("plots.max_panels_per_figure must be > 0".to_string());
        }
        if self.plots.histogram_bins == 0 {
            errors.push("plots.histogram_bins must be > 0".to_string());
        }
        if self.plots.histogram_max_columns == 0 {
            errors.push("plots.histogram_max_columns must be > 0".to_string());
        }
        if self.plots.resample_minutes <= 0 {
            errors.push(format!(
                "plots.resample_minutes ({}) must be > 0",
                self.plots.resample_minutes
            ));
        }

        if self.baselines.n_estimators == 0 {
            errors.push("baselines.n_estimators must be > 0".to_string());
        }
        if self.baselines.max_samples == 0 {
            errors.push("baselines.max_samples must be > 0".to_string());
        }
        if self.baselines.lof_neighbors == 0 {
            errors.push("baselines.lof_neighbors must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn check_size(errors: &mut Vec<String>, name: &str, size: (f64, f64)) {
    let (w, h) = size;
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        errors.push(format!("{name} ({w}, {h}) must be positive inches"));
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Paths
// ============================================================================

/// Project layout overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Explicit project root. When unset the root is detected from the
    /// working directory (see `ProjectPaths::detect`).
    #[serde(default)]
    pub root: Option<PathBuf>,
}

// ============================================================================
// Dataset
// ============================================================================

/// Dataset file and column naming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetConfig {
    /// CSV file name inside `data/raw`
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Timestamp column
    #[serde(default = "default_time_column")]
    pub time_column: String,

    /// Boolean ground-truth column
    #[serde(default = "default_event_column")]
    pub event_column: String,

    /// Sensor columns used as the preparation schema. Names absent from a
    /// file are skipped.
    #[serde(default = "default_sensors")]
    pub sensors: Vec<String>,
}

fn default_file_name() -> String {
    defaults::GECCO2018_FILE_NAME.to_string()
}
fn default_time_column() -> String {
    defaults::TIME_COLUMN.to_string()
}
fn default_event_column() -> String {
    defaults::EVENT_COLUMN.to_string()
}
fn default_sensors() -> Vec<String> {
    defaults::STANDARD_SENSORS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            time_column: default_time_column(),
            event_column: default_event_column(),
            sensors: default_sensors(),
        }
    }
}

// ============================================================================
// Windows
// ============================================================================

/// Anomaly window extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    /// Minutes of context on either side of an anomaly run
    #[serde(default = "default_margin_minutes")]
    pub margin_minutes: i64,
}

fn default_margin_minutes() -> i64 {
    defaults::WINDOW_MARGIN_MINUTES
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            margin_minutes: default_margin_minutes(),
        }
    }
}

// ============================================================================
// Plots
// ============================================================================

/// Figure sizes and naming. Sizes are (width, height) in inches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotConfig {
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    #[serde(default = "default_zoom_size")]
    pub zoom_size: (f64, f64),

    #[serde(default = "default_batch_size")]
    pub batch_size: (f64, f64),

    #[serde(default = "default_zoom_prefix")]
    pub zoom_prefix: String,

    #[serde(default = "default_max_panels")]
    pub max_panels_per_figure: usize,

    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    #[serde(default = "default_histogram_max_columns")]
    pub histogram_max_columns: usize,

    #[serde(default = "default_resample_minutes")]
    pub resample_minutes: i64,
}

fn default_dpi() -> u32 {
    defaults::FIGURE_DPI
}
fn default_zoom_size() -> (f64, f64) {
    defaults::ZOOM_FIGURE_SIZE
}
fn default_batch_size() -> (f64, f64) {
    defaults::BATCH_FIGURE_SIZE
}
fn default_zoom_prefix() -> String {
    defaults::ZOOM_FILE_PREFIX.to_string()
}
fn default_max_panels() -> usize {
    defaults::MAX_PANELS_PER_FIGURE
}
fn default_histogram_bins() -> usize {
    defaults::HISTOGRAM_BINS
}
fn default_histogram_max_columns() -> usize {
    defaults::HISTOGRAM_MAX_COLUMNS
}
fn default_resample_minutes() -> i64 {
    defaults::RESAMPLE_MINUTES
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            zoom_size: default_zoom_size(),
            batch_size: default_batch_size(),
            zoom_prefix: default_zoom_prefix(),
            max_panels_per_figure: default_max_panels(),
            histogram_bins: default_histogram_bins(),
            histogram_max_columns: default_histogram_max_columns(),
            resample_minutes: default_resample_minutes(),
        }
    }
}

// ============================================================================
// Baselines
// ============================================================================

/// Baseline scorer parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaselineConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    #[serde(default = "default_lof_neighbors")]
    pub lof_neighbors: usize,
}

fn default_seed() -> u64 {
    defaults::BASELINE_SEED
}
fn default_n_estimators() -> usize {
    defaults::ISOLATION_TREES
}
fn default_max_samples() -> usize {
    defaults::ISOLATION_MAX_SAMPLES
}
fn default_lof_neighbors() -> usize {
    defaults::LOF_NEIGHBORS
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            n_estimators: default_n_estimators(),
            max_samples: default_max_samples(),
            lof_neighbors: default_lof_neighbors(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ToolkitConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: ToolkitConfig = toml::from_str(
            r#"
[windows]
margin_minutes = 120

[plots]
zoom_size = [10.0, 3.0]
"#,
        )
        .unwrap();
        assert_eq!(config.windows.margin_minutes, 120);
        assert_eq!(config.plots.zoom_size, (10.0, 3.0));
        assert_eq!(config.plots.dpi, 150);
        assert_eq!(config.dataset.event_column, "EVENT");
        assert_eq!(config.dataset.sensors.len(), 9);
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut config = ToolkitConfig::default();
        config.baselines.seed = 7;
        config.paths.root = Some(PathBuf::from("/srv/wqdab"));
        let text = config.to_toml().unwrap();
        let back: ToolkitConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut config = ToolkitConfig::default();
        config.windows.margin_minutes = -5;
        config.plots.dpi = 0;
        config.dataset.event_column = "Time".to_string();
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "{errors:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn load_from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wqdab.toml");
        std::fs::write(&path, "[baselines]\nlof_neighbors = 0\n").unwrap();
        let err = ToolkitConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("lof_neighbors"));
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wqdab.toml");
        let mut config = ToolkitConfig::default();
        config.dataset.file_name = "2018.csv".to_string();
        config.save_to_file(&path).unwrap();
        let loaded = ToolkitConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.dataset.file_name, "2018.csv");
    }
}
