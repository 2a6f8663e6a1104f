//! System-wide default constants.
//!
//! Centralises the numbers the loaders, renderers and baselines fall back to
//! when `wqdab.toml` does not override them. Grouped by subsystem.

// ============================================================================
// Dataset
// ============================================================================

/// File name of the GECCO 2018 water quality CSV inside `data/raw`.
pub const GECCO2018_FILE_NAME: &str = "1_gecco2018_water_quality.csv";

/// Name of the timestamp column.
pub const TIME_COLUMN: &str = "Time";

/// Name of the ground-truth anomaly column.
pub const EVENT_COLUMN: &str = "EVENT";

/// Sensor channels of the GECCO water quality datasets, in canonical order.
pub const STANDARD_SENSORS: [&str; 9] = [
    "Tp", "Cl", "pH", "Redox", "Leit", "Trueb", "Cl_2", "Fm", "Fm_2",
];

/// Event cell values (lower-cased) that count as `true`.
pub const TRUTHY_EVENT_VALUES: [&str; 4] = ["true", "1", "t", "yes"];

// ============================================================================
// Anomaly windows
// ============================================================================

/// Context margin added on both sides of an anomaly run (minutes).
pub const WINDOW_MARGIN_MINUTES: i64 = 60;

/// Width of the shaded band drawn for each flagged sample (minutes).
pub const EVENT_BAND_MINUTES: i64 = 1;

// ============================================================================
// Figures
// ============================================================================

/// Resolution used to turn figure sizes in inches into pixels.
pub const FIGURE_DPI: u32 = 150;

/// Single zoom figure size (inches).
pub const ZOOM_FIGURE_SIZE: (f64, f64) = (14.0, 4.0);

/// Zoom figure size used by the batch plotter (inches).
pub const BATCH_FIGURE_SIZE: (f64, f64) = (14.0, 10.0);

/// File name prefix for batch-rendered anomaly windows.
pub const ZOOM_FILE_PREFIX: &str = "anomaly_zoom";

/// Maximum sensor panels per time-series overview figure.
pub const MAX_PANELS_PER_FIGURE: usize = 3;

/// Height of one time-series overview panel (inches).
pub const PANEL_HEIGHT_INCHES: f64 = 4.0;

/// Histogram bin count.
pub const HISTOGRAM_BINS: usize = 30;

/// Maximum number of columns drawn by the histogram grid.
pub const HISTOGRAM_MAX_COLUMNS: usize = 10;

/// Resampling bucket for the smoothed overview (minutes). 60 = hourly.
pub const RESAMPLE_MINUTES: i64 = 60;

// ============================================================================
// Baselines
// ============================================================================

/// Seed for the isolation forest.
pub const BASELINE_SEED: u64 = 42;

/// Number of isolation trees.
pub const ISOLATION_TREES: usize = 100;

/// Maximum subsample drawn for each isolation tree.
pub const ISOLATION_MAX_SAMPLES: usize = 256;

/// Neighbourhood size for the local outlier factor.
pub const LOF_NEIGHBORS: usize = 20;

/// LOF value above which a row is labelled an outlier (contamination "auto").
pub const LOF_OUTLIER_THRESHOLD: f64 = 1.5;

// ============================================================================
// Synthetic data
// ============================================================================

/// Start of generated synthetic datasets (2017-07-01T00:00:00Z).
pub const SYNTHETIC_START_EPOCH: i64 = 1_498_867_200;

/// Default number of synthetic rows (one day at one-minute cadence).
pub const SYNTHETIC_ROWS: usize = 1_440;
