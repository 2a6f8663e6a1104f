//! Generator for the time-aware visualisation notebook.
//!
//! Builds an nbformat 4.5 document whose code cells drive this crate from an
//! evcxr Rust kernel: directory setup, loading and cleaning the GECCO 2018
//! CSV, event statistics, the overview figures, and the saved heatmap.

use crate::config::ProjectPaths;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File name of the generated notebook inside `notebooks/`.
pub const NOTEBOOK_FILE_NAME: &str = "02_visualizations_gecco2018.ipynb";

#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("Cannot write notebook {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Notebook serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// nbformat document
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    pub metadata: NotebookMetadata,
    pub nbformat: u32,
    pub nbformat_minor: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum Cell {
    Markdown {
        id: String,
        metadata: Map<String, Value>,
        source: Vec<String>,
    },
    Code {
        id: String,
        execution_count: Option<u32>,
        metadata: Map<String, Value>,
        outputs: Vec<Value>,
        source: Vec<String>,
    },
}

impl Cell {
    pub fn source_text(&self) -> String {
        match self {
            Self::Markdown { source, .. } | Self::Code { source, .. } => source.concat(),
        }
    }

    pub const fn is_code(&self) -> bool {
        matches!(self, Self::Code { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotebookMetadata {
    pub kernelspec: KernelSpec,
    pub language_info: LanguageInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KernelSpec {
    pub display_name: String,
    pub language: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageInfo {
    pub name: String,
    pub file_extension: String,
    pub mimetype: String,
    pub codemirror_mode: String,
    pub pygment_lexer: String,
    pub version: String,
}

impl Default for NotebookMetadata {
    fn default() -> Self {
        Self {
            kernelspec: KernelSpec {
                display_name: "Rust".into(),
                language: "rust".into(),
                name: "rust".into(),
            },
            language_info: LanguageInfo {
                name: "Rust".into(),
                file_extension: ".rs".into(),
                mimetype: "text/rust".into(),
                codemirror_mode: "rust".into(),
                pygment_lexer: "rust".into(),
                version: String::new(),
            },
        }
    }
}

/// Split text into nbformat source lines, each keeping its `\n`.
fn source_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(str::to_string).collect()
}

/// Incrementally assembles a notebook with sequential cell ids.
#[derive(Debug, Default)]
struct NotebookBuilder {
    cells: Vec<Cell>,
}

impl NotebookBuilder {
    fn next_id(&self) -> String {
        format!("cell-{:02}", self.cells.len())
    }

    fn markdown(mut self, text: &str) -> Self {
        let id = self.next_id();
        self.cells.push(Cell::Markdown {
            id,
            metadata: Map::new(),
            source: source_lines(text),
        });
        self
    }

    fn code(mut self, text: &str) -> Self {
        let id = self.next_id();
        self.cells.push(Cell::Code {
            id,
            execution_count: None,
            metadata: Map::new(),
            outputs: Vec::new(),
            source: source_lines(text),
        });
        self
    }

    fn finish(self) -> Notebook {
        Notebook {
            cells: self.cells,
            metadata: NotebookMetadata::default(),
            nbformat: 4,
            nbformat_minor: 5,
        }
    }
}

// ============================================================================
// Cell contents
// ============================================================================

const INTRO: &str = "\
# GECCO2018 Water Quality - Notebook 02: Time-Aware Visualizations

This notebook focuses on time-series views of the GECCO2018 dataset.

Goals:
- Load the dataset and apply basic cleaning (parse `Time`, coerce types, drop missing rows).
- Plot the sensor series with `EVENT` markers.
- Explore distributions and correlations between sensors.
- Save the main figures to `reports/figures/`.";

const DEPENDENCIES: &str = "\
// Crate under analysis (the notebook lives in <root>/notebooks)
:dep wqdab = { path = \"..\" }
:dep chrono = \"0.4\"";

const SETUP: &str = "\
use wqdab::analysis::correlation_matrix;
use wqdab::config::{ProjectPaths, ToolkitConfig};
use wqdab::data::{get_standard_sensors, load_gecco2018_csv, prepare_time_series, resample_mean, PrepareOptions};
use wqdab::visualization::*;

// Ensure data/ and reports/figures exist
let config = ToolkitConfig::load();
let paths = ProjectPaths::detect(config.paths.root.as_deref());
paths.ensure_directories_exist()?;
println!(\"FIGURES_DIR: {}\", paths.figures.display());";

const LOAD: &str = "\
// Load dataset
let df = load_gecco2018_csv(None, &paths)?;
println!(\"{:?}\", df.shape());
let preview = df.head(10);
println!(\"{:?}\", preview.column_names());
for row in (0..preview.n_rows()).filter_map(|i| preview.row(i)) {
    println!(\"{:?}\", row);
}";

const CLEAN: &str = "\
// Basic cleaning: drop unnamed index columns, parse time, coerce sensors,
// normalise EVENT, drop incomplete rows, sort by time
let df = df.drop_unnamed();
let sensors = get_standard_sensors(&df);
let opts = PrepareOptions::from(&config.dataset).with_numeric_cols(sensors.clone());
let df_ts = prepare_time_series(&df, &opts)?;
println!(\"After cleaning: {} rows x {} sensors\", df_ts.len(), df_ts.sensors().len());";

const SUMMARY: &str = "\
// Column types and missing cells in the raw file
for column in df.columns() {
    let missing = column.cells.iter().filter(|c| c.is_none()).count();
    println!(\"{:>8}  {:?}  missing={}\", column.name, column.kind(), missing);
}";

const EVENTS: &str = "\
// Event count and timeframe
println!(\"EVENT true count: {}\", df_ts.event_count());
if let Some((first, last)) = df_ts.time_range() {
    println!(\"Time range: {} -> {}\", first, last);
}";

const TIMESERIES: &str = "\
// Time series with event overlays, saved as reports/figures/timeseries_{k}.png
let ts_opts = TimeseriesOptions {
    save_dir: Some(paths.figures.clone()),
    prefix: \"timeseries\".to_string(),
    ..TimeseriesOptions::from_config(&config.plots)
};
for figure in plot_timeseries_with_events(&df_ts, Some(&sensors), &ts_opts)? {
    if let Some(path) = figure.saved {
        println!(\"Saved: {}\", path.display());
    }
}";

const HISTOGRAMS: &str = "\
// Distributions
let hist = plot_pairwise_histograms(&df_ts, &HistogramOptions::from_config(&config.plots))?;
println!(\"Histogram grid rendered: {}\", hist.is_some());";

const HEATMAP: &str = "\
// Correlation heatmap
let corr = correlation_matrix(&df_ts, &df_ts.sensor_names())?;
for pair in corr.significant_pairs(0.05).iter().take(10) {
    println!(\"{:>6} ~ {:<6} r = {:+.3}\", pair.x, pair.y, pair.r);
}
plot_correlation_heatmap(&corr, &HeatmapOptions::default())?;";

const RESAMPLED: &str = "\
// Resampled means as a smoother view
let hourly = resample_mean(&df_ts, chrono::TimeDelta::minutes(config.plots.resample_minutes))?;
plot_resampled_means(&hourly, &ResampledOptions::default())?;";

const SAVE_HEATMAP: &str = "\
// Save correlation heatmap to figures
let out = paths.figure(HEATMAP_FILE_NAME);
let heatmap_opts = HeatmapOptions {
    save_path: Some(out.clone()),
    show: false,
    ..HeatmapOptions::default()
};
plot_correlation_heatmap(&corr, &heatmap_opts)?;
println!(\"Saved: {}\", out.display());";

const OUTRO: &str = "\
## Summary
- `df_ts`: cleaned table indexed by time.
- Figures: time series with event markers, distributions and correlation.
- Figures saved in `reports/figures/`.";

/// The visualisation notebook, cells in reading order.
pub fn build_notebook() -> Notebook {
    NotebookBuilder::default()
        .markdown(INTRO)
        .code(DEPENDENCIES)
        .code(SETUP)
        .code(LOAD)
        .code(CLEAN)
        .code(SUMMARY)
        .code(EVENTS)
        .code(TIMESERIES)
        .code(HISTOGRAMS)
        .code(HEATMAP)
        .code(RESAMPLED)
        .code(SAVE_HEATMAP)
        .markdown(OUTRO)
        .finish()
}

impl Notebook {
    pub fn to_json_pretty(&self) -> Result<String, NotebookError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), NotebookError> {
        let io_err = |source| NotebookError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_json_pretty()?).map_err(io_err)?;
        info!(path = %path.display(), cells = self.cells.len(), "Notebook written");
        Ok(())
    }
}

/// Default location: `{root}/notebooks/02_visualizations_gecco2018.ipynb`.
pub fn default_notebook_path(paths: &ProjectPaths) -> PathBuf {
    paths.notebooks.join(NOTEBOOK_FILE_NAME)
}

/// Build the notebook and write it to `path`.
pub fn write_notebook(path: &Path) -> Result<Notebook, NotebookError> {
    let notebook = build_notebook();
    notebook.save(path)?;
    Ok(notebook)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notebook_has_expected_cells() {
        let nb = build_notebook();
        assert_eq!(nb.cells.len(), 13);
        assert!(!nb.cells[0].is_code());
        assert!(!nb.cells[12].is_code());
        assert_eq!(nb.cells.iter().filter(|c| c.is_code()).count(), 11);
        assert!(nb.cells[1].source_text().contains(":dep wqdab"));
        assert!(nb.cells[11].source_text().contains("HEATMAP_FILE_NAME"));
    }

    #[test]
    fn json_shape_follows_nbformat() {
        let json: Value = serde_json::from_str(&build_notebook().to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["nbformat"], 4);
        assert_eq!(json["nbformat_minor"], 5);
        assert_eq!(json["metadata"]["kernelspec"]["name"], "rust");

        let first = &json["cells"][0];
        assert_eq!(first["cell_type"], "markdown");
        assert_eq!(first["id"], "cell-00");
        assert!(first.get("outputs").is_none());

        let code = &json["cells"][2];
        assert_eq!(code["cell_type"], "code");
        assert_eq!(code["id"], "cell-02");
        assert!(code["execution_count"].is_null());
        assert_eq!(code["outputs"], Value::Array(Vec::new()));
        let lines = code["source"].as_array().unwrap();
        assert!(lines[..lines.len() - 1]
            .iter()
            .all(|l| l.as_str().unwrap().ends_with('\n')));
        assert!(!lines.last().unwrap().as_str().unwrap().ends_with('\n'));
    }

    #[test]
    fn cell_ids_are_unique() {
        let nb = build_notebook();
        let mut ids: Vec<String> = nb
            .cells
            .iter()
            .map(|c| match c {
                Cell::Markdown { id, .. } | Cell::Code { id, .. } => id.clone(),
            })
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), nb.cells.len());
    }

    #[test]
    fn write_creates_directories_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let path = default_notebook_path(&paths);
        assert!(path.ends_with("notebooks/02_visualizations_gecco2018.ipynb"));

        let written = write_notebook(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        let parsed: Notebook = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, written);
    }
}
