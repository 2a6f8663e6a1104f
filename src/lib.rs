//! WQDAB: Water Quality Dataset Anomaly Benchmark
//!
//! Toolkit for the GECCO 2018 drinking-water quality data: load and clean
//! sensor CSVs, segment labelled anomaly runs into context windows, score
//! rows with reference outlier detectors, and render review figures.
//!
//! ## Architecture
//!
//! - **Data**: CSV ingestion, time-series preparation, resampling, synthetic datasets
//! - **Anomaly**: event runs and clipped context windows
//! - **Features / Baselines**: median imputation, standard scaling, Isolation Forest, LOF
//! - **Analysis**: Pearson correlation with significance
//! - **Visualization**: anomaly zooms, overviews, histograms, heatmap (PNG)
//! - **Notebook**: generator for the evcxr visualisation notebook

pub mod analysis;
pub mod anomaly;
pub mod baselines;
pub mod config;
pub mod data;
pub mod features;
pub mod notebook;
pub mod visualization;

// Re-export configuration
pub use config::{ProjectPaths, ToolkitConfig};

// Re-export the prepared data model
pub use data::{DataError, PrepareOptions, RawFrame, Table};

// Re-export window extraction
pub use anomaly::{extract_windows, AnomalyWindow, WindowOptions};

// Re-export scorers
pub use baselines::{score_all, BaselineError};

// Re-export rendering entry points
pub use visualization::{render_all_windows, render_anomaly_zoom, RenderError, ZoomOptions, ZoomOutcome};
