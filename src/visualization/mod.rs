//! PNG figures for exploratory analysis and anomaly review.
//!
//! Every plot is a [`FigurePainter`] handed to [`render_figure`], which owns
//! the backend lifecycle: saving to a PNG file, keeping an in-memory RGB copy
//! for display, or both.
//!
//! - `zoom`: one anomaly window, one panel per sensor
//! - `overview`: full time series with event overlays, resampled means
//! - `distribution`: histograms and the correlation heatmap

mod distribution;
mod figure;
mod overview;
pub mod style;
mod zoom;

pub use distribution::{
    histogram, plot_correlation_heatmap, plot_pairwise_histograms, HeatmapOptions, Histogram,
    HistogramOptions, HEATMAP_FILE_NAME,
};
pub use figure::{render_figure, Figure, FigurePainter, RenderedFigure};
pub use overview::{plot_resampled_means, plot_timeseries_with_events, ResampledOptions, TimeseriesOptions};
pub use style::FigureSize;
pub use zoom::{
    plan_zoom, render_all_windows, render_anomaly_zoom, BatchOptions, TimeBound, ZoomOptions,
    ZoomOutcome, ZoomPlan,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Drawing failed: {0}")]
    Draw(String),

    #[error("Cannot parse time bound '{0}'")]
    InvalidTime(String),

    #[error("Unknown sensor: {0}")]
    UnknownSensor(String),

    #[error("No sensors selected")]
    NoSensors,

    #[error("Invalid figure size {0}x{1} in at {2} dpi")]
    InvalidSize(f64, f64, u32),
}

/// Plotters errors carry backend-specific types; keep their message only.
pub(crate) fn draw_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Draw(e.to_string())
}
