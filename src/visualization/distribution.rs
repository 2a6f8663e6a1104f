//! Per-sensor histograms and the correlation heatmap.

use super::figure::{render_figure, FigurePainter, RenderedFigure};
use super::style::{diverging, FigureSize, FONT, PALETTE};
use super::{draw_error, RenderError};
use crate::analysis::CorrelationMatrix;
use crate::config::{defaults, PlotConfig};
use crate::data::Table;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::PathBuf;
use tracing::{info, warn};

/// Cell annotations are only drawn up to this many variables.
const MAX_ANNOTATED: usize = 12;

// ============================================================================
// Histograms
// ============================================================================

/// Equal-width bin counts of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub name: String,
    /// `counts.len() + 1` bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Bin the finite values into `bins` equal-width bins spanning min to max.
/// The maximum lands in the last bin. A constant column spans value ± 0.5.
pub fn histogram(name: &str, values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let (lo, hi) = if !lo.is_finite() {
        (0.0, 1.0)
    } else if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    };

    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + (hi - lo) * i as f64 / bins as f64).collect();
    let mut counts = vec![0; bins];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram {
        name: name.to_string(),
        edges,
        counts,
    }
}

/// Rows and columns of a near-square grid holding `n` panels.
pub(crate) fn grid_shape(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    (n.div_ceil(cols), cols)
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramOptions {
    pub bins: usize,
    /// Only the first `max_columns` sensors are drawn.
    pub max_columns: usize,
    pub size: FigureSize,
    pub dpi: u32,
    pub save_path: Option<PathBuf>,
    pub show: bool,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bins: defaults::HISTOGRAM_BINS,
            max_columns: defaults::HISTOGRAM_MAX_COLUMNS,
            size: FigureSize::new(14.0, 10.0),
            dpi: defaults::FIGURE_DPI,
            save_path: None,
            show: true,
        }
    }
}

impl HistogramOptions {
    pub fn from_config(cfg: &PlotConfig) -> Self {
        Self {
            bins: cfg.histogram_bins,
            max_columns: cfg.histogram_max_columns,
            dpi: cfg.dpi,
            ..Self::default()
        }
    }
}

struct HistogramGrid<'a> {
    histograms: &'a [Histogram],
}

impl FigurePainter for HistogramGrid<'_> {
    fn paint<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError> {
        let (rows, cols) = grid_shape(self.histograms.len());
        let cells = root.split_evenly((rows, cols));
        for (cell, hist) in cells.iter().zip(self.histograms) {
            let (Some(&x0), Some(&x1)) = (hist.edges.first(), hist.edges.last()) else {
                continue;
            };
            let y_max = (hist.max_count() as f64 * 1.1).max(1.0);
            let mut chart = ChartBuilder::on(cell)
                .caption(&hist.name, (FONT, 18))
                .margin(6)
                .x_label_area_size(24)
                .y_label_area_size(40)
                .build_cartesian_2d(x0..x1, 0.0..y_max)
                .map_err(draw_error)?;
            chart
                .configure_mesh()
                .x_labels(4)
                .y_labels(4)
                .disable_x_mesh()
                .draw()
                .map_err(draw_error)?;
            chart
                .draw_series(hist.edges.windows(2).zip(&hist.counts).map(|(edge, &count)| {
                    Rectangle::new([(edge[0], 0.0), (edge[1], count as f64)], PALETTE[0].mix(0.8).filled())
                }))
                .map_err(draw_error)?;
        }
        Ok(())
    }
}

/// Histogram grid of the first `max_columns` sensors.
pub fn plot_pairwise_histograms(
    table: &Table,
    opts: &HistogramOptions,
) -> Result<Option<RenderedFigure>, RenderError> {
    let histograms: Vec<Histogram> = table
        .sensors()
        .iter()
        .take(opts.max_columns)
        .map(|s| histogram(&s.name, &s.values, opts.bins))
        .collect();
    if histograms.is_empty() {
        warn!("Histogram grid skipped: no sensor columns");
        return Ok(None);
    }
    info!(columns = histograms.len(), bins = opts.bins, "Rendering histogram grid");
    let painter = HistogramGrid {
        histograms: &histograms,
    };
    render_figure(&painter, opts.size, opts.dpi, opts.save_path.as_deref(), opts.show).map(Some)
}

// ============================================================================
// Correlation heatmap
// ============================================================================

pub const HEATMAP_FILE_NAME: &str = "correlation_heatmap.png";

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapOptions {
    pub size: FigureSize,
    pub dpi: u32,
    pub save_path: Option<PathBuf>,
    pub show: bool,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            size: FigureSize::new(10.0, 8.0),
            dpi: defaults::FIGURE_DPI,
            save_path: None,
            show: true,
        }
    }
}

struct HeatmapPainter<'a> {
    matrix: &'a CorrelationMatrix,
}

impl FigurePainter for HeatmapPainter<'_> {
    fn paint<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError> {
        let names = &self.matrix.names;
        let n = u32::try_from(names.len()).map_err(draw_error)?;
        // row 0 is drawn at the top
        let name_at = |v: &SegmentValue<u32>, flip: bool| match v {
            SegmentValue::CenterOf(i) => {
                let i = *i as usize;
                let i = if flip { names.len().wrapping_sub(i + 1) } else { i };
                names.get(i).cloned().unwrap_or_default()
            }
            _ => String::new(),
        };
        let x_label = |v: &SegmentValue<u32>| name_at(v, false);
        let y_label = |v: &SegmentValue<u32>| name_at(v, true);

        let mut chart = ChartBuilder::on(root)
            .caption("Correlation heatmap (numeric features)", (FONT, 28))
            .margin(12)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())
            .map_err(draw_error)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(names.len())
            .y_labels(names.len())
            .x_label_formatter(&x_label)
            .y_label_formatter(&y_label)
            .draw()
            .map_err(draw_error)?;

        let cells = self.matrix.values.iter().enumerate().flat_map(|(row, values)| {
            values.iter().enumerate().map(move |(col, &r)| (row, col, r))
        });
        let to_y = |row: usize| n.saturating_sub(row as u32 + 1);

        chart
            .draw_series(cells.clone().map(|(row, col, r)| {
                let (x, y) = (col as u32, to_y(row));
                Rectangle::new(
                    [
                        (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                        (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                    ],
                    diverging(r).filled(),
                )
            }))
            .map_err(draw_error)?;

        if names.len() <= MAX_ANNOTATED {
            let style = TextStyle::from((FONT, 16).into_font())
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center));
            chart
                .draw_series(cells.map(|(row, col, r)| {
                    Text::new(
                        format!("{r:.2}"),
                        (SegmentValue::CenterOf(col as u32), SegmentValue::CenterOf(to_y(row))),
                        style.clone(),
                    )
                }))
                .map_err(draw_error)?;
        }
        Ok(())
    }
}

/// Heatmap of a correlation matrix on a diverging scale centred at 0.
pub fn plot_correlation_heatmap(
    matrix: &CorrelationMatrix,
    opts: &HeatmapOptions,
) -> Result<Option<RenderedFigure>, RenderError> {
    if matrix.names.is_empty() {
        warn!("Correlation heatmap skipped: no columns");
        return Ok(None);
    }
    let painter = HeatmapPainter { matrix };
    render_figure(&painter, opts.size, opts.dpi, opts.save_path.as_deref(), opts.show).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::correlation_matrix;
    use crate::data::Series;
    use chrono::{NaiveDate, TimeDelta};

    #[test]
    fn histogram_counts_every_finite_value() {
        let values: Vec<f64> = (0..100).map(f64::from).chain([f64::NAN]).collect();
        let h = histogram("Tp", &values, 10);
        assert_eq!(h.counts.len(), 10);
        assert_eq!(h.edges.len(), 11);
        assert_eq!(h.total(), 100);
        assert_eq!(h.counts, vec![10; 10]);
        assert_eq!(h.edges[0], 0.0);
        assert_eq!(h.edges[10], 99.0);
    }

    #[test]
    fn histogram_of_constant_column() {
        let h = histogram("pH", &[7.0; 5], 30);
        assert_eq!(h.edges.first(), Some(&6.5));
        assert_eq!(h.edges.last(), Some(&7.5));
        assert_eq!(h.total(), 5);
        assert_eq!(h.max_count(), 5);

        let empty = histogram("x", &[], 0);
        assert_eq!(empty.counts, vec![0]);
    }

    #[test]
    fn grid_is_near_square() {
        assert_eq!(grid_shape(0), (0, 0));
        assert_eq!(grid_shape(1), (1, 1));
        assert_eq!(grid_shape(3), (2, 2));
        assert_eq!(grid_shape(9), (3, 3));
        assert_eq!(grid_shape(10), (3, 4));
    }

    #[test]
    fn empty_inputs_render_nothing() {
        let m = CorrelationMatrix {
            names: Vec::new(),
            values: Vec::new(),
            p_values: Vec::new(),
            sample_count: 0,
        };
        assert!(plot_correlation_heatmap(&m, &HeatmapOptions::default()).unwrap().is_none());

        let t = Table::from_parts("Time", Vec::new(), Vec::new(), "EVENT", Vec::new()).unwrap();
        assert!(plot_pairwise_histograms(&t, &HistogramOptions::default()).unwrap().is_none());
    }

    #[test]
    #[ignore = "requires system fonts"]
    fn heatmap_and_histograms_render() {
        let t0 = NaiveDate::from_ymd_opt(2017, 7, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let sensors: Vec<Series> = ["Tp", "Cl", "pH"]
            .iter()
            .enumerate()
            .map(|(k, name)| Series {
                name: (*name).to_string(),
                values: (0..50).map(|i| f64::from(i) * (k as f64 - 1.0) + f64::from(i % 7)).collect(),
            })
            .collect();
        let t = Table::from_parts(
            "Time",
            (0..50).map(|i| t0 + TimeDelta::minutes(i)).collect(),
            sensors,
            "EVENT",
            vec![false; 50],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let m = correlation_matrix(&t, &t.sensor_names()).unwrap();
        let out = plot_correlation_heatmap(
            &m,
            &HeatmapOptions {
                dpi: 60,
                save_path: Some(dir.path().join(HEATMAP_FILE_NAME)),
                show: false,
                ..HeatmapOptions::default()
            },
        )
        .unwrap()
        .unwrap();
        assert!(out.saved.unwrap().is_file());

        let hist = plot_pairwise_histograms(&t, &HistogramOptions { dpi: 60, ..HistogramOptions::default() })
            .unwrap()
            .unwrap();
        assert_eq!(hist.figure.map(|f| (f.width, f.height)), Some((840, 600)));
    }
}
