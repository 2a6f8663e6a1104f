//! Whole-dataset overviews: raw series with event markers and resampled means.

use super::figure::{render_figure, FigurePainter, RenderedFigure};
use super::style::{
    minutes_since, padded_range, time_format_for_span, time_label, x_range, FigureSize, CRIMSON,
    FONT, GRID_GREY, PALETTE,
};
use super::{draw_error, RenderError};
use crate::config::{defaults, PlotConfig};
use crate::data::{Resampled, Table};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

// ============================================================================
// Time series with events
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesOptions {
    /// Panels per figure; more columns spill into further figures.
    pub max_panels: usize,
    pub panel_height: f64,
    pub width: f64,
    pub dpi: u32,
    pub save_dir: Option<PathBuf>,
    pub prefix: String,
    pub show: bool,
}

impl Default for TimeseriesOptions {
    fn default() -> Self {
        Self {
            max_panels: defaults::MAX_PANELS_PER_FIGURE,
            panel_height: defaults::PANEL_HEIGHT_INCHES,
            width: defaults::ZOOM_FIGURE_SIZE.0,
            dpi: defaults::FIGURE_DPI,
            save_dir: None,
            prefix: "timeseries".to_string(),
            show: true,
        }
    }
}

impl TimeseriesOptions {
    pub fn from_config(cfg: &PlotConfig) -> Self {
        Self {
            max_panels: cfg.max_panels_per_figure,
            dpi: cfg.dpi,
            ..Self::default()
        }
    }
}

struct TimeseriesPainter<'a> {
    table: &'a Table,
    columns: &'a [String],
}

impl FigurePainter for TimeseriesPainter<'_> {
    fn paint<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError> {
        let index = self.table.index();
        let (Some(&origin), Some(&last_t)) = (index.first(), index.last()) else {
            return Ok(());
        };
        let span = minutes_since(origin, last_t);
        let xs: Vec<f64> = index.iter().map(|t| minutes_since(origin, *t)).collect();
        let event_xs: Vec<f64> = xs
            .iter()
            .zip(self.table.events())
            .filter(|(_, e)| **e)
            .map(|(&x, _)| x)
            .collect();
        let format = time_format_for_span(span);
        let label = |m: &f64| time_label(origin, *m, format);

        let panels = root.split_evenly((self.columns.len(), 1));
        let last = panels.len().saturating_sub(1);
        for (i, (panel, name)) in panels.iter().zip(self.columns).enumerate() {
            let values = self
                .table
                .sensor(name)
                .ok_or_else(|| RenderError::UnknownSensor(name.clone()))?;
            let y_axis = padded_range(values.iter().copied());

            let mut chart = ChartBuilder::on(panel)
                .caption(format!("{name} over time"), (FONT, 24))
                .margin(8)
                .x_label_area_size(if i == last { 40 } else { 24 })
                .y_label_area_size(70)
                .build_cartesian_2d(x_range(span), y_axis.clone())
                .map_err(draw_error)?;

            let mut mesh = chart.configure_mesh();
            mesh.y_desc(name.as_str())
                .x_label_formatter(&label)
                .light_line_style(GRID_GREY.stroke_width(1));
            if i == last {
                mesh.x_desc("Time");
            }
            mesh.draw().map_err(draw_error)?;

            chart
                .draw_series(LineSeries::new(
                    xs.iter()
                        .zip(values)
                        .filter(|(_, v)| v.is_finite())
                        .map(|(&x, &v)| (x, v)),
                    PALETTE[0].stroke_width(1),
                ))
                .map_err(draw_error)?;

            chart
                .draw_series(event_xs.iter().map(|&x| {
                    PathElement::new(vec![(x, y_axis.start), (x, y_axis.end)], CRIMSON.mix(0.2))
                }))
                .map_err(draw_error)?;
        }
        Ok(())
    }
}

/// Plot each column over time with event timestamps as vertical lines.
///
/// Columns are split into figures of at most `max_panels` panels, each
/// `width` x `panel_height * panels` inches. With `save_dir`, figure `k`
/// (from 1) is saved as `{prefix}_{k}.png`.
pub fn plot_timeseries_with_events(
    table: &Table,
    columns: Option<&[String]>,
    opts: &TimeseriesOptions,
) -> Result<Vec<RenderedFigure>, RenderError> {
    let columns = columns.map_or_else(|| table.sensor_names(), <[String]>::to_vec);
    if let Some(unknown) = columns.iter().find(|c| table.sensor(c).is_none()) {
        return Err(RenderError::UnknownSensor(unknown.clone()));
    }
    if columns.is_empty() {
        return Err(RenderError::NoSensors);
    }
    if table.is_empty() {
        warn!("Time series overview skipped: table has no rows");
        return Ok(Vec::new());
    }

    let per_figure = opts.max_panels.max(1);
    let mut figures = Vec::new();
    for (k, chunk) in columns.chunks(per_figure).enumerate() {
        let size = FigureSize::new(opts.width, opts.panel_height * chunk.len() as f64);
        let save_path = opts
            .save_dir
            .as_ref()
            .map(|d| d.join(format!("{}_{}.png", opts.prefix, k + 1)));
        let painter = TimeseriesPainter {
            table,
            columns: chunk,
        };
        figures.push(render_figure(&painter, size, opts.dpi, save_path.as_deref(), opts.show)?);
    }
    info!(
        columns = columns.len(),
        figures = figures.len(),
        events = table.event_count(),
        "Time series overview rendered"
    );
    Ok(figures)
}

// ============================================================================
// Resampled means
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResampledOptions {
    pub size: FigureSize,
    pub dpi: u32,
    pub save_path: Option<PathBuf>,
    pub show: bool,
}

impl Default for ResampledOptions {
    fn default() -> Self {
        Self {
            size: FigureSize::new(14.0, 6.0),
            dpi: defaults::FIGURE_DPI,
            save_path: None,
            show: true,
        }
    }
}

/// Split a series with gaps into drawable runs of `(x, y)` points.
pub(crate) fn gap_segments(xs: &[f64], values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (&x, v) in xs.iter().zip(values) {
        match v {
            Some(y) if y.is_finite() => current.push((x, *y)),
            _ if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            _ => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

struct ResampledPainter<'a> {
    resampled: &'a Resampled,
}

impl FigurePainter for ResampledPainter<'_> {
    fn paint<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError> {
        let buckets = &self.resampled.buckets;
        let (Some(&origin), Some(&last_t)) = (buckets.first(), buckets.last()) else {
            return Ok(());
        };
        let span = minutes_since(origin, last_t);
        let xs: Vec<f64> = buckets.iter().map(|t| minutes_since(origin, *t)).collect();
        let y_axis = padded_range(
            self.resampled
                .columns
                .iter()
                .flat_map(|(_, v)| v.iter().flatten().copied()),
        );
        let format = time_format_for_span(span);
        let label = |m: &f64| time_label(origin, *m, format);

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("Resampled mean ({} min)", self.resampled.bucket.num_minutes()),
                (FONT, 28),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range(span), y_axis)
            .map_err(draw_error)?;
        chart
            .configure_mesh()
            .x_desc("Time")
            .x_label_formatter(&label)
            .draw()
            .map_err(draw_error)?;

        for (ci, (name, values)) in self.resampled.columns.iter().enumerate() {
            let color = PALETTE[ci % PALETTE.len()];
            for (si, segment) in gap_segments(&xs, values).into_iter().enumerate() {
                let series = chart
                    .draw_series(LineSeries::new(segment, color.stroke_width(2)))
                    .map_err(draw_error)?;
                if si == 0 {
                    series
                        .label(name.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                }
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_error)
    }
}

/// Plot every resampled sensor mean on one chart; empty buckets break the
/// line.
pub fn plot_resampled_means(
    resampled: &Resampled,
    opts: &ResampledOptions,
) -> Result<Option<RenderedFigure>, RenderError> {
    if resampled.is_empty() {
        warn!("Resampled overview skipped: no buckets");
        return Ok(None);
    }
    let painter = ResampledPainter { resampled };
    render_figure(&painter, opts.size, opts.dpi, opts.save_path.as_deref(), opts.show).map(Some)
}
