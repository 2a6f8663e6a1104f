//! Anomaly zoom figures.
//!
//! A zoom shows every selected sensor over a time range, one stacked panel
//! each, with the flagged samples marked and shaded. The batch variant
//! renders one zoom per extracted anomaly window.

use super::figure::{render_figure, Figure, FigurePainter, RenderedFigure};
use super::style::{
    minutes_since, padded_range, time_format_for_span, time_label, x_range, FigureSize, CRIMSON,
    FONT, GRID_GREY, STEEL_BLUE,
};
use super::{draw_error, RenderError};
use crate::anomaly::AnomalyWindow;
use crate::config::{defaults, PlotConfig};
use crate::data::{parse_timestamp, Table};
use chrono::NaiveDateTime;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::ops::Range;
use std::path::PathBuf;
use tracing::{debug, info, warn};

// ============================================================================
// Time bounds
// ============================================================================

/// A zoom boundary: a timestamp or text to be parsed as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBound {
    At(NaiveDateTime),
    Text(String),
}

impl TimeBound {
    pub fn resolve(&self) -> Result<NaiveDateTime, RenderError> {
        match self {
            Self::At(t) => Ok(*t),
            Self::Text(s) => parse_timestamp(s).ok_or_else(|| RenderError::InvalidTime(s.clone())),
        }
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(t: NaiveDateTime) -> Self {
        Self::At(t)
    }
}

impl From<&str> for TimeBound {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TimeBound {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ============================================================================
// Options and outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomOptions {
    /// Sensors to draw; `None` draws every sensor of the table.
    pub sensors: Option<Vec<String>>,
    pub size: FigureSize,
    pub dpi: u32,
    pub save_path: Option<PathBuf>,
    pub show: bool,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            sensors: None,
            size: defaults::ZOOM_FIGURE_SIZE.into(),
            dpi: defaults::FIGURE_DPI,
            save_path: None,
            show: true,
        }
    }
}

impl ZoomOptions {
    pub fn from_config(cfg: &PlotConfig) -> Self {
        Self {
            size: cfg.zoom_size.into(),
            dpi: cfg.dpi,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoomOutcome {
    /// No rows fell inside the requested range; nothing was drawn.
    Empty,
    Rendered {
        saved: Option<PathBuf>,
        figure: Option<Figure>,
    },
    /// Drawing or saving failed; only produced by [`render_all_windows`].
    Failed { error: String },
}

impl ZoomOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn saved_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Rendered { saved, .. } => saved.as_ref(),
            Self::Empty | Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<RenderedFigure> for ZoomOutcome {
    fn from(r: RenderedFigure) -> Self {
        Self::Rendered {
            saved: r.saved,
            figure: r.figure,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub sensors: Option<Vec<String>>,
    pub size: FigureSize,
    pub dpi: u32,
    /// Output directory; without it the windows are rendered but not kept.
    pub save_dir: Option<PathBuf>,
    pub prefix: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            sensors: None,
            size: defaults::BATCH_FIGURE_SIZE.into(),
            dpi: defaults::FIGURE_DPI,
            save_dir: None,
            prefix: defaults::ZOOM_FILE_PREFIX.to_string(),
        }
    }
}

impl BatchOptions {
    pub fn from_config(cfg: &PlotConfig) -> Self {
        Self {
            size: cfg.batch_size.into(),
            dpi: cfg.dpi,
            prefix: cfg.zoom_prefix.clone(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Planning
// ============================================================================

/// What a zoom figure will show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomPlan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub rows: Range<usize>,
    pub sensors: Vec<String>,
    pub flagged: usize,
    pub title: String,
}

/// Select rows and sensors for a zoom. `Ok(None)` when no row has
/// `start <= t <= end`.
pub fn plan_zoom(
    table: &Table,
    start: NaiveDateTime,
    end: NaiveDateTime,
    sensors: Option<&[String]>,
) -> Result<Option<ZoomPlan>, RenderError> {
    let rows = table.rows_between(start, end);
    if rows.is_empty() {
        warn!(start = %start, end = %end, "No data in window {} to {}", start, end);
        return Ok(None);
    }

    let sensors = match sensors {
        Some(names) => {
            if let Some(unknown) = names.iter().find(|n| table.sensor(n).is_none()) {
                return Err(RenderError::UnknownSensor(unknown.clone()));
            }
            names.to_vec()
        }
        None => table.sensor_names(),
    };
    if sensors.is_empty() {
        return Err(RenderError::NoSensors);
    }

    let flagged = table.events()[rows.clone()].iter().filter(|&&e| e).count();
    Ok(Some(ZoomPlan {
        title: format!("Window: {} to {}", start.format("%Y-%m-%d %H:%M"), end.format("%Y-%m-%d %H:%M")),
        start,
        end,
        rows,
        sensors,
        flagged,
    }))
}

// ============================================================================
// Drawing
// ============================================================================

struct ZoomPainter<'a> {
    table: &'a Table,
    plan: &'a ZoomPlan,
}

impl FigurePainter for ZoomPainter<'_> {
    fn paint<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError> {
        let rows = self.plan.rows.clone();
        let index = &self.table.index()[rows.clone()];
        let events = &self.table.events()[rows.clone()];
        let (Some(&origin), Some(&last_t)) = (index.first(), index.last()) else {
            return Ok(());
        };

        let span = minutes_since(origin, last_t);
        let xs: Vec<f64> = index.iter().map(|t| minutes_since(origin, *t)).collect();
        let x_axis = x_range(span);
        let band = defaults::EVENT_BAND_MINUTES as f64;
        let format = time_format_for_span(span);
        let label = |m: &f64| time_label(origin, *m, format);

        let panels = root.split_evenly((self.plan.sensors.len(), 1));
        let last = panels.len().saturating_sub(1);

        for (i, (panel, name)) in panels.iter().zip(&self.plan.sensors).enumerate() {
            let values = self
                .table
                .sensor(name)
                .map(|v| &v[rows.clone()])
                .ok_or_else(|| RenderError::UnknownSensor(name.clone()))?;
            let y_axis = padded_range(values.iter().copied());

            let mut builder = ChartBuilder::on(panel);
            builder
                .margin(8)
                .x_label_area_size(if i == last { 40 } else { 24 })
                .y_label_area_size(70);
            if i == 0 {
                builder.caption(&self.plan.title, (FONT, 28));
            }
            let mut chart = builder
                .build_cartesian_2d(x_axis.clone(), y_axis.clone())
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
                .draw_series(xs.iter().zip(events).filter(|(_, e)| **e).map(|(&x, _)| {
                    Rectangle::new(
                        [(x, y_axis.start), ((x + band).min(x_axis.end), y_axis.end)],
                        CRIMSON.mix(0.15).filled(),
                    )
                }))
                .map_err(draw_error)?;

            chart
                .draw_series(LineSeries::new(
                    xs.iter()
                        .zip(values)
                        .filter(|(_, v)| v.is_finite())
                        .map(|(&x, &v)| (x, v)),
                    STEEL_BLUE.stroke_width(2),
                ))
                .map_err(draw_error)?
                .label("Reading")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], STEEL_BLUE));

            let markers = chart
                .draw_series(
                    xs.iter()
                        .zip(values)
                        .zip(events)
                        .filter(|((_, v), e)| **e && v.is_finite())
                        .map(|((&x, &v), _)| Circle::new((x, v), 4, CRIMSON.mix(0.8).filled())),
                )
                .map_err(draw_error)?;
            if self.plan.flagged > 0 {
                markers
                    .label("Anomaly")
                    .legend(|(x, y)| Circle::new((x + 10, y), 4, CRIMSON.filled()));
            }

            if i == 0 {
                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperRight)
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(draw_error)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Render the rows of `table` between `start` and `end` (inclusive).
///
/// An empty selection logs a warning and returns [`ZoomOutcome::Empty`]
/// without touching `save_path`.
pub fn render_anomaly_zoom(
    table: &Table,
    start: impl Into<TimeBound>,
    end: impl Into<TimeBound>,
    opts: &ZoomOptions,
) -> Result<ZoomOutcome, RenderError> {
    let start = start.into().resolve()?;
    let end = end.into().resolve()?;
    let Some(plan) = plan_zoom(table, start, end, opts.sensors.as_deref())? else {
        return Ok(ZoomOutcome::Empty);
    };
    debug!(
        rows = plan.rows.len(),
        sensors = plan.sensors.len(),
        flagged = plan.flagged,
        "Rendering anomaly zoom"
    );

    let painter = ZoomPainter { table, plan: &plan };
    render_figure(&painter, opts.size, opts.dpi, opts.save_path.as_deref(), opts.show).map(Into::into)
}

/// Render one zoom per window, saved as `{save_dir}/{prefix}_{i}.png`.
///
/// Windows are independent: a window that fails to draw or save is logged and
/// recorded as [`ZoomOutcome::Failed`], and the remaining windows still render.
/// Only failing to create `save_dir` aborts the batch.
pub fn render_all_windows(
    table: &Table,
    windows: &[AnomalyWindow],
    opts: &BatchOptions,
) -> Result<Vec<ZoomOutcome>, RenderError> {
    if let Some(dir) = &opts.save_dir {
        fs::create_dir_all(dir).map_err(|source| RenderError::Io {
            path: dir.clone(),
            source,
        })?;
    }

    let mut outcomes = Vec::with_capacity(windows.len());
    for (i, window) in windows.iter().enumerate() {
        let zoom = ZoomOptions {
            sensors: opts.sensors.clone(),
            size: opts.size,
            dpi: opts.dpi,
            save_path: opts
                .save_dir
                .as_ref()
                .map(|d| d.join(format!("{}_{i}.png", opts.prefix))),
            show: false,
        };
        let outcome = match render_anomaly_zoom(table, window.window_start, window.window_end, &zoom) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(window = i, error = %e, "Window render failed, continuing");
                ZoomOutcome::Failed { error: e.to_string() }
            }
        };
        outcomes.push(outcome);
    }

    info!(
        windows = windows.len(),
        saved = outcomes.iter().filter(|o| o.saved_path().is_some()).count(),
        failed = outcomes.iter().filter(|o| o.is_failed()).count(),
        "Anomaly windows rendered"
    );
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{extract_windows, WindowOptions};
    use crate::data::Series;
    use chrono::{NaiveDate, TimeDelta};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn table() -> Table {
        let index: Vec<_> = (0..10).map(|i| t0() + TimeDelta::minutes(i)).collect();
        let events = vec![false, false, true, true, false, false, false, true, false, false];
        Table::from_parts(
            "Time",
            index,
            vec![
                Series {
                    name: "Tp".into(),
                    values: (0..10).map(f64::from).collect(),
                },
                Series {
                    name: "pH".into(),
                    values: vec![7.0; 10],
                },
            ],
            "EVENT",
            events,
        )
        .unwrap()
    }

    #[test]
    fn time_bounds_parse() {
        assert_eq!(TimeBound::from("2017-07-01 00:05:00").resolve().unwrap(), t0() + TimeDelta::minutes(5));
        assert_eq!(TimeBound::from(t0()).resolve().unwrap(), t0());
        assert!(matches!(
            TimeBound::from("yesterday").resolve(),
            Err(RenderError::InvalidTime(s)) if s == "yesterday"
        ));
    }

    #[test]
    fn plan_selects_inclusive_rows_and_all_sensors() {
        let t = table();
        let plan = plan_zoom(&t, t0() + TimeDelta::minutes(2), t0() + TimeDelta::minutes(7), None)
            .unwrap()
            .unwrap();
        assert_eq!(plan.rows, 2..8);
        assert_eq!(plan.sensors, vec!["Tp".to_string(), "pH".to_string()]);
        assert_eq!(plan.flagged, 3);
        assert_eq!(plan.title, "Window: 2017-07-01 00:02 to 2017-07-01 00:07");
    }

    #[test]
    fn plan_rejects_unknown_or_empty_sensors() {
        let t = table();
        let end = t0() + TimeDelta::minutes(9);
        assert!(matches!(
            plan_zoom(&t, t0(), end, Some(&["Cl".to_string()])),
            Err(RenderError::UnknownSensor(s)) if s == "Cl"
        ));
        assert!(matches!(plan_zoom(&t, t0(), end, Some(&[])), Err(RenderError::NoSensors)));
    }

    #[test]
    fn empty_selection_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zoom.png");
        let opts = ZoomOptions {
            save_path: Some(path.clone()),
            ..ZoomOptions::default()
        };
        let out = render_anomaly_zoom(&table(), "2018-01-01 00:00", "2018-01-02 00:00", &opts).unwrap();
        assert_eq!(out, ZoomOutcome::Empty);
        assert!(!path.exists());

        // empty selection wins over a bad sensor list
        let opts = ZoomOptions {
            sensors: Some(vec!["nope".into()]),
            ..ZoomOptions::default()
        };
        assert!(render_anomaly_zoom(&table(), "2018-01-01", "2018-01-02", &opts)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reversed_bounds_are_empty() {
        let t = table();
        assert!(plan_zoom(&t, t0() + TimeDelta::minutes(5), t0(), None).unwrap().is_none());
    }

    #[test]
    fn batch_continues_after_a_failed_window() {
        let t = table();
        let drawable = extract_windows(&t, &WindowOptions { margin_minutes: 0 })[0];
        let outside = AnomalyWindow {
            window_start: t0() + TimeDelta::hours(5),
            window_end: t0() + TimeDelta::hours(6),
            anomaly_start: t0() + TimeDelta::hours(5),
            anomaly_end: t0() + TimeDelta::hours(5),
        };
        let dir = tempfile::tempdir().unwrap();
        let opts = BatchOptions {
            save_dir: Some(dir.path().to_path_buf()),
            size: FigureSize::new(0.0, 10.0),
            ..BatchOptions::default()
        };

        let outcomes = render_all_windows(&t, &[drawable, outside, drawable], &opts).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(&outcomes[0], ZoomOutcome::Failed { error } if error.contains("size")));
        assert!(outcomes[1].is_empty());
        assert!(outcomes[2].is_failed());
        assert!(outcomes.iter().all(|o| o.saved_path().is_none()));
        assert!(!dir.path().join("anomaly_zoom_0.png").exists());
    }

    #[test]
    #[ignore = "requires system fonts"]
    fn unwritable_window_does_not_stop_the_batch() {
        let t = table();
        let windows = extract_windows(&t, &WindowOptions { margin_minutes: 1 });
        let dir = tempfile::tempdir().unwrap();
        // A directory where the first PNG should go makes that save fail.
        std::fs::create_dir_all(dir.path().join("anomaly_zoom_0.png")).unwrap();
        let opts = BatchOptions {
            save_dir: Some(dir.path().to_path_buf()),
            dpi: 60,
            ..BatchOptions::default()
        };

        let outcomes = render_all_windows(&t, &windows, &opts).unwrap();
        assert!(outcomes[0].is_failed());
        assert!(dir.path().join("anomaly_zoom_1.png").is_file());
        assert!(!outcomes[1].is_failed());
    }

    #[test]
    #[ignore = "requires system fonts"]
    fn renders_zoom_to_file_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figs").join("zoom.png");
        let opts = ZoomOptions {
            save_path: Some(path.clone()),
            dpi: 100,
            ..ZoomOptions::default()
        };
        let out = render_anomaly_zoom(&table(), t0(), t0() + TimeDelta::minutes(9), &opts).unwrap();
        let ZoomOutcome::Rendered { saved, figure } = out else {
            panic!("expected a rendered figure");
        };
        assert_eq!(saved.as_deref(), Some(path.as_path()));
        let fig = figure.unwrap();
        assert_eq!((fig.width, fig.height), (1400, 400));
        assert!(path.is_file());
    }

    #[test]
    #[ignore = "requires system fonts"]
    fn batch_names_files_by_window_index() {
        let t = table();
        let windows = extract_windows(&t, &WindowOptions { margin_minutes: 1 });
        assert_eq!(windows.len(), 2);
        let dir = tempfile::tempdir().unwrap();
        let opts = BatchOptions {
            save_dir: Some(dir.path().join("windows")),
            dpi: 60,
            ..BatchOptions::default()
        };
        let outcomes = render_all_windows(&t, &windows, &opts).unwrap();
        assert_eq!(outcomes.len(), 2);
        for i in 0..2 {
            assert!(dir.path().join("windows").join(format!("anomaly_zoom_{i}.png")).is_file());
        }
        assert!(outcomes.iter().all(|o| matches!(o, ZoomOutcome::Rendered { figure: None, .. })));
    }
}
