//! Time-series preparation: raw frame in, clean time-indexed table out.
//!
//! Steps, in order:
//! 1. Parse the time column; unparseable cells become missing.
//! 2. Resolve the sensor columns (explicit, or every numeric column that is
//!    neither the time nor the event column).
//! 3. Coerce sensor cells to `f64`; unparseable or NaN cells become missing.
//! 4. Turn the event column into booleans (missing counts as `false`).
//! 5. Drop rows missing the timestamp or any sensor value.
//! 6. Stable-sort by time. Duplicate timestamps are kept.

use super::frame::{parse_bool_literal, ColumnKind, RawColumn, RawFrame, Series, Table};
use super::DataError;
use crate::config::{defaults, DatasetConfig};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

/// Naive formats tried in order after the offset-aware ones.
const NAIVE_FORMATS: [&str; 11] = [
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Offset-aware formats; parsed values are converted to UTC.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"];

/// Parse a timestamp cell. Offsets are normalised to UTC; a bare date means
/// midnight. Returns `None` for anything unrecognised.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Whether an event cell counts as an anomaly.
pub fn is_truthy_event(cell: Option<&str>) -> bool {
    cell.is_some_and(|s| {
        let s = s.trim().to_lowercase();
        defaults::TRUTHY_EVENT_VALUES.contains(&s.as_str())
    })
}

// ============================================================================
// Options & Schema
// ============================================================================

/// Column choices for [`prepare_time_series`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareOptions {
    pub time_col: String,
    pub event_col: String,
    /// Sensor columns to keep; `None` infers every numeric column.
    pub numeric_cols: Option<Vec<String>>,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            time_col: defaults::TIME_COLUMN.to_string(),
            event_col: defaults::EVENT_COLUMN.to_string(),
            numeric_cols: None,
        }
    }
}

impl From<&DatasetConfig> for PrepareOptions {
    fn from(cfg: &DatasetConfig) -> Self {
        Self {
            time_col: cfg.time_column.clone(),
            event_col: cfg.event_column.clone(),
            numeric_cols: None,
        }
    }
}

impl PrepareOptions {
    pub fn with_numeric_cols(mut self, cols: Vec<String>) -> Self {
        self.numeric_cols = Some(cols);
        self
    }

    /// Pin down which columns preparation reads.
    pub fn resolve_schema(&self, frame: &RawFrame) -> Schema {
        let sensors = self.numeric_cols.clone().unwrap_or_else(|| {
            frame
                .columns()
                .iter()
                .filter(|c| c.name != self.event_col && c.name != self.time_col)
                .filter(|c| c.kind().is_numeric())
                .map(|c| c.name.clone())
                .collect()
        });
        Schema {
            time_col: self.time_col.clone(),
            event_col: self.event_col.clone(),
            sensors,
        }
    }
}

/// The resolved column layout of one preparation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub time_col: String,
    pub event_col: String,
    pub sensors: Vec<String>,
}

// ============================================================================
// Preparation
// ============================================================================

/// Clean a raw frame into a time-indexed [`Table`].
///
/// A missing time column or selected sensor column is an error; a missing
/// event column yields all-false flags and a warning.
pub fn prepare_time_series(frame: &RawFrame, opts: &PrepareOptions) -> Result<Table, DataError> {
    let schema = opts.resolve_schema(frame);
    prepare_with_schema(frame, &schema)
}

fn prepare_with_schema(frame: &RawFrame, schema: &Schema) -> Result<Table, DataError> {
    let time = lookup(frame, &schema.time_col)?;
    let sensor_values = schema
        .sensors
        .iter()
        .map(|name| lookup(frame, name).map(RawColumn::to_f64))
        .collect::<Result<Vec<_>, _>>()?;

    let event = frame
        .column(&schema.event_col)
        .map(|c| (c, c.kind() == ColumnKind::Bool));
    match event {
        None => warn!(column = %schema.event_col, "Event column absent, all rows marked normal"),
        Some((_, is_bool)) => debug!(column = %schema.event_col, is_bool, "Event column found"),
    }

    let mut rows: Vec<(NaiveDateTime, Vec<f64>, bool)> = Vec::with_capacity(frame.n_rows());
    for i in 0..frame.n_rows() {
        let Some(t) = time.cells[i].as_deref().and_then(parse_timestamp) else {
            continue;
        };
        let values: Option<Vec<f64>> = sensor_values.iter().map(|c| c[i]).collect();
        let Some(values) = values else {
            continue;
        };
        let flag = event.is_some_and(|(c, is_bool)| event_flag(c, is_bool, i));
        rows.push((t, values, flag));
    }

    let dropped = frame.n_rows() - rows.len();
    if dropped > 0 {
        debug!(dropped, kept = rows.len(), "Dropped rows with missing time or sensor values");
    }

    rows.sort_by_key(|(t, _, _)| *t);

    let mut index = Vec::with_capacity(rows.len());
    let mut events = Vec::with_capacity(rows.len());
    let mut series: Vec<Series> = schema
        .sensors
        .iter()
        .map(|name| Series {
            name: name.clone(),
            values: Vec::with_capacity(rows.len()),
        })
        .collect();
    for (t, values, flag) in rows {
        index.push(t);
        events.push(flag);
        for (s, v) in series.iter_mut().zip(values) {
            s.values.push(v);
        }
    }

    Table::from_parts(&schema.time_col, index, series, &schema.event_col, events)
}

fn lookup<'a>(frame: &'a RawFrame, name: &str) -> Result<&'a RawColumn, DataError> {
    frame
        .column(name)
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))
}

fn event_flag(column: &RawColumn, is_bool: bool, row: usize) -> bool {
    let cell = column.cells[row].as_deref();
    if is_bool {
        cell.and_then(parse_bool_literal).unwrap_or(false)
    } else {
        is_truthy_event(cell)
    }
}
