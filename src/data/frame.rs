//! In-memory frames.
//!
//! `RawFrame` mirrors a CSV file: named columns of optional string cells.
//! `Table` is the prepared form: a sorted time index, numeric sensor series
//! with no gaps, and one boolean event flag per row.

use super::DataError;
use chrono::NaiveDateTime;
use polars::prelude::{self as pl, NamedFrom};
use std::ops::Range;

/// Cell spellings treated as missing when a CSV is read.
pub(crate) const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Time format used when a prepared table is written back out.
pub(crate) const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Inferred storage type of a raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// One named column of raw cells. `None` is a missing marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub cells: Vec<Option<String>>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// The trimmed cells as a polars string series.
    pub fn to_series(&self) -> pl::Series {
        let cells: Vec<Option<&str>> = self
            .cells
            .iter()
            .map(|c| c.as_deref().map(str::trim))
            .collect();
        pl::Series::new(self.name.as_str().into(), cells)
    }

    /// Non-strict cast: cells that do not parse as `dtype` become null.
    fn cast(&self, dtype: &pl::DataType) -> Option<pl::Series> {
        self.to_series().cast(dtype).ok()
    }

    /// Parse every cell as `f64`. Unparseable and NaN cells are missing,
    /// infinities are kept.
    pub fn to_f64(&self) -> Vec<Option<f64>> {
        self.cast(&pl::DataType::Float64)
            .and_then(|s| {
                let ca = s.f64().ok()?;
                Some(ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect())
            })
            .unwrap_or_else(|| vec![None; self.cells.len()])
    }

    /// Infer the column type from its non-missing cells.
    ///
    /// A column with no values counts as float. Boolean columns must have no
    /// missing cells.
    pub fn kind(&self) -> ColumnKind {
        let present = self.cells.iter().flatten().count();
        if present == 0 {
            return ColumnKind::Float;
        }
        let parsed = |dtype: pl::DataType| self.cast(&dtype).map_or(0, |s| s.len() - s.null_count());

        if parsed(pl::DataType::Int64) == present {
            return ColumnKind::Integer;
        }
        if parsed(pl::DataType::Float64) == present {
            return ColumnKind::Float;
        }
        let complete = present == self.cells.len();
        if complete
            && self
                .cells
                .iter()
                .flatten()
                .all(|v| parse_bool_literal(v.trim()).is_some())
        {
            return ColumnKind::Bool;
        }
        ColumnKind::Text
    }
}

pub(crate) fn parse_bool_literal(s: &str) -> Option<bool> {
    match s {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

pub(crate) fn normalize_cell(cell: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&cell) {
        None
    } else {
        Some(cell.to_string())
    }
}

// ============================================================================
// RawFrame
// ============================================================================

/// A CSV file held as string cells, column-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    columns: Vec<RawColumn>,
    n_rows: usize,
}

impl RawFrame {
    /// Build from a header and row-major records. Every record must have one
    /// cell per header; empty header names become `Unnamed: {i}`.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self, DataError> {
        let width = headers.len();
        let mut columns: Vec<RawColumn> = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let name = if h.trim().is_empty() {
                    format!("Unnamed: {i}")
                } else {
                    h
                };
                RawColumn::new(name, Vec::with_capacity(rows.len()))
            })
            .collect();

        let n_rows = rows.len();
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(DataError::RaggedRow {
                    row: row_idx,
                    expected: width,
                    found: row.len(),
                });
            }
            for (col, cell) in columns.iter_mut().zip(row) {
                col.cells.push(cell);
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Build from whole columns, which must share one length.
    pub fn from_columns(columns: Vec<RawColumn>) -> Result<Self, DataError> {
        let n_rows = columns.first().map_or(0, |c| c.cells.len());
        if let Some(bad) = columns.iter().find(|c| c.cells.len() != n_rows) {
            return Err(DataError::LengthMismatch {
                column: bad.name.clone(),
                expected: n_rows,
                found: bad.cells.len(),
            });
        }
        Ok(Self { columns, n_rows })
    }

    pub const fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cells of row `idx` in column order.
    pub fn row(&self, idx: usize) -> Option<Vec<Option<&str>>> {
        (idx < self.n_rows).then(|| {
            self.columns
                .iter()
                .map(|c| c.cells[idx].as_deref())
                .collect()
        })
    }

    /// Remove index columns written by spreadsheet exports (`Unnamed: *`).
    pub fn drop_unnamed(mut self) -> Self {
        self.columns.retain(|c| !c.name.starts_with("Unnamed"));
        self
    }

    /// Keep the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.n_rows);
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| RawColumn::new(c.name.clone(), c.cells[..n].to_vec()))
                .collect(),
            n_rows: n,
        }
    }

    /// Every integer or float column, parsed; unparseable or NaN cells are
    /// missing.
    pub fn numeric_frame(&self) -> NumericFrame {
        let (names, columns) = self
            .columns
            .iter()
            .filter(|c| c.kind().is_numeric())
            .map(|c| (c.name.clone(), c.to_f64()))
            .unzip();
        NumericFrame { names, columns }
    }
}

// ============================================================================
// NumericFrame
// ============================================================================

/// Named numeric columns that may contain gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericFrame {
    pub names: Vec<String>,
    pub columns: Vec<Vec<Option<f64>>>,
}

impl NumericFrame {
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }
}

// ============================================================================
// Table
// ============================================================================

/// One named sensor series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// A prepared, time-indexed sensor table.
///
/// Invariants: the index is non-decreasing, every sensor series and the
/// event vector have one entry per index row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    time_col: String,
    index: Vec<NaiveDateTime>,
    sensors: Vec<Series>,
    event_col: String,
    events: Vec<bool>,
}

impl Table {
    /// Assemble a table, checking lengths and index order.
    pub fn from_parts(
        time_col: impl Into<String>,
        index: Vec<NaiveDateTime>,
        sensors: Vec<Series>,
        event_col: impl Into<String>,
        events: Vec<bool>,
    ) -> Result<Self, DataError> {
        let n = index.len();
        let event_col = event_col.into();
        if events.len() != n {
            return Err(DataError::LengthMismatch {
                column: event_col,
                expected: n,
                found: events.len(),
            });
        }
        if let Some(bad) = sensors.iter().find(|s| s.values.len() != n) {
            return Err(DataError::LengthMismatch {
                column: bad.name.clone(),
                expected: n,
                found: bad.values.len(),
            });
        }
        if let Some(pos) = index.windows(2).position(|w| w[1] < w[0]) {
            return Err(DataError::Unsorted(pos + 1));
        }
        Ok(Self {
            time_col: time_col.into(),
            index,
            sensors,
            event_col,
            events,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn time_column(&self) -> &str {
        &self.time_col
    }

    pub fn event_column(&self) -> &str {
        &self.event_col
    }

    pub fn events(&self) -> &[bool] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.iter().filter(|&&e| e).count()
    }

    pub fn sensors(&self) -> &[Series] {
        &self.sensors
    }

    pub fn sensor_names(&self) -> Vec<String> {
        self.sensors.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sensor(&self, name: &str) -> Option<&[f64]> {
        self.sensors
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.values.as_slice())
    }

    /// First and last timestamps, `None` for an empty table.
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.index.first()?, *self.index.last()?))
    }

    /// Row positions with `start <= t <= end`.
    pub fn rows_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Range<usize> {
        let lo = self.index.partition_point(|t| *t < start);
        let hi = self.index.partition_point(|t| *t <= end);
        lo..hi.max(lo)
    }

    /// Copy of the rows in `range`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let range = range.start.min(self.len())..range.end.min(self.len());
        Self {
            time_col: self.time_col.clone(),
            index: self.index[range.clone()].to_vec(),
            sensors: self
                .sensors
                .iter()
                .map(|s| Series {
                    name: s.name.clone(),
                    values: s.values[range.clone()].to_vec(),
                })
                .collect(),
            event_col: self.event_col.clone(),
            events: self.events[range].to_vec(),
        }
    }

    /// Row-major feature matrix over `names`, in the given order.
    pub fn to_matrix(&self, names: &[String]) -> Result<Vec<Vec<f64>>, DataError> {
        let cols = names
            .iter()
            .map(|n| self.sensor(n).ok_or_else(|| DataError::MissingColumn(n.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((0..self.len())
            .map(|row| cols.iter().map(|c| c[row]).collect())
            .collect())
    }

    /// Every sensor as a gap-free numeric frame.
    pub fn numeric_frame(&self) -> NumericFrame {
        NumericFrame {
            names: self.sensor_names(),
            columns: self
                .sensors
                .iter()
                .map(|s| s.values.iter().copied().map(Some).collect())
                .collect(),
        }
    }

    /// Back to string cells: time, sensors, then the event flag.
    pub fn to_raw_frame(&self) -> RawFrame {
        let mut columns = Vec::with_capacity(self.sensors.len() + 2);
        columns.push(RawColumn::new(
            self.time_col.clone(),
            self.index
                .iter()
                .map(|t| Some(t.format(EXPORT_TIME_FORMAT).to_string()))
                .collect(),
        ));
        for s in &self.sensors {
            columns.push(RawColumn::new(
                s.name.clone(),
                s.values.iter().map(|v| Some(v.to_string())).collect(),
            ));
        }
        columns.push(RawColumn::new(
            self.event_col.clone(),
            self.events
                .iter()
                .map(|&e| Some(if e { "True" } else { "False" }.to_string()))
                .collect(),
        ));
        RawFrame {
            n_rows: self.len(),
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| normalize_cell(v)).collect()
    }

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 7, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn kind_inference() {
        assert_eq!(RawColumn::new("a", cells(&["1", "2", ""])).kind(), ColumnKind::Integer);
        assert_eq!(RawColumn::new("a", cells(&["1", "2.5"])).kind(), ColumnKind::Float);
        assert_eq!(RawColumn::new("a", cells(&["", "NaN"])).kind(), ColumnKind::Float);
        assert_eq!(RawColumn::new("a", cells(&["True", "False"])).kind(), ColumnKind::Bool);
        assert_eq!(RawColumn::new("a", cells(&["True", ""])).kind(), ColumnKind::Text);
        assert_eq!(RawColumn::new("a", cells(&["yes", "no"])).kind(), ColumnKind::Text);
    }

    #[test]
    fn to_f64_drops_unparseable_and_nan_cells() {
        let column = RawColumn::new(
            "Cl",
            vec![Some(" 1.5 ".into()), Some("NaN".into()), Some("abc".into()), None, Some("-2.5".into())],
        );
        assert_eq!(column.to_f64(), vec![Some(1.5), None, None, None, Some(-2.5)]);
        assert_eq!(column.to_series().null_count(), 1);
    }

    #[test]
    fn empty_headers_become_unnamed_and_can_be_dropped() {
        let frame = RawFrame::from_rows(
            vec![String::new(), "Tp".into()],
            vec![cells(&["0", "8.1"]), cells(&["1", "8.2"])],
        )
        .unwrap();
        assert_eq!(frame.column_names(), vec!["Unnamed: 0", "Tp"]);
        let frame = frame.drop_unnamed();
        assert_eq!(frame.shape(), (2, 1));
    }

    #[test]
    fn head_keeps_leading_rows() {
        let frame = RawFrame::from_columns(vec![RawColumn::new("Tp", cells(&["1", "2", "3"]))]).unwrap();
        let head = frame.head(2);
        assert_eq!(head.shape(), (2, 1));
        assert_eq!(head.row(1), Some(vec![Some("2")]));
        assert_eq!(head.row(2), None);
        assert_eq!(frame.head(10), frame);
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = RawFrame::from_rows(vec!["a".into(), "b".into()], vec![cells(&["1"])]);
        assert!(matches!(err, Err(DataError::RaggedRow { row: 0, .. })));
    }

    #[test]
    fn numeric_frame_skips_text_columns() {
        let frame = RawFrame::from_columns(vec![
            RawColumn::new("Time", cells(&["2017-07-01", "2017-07-02"])),
            RawColumn::new("Tp", cells(&["8.1", "x"])),
            RawColumn::new("Cl", cells(&["0.1", ""])),
        ])
        .unwrap();
        let numeric = frame.numeric_frame();
        assert_eq!(numeric.names, vec!["Cl"]);
        assert_eq!(numeric.columns[0], vec![Some(0.1), None]);
    }

    #[test]
    fn table_rejects_unsorted_index() {
        let err = Table::from_parts("Time", vec![ts(1, 0), ts(0, 0)], vec![], "EVENT", vec![false, false]);
        assert!(matches!(err, Err(DataError::Unsorted(1))));
    }

    #[test]
    fn rows_between_is_inclusive() {
        let index = vec![ts(0, 0), ts(0, 1), ts(0, 2), ts(0, 3)];
        let table = Table::from_parts(
            "Time",
            index,
            vec![Series { name: "Tp".into(), values: vec![1.0, 2.0, 3.0, 4.0] }],
            "EVENT",
            vec![false; 4],
        )
        .unwrap();
        assert_eq!(table.rows_between(ts(0, 1), ts(0, 2)), 1..3);
        assert_eq!(table.rows_between(ts(1, 0), ts(2, 0)), 4..4);
        assert_eq!(table.rows_between(ts(0, 3), ts(0, 0)), 3..3);
        assert_eq!(table.slice(1..3).sensor("Tp"), Some(&[2.0, 3.0][..]));
    }
}
