//! Anomaly window extraction.
//!
//! A boolean event series is split into maximal runs of `true`. Each run
//! becomes one [`AnomalyWindow`]: the run's first and last timestamps plus a
//! context margin on both sides, clipped to the table's time range.
//!
//! ```text
//! flags:   F F T T F T F
//! runs:        [2,3] [5]
//! windows: (t2 - m, t3 + m), (t5 - m, t5 + m)   clipped to [t0, t6]
//! ```

use crate::config::{defaults, WindowConfig};
use crate::data::Table;
use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// One contiguous anomaly run with its context window.
///
/// Always `window_start <= anomaly_start <= anomaly_end <= window_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnomalyWindow {
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub anomaly_start: NaiveDateTime,
    pub anomaly_end: NaiveDateTime,
}

impl AnomalyWindow {
    /// Length of the anomaly run itself.
    pub fn anomaly_duration(&self) -> TimeDelta {
        self.anomaly_end - self.anomaly_start
    }

    /// Length of the whole context window.
    pub fn window_duration(&self) -> TimeDelta {
        self.window_end - self.window_start
    }
}

impl fmt::Display for AnomalyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FMT: &str = "%Y-%m-%d %H:%M:%S";
        write!(
            f,
            "[{} .. {}] anomaly {} .. {}",
            self.window_start.format(FMT),
            self.window_end.format(FMT),
            self.anomaly_start.format(FMT),
            self.anomaly_end.format(FMT),
        )
    }
}

/// Window extraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOptions {
    /// Context added before and after each run, in minutes.
    pub margin_minutes: i64,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            margin_minutes: defaults::WINDOW_MARGIN_MINUTES,
        }
    }
}

impl From<&WindowConfig> for WindowOptions {
    fn from(cfg: &WindowConfig) -> Self {
        Self {
            margin_minutes: cfg.margin_minutes,
        }
    }
}

impl WindowOptions {
    /// The margin as a duration. Negative margins count as zero.
    pub fn margin(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.margin_minutes.max(0)).unwrap_or(TimeDelta::MAX)
    }
}

/// Extract one window per run of flagged rows in a prepared table.
pub fn extract_windows(table: &Table, opts: &WindowOptions) -> Vec<AnomalyWindow> {
    anomaly_windows(table.index(), table.events(), opts.margin())
}

/// Index positions of every maximal run of `true`, in order.
///
/// A run starts where a flag is true and the previous one false (or at the
/// beginning); it ends where a flag is true and the next one false (or at the
/// end). The i-th start pairs with the i-th end.
pub fn anomaly_runs(flags: &[bool]) -> Vec<RangeInclusive<usize>> {
    let n = flags.len();
    let starts = (0..n).filter(|&i| flags[i] && (i == 0 || !flags[i - 1]));
    let ends = (0..n).filter(|&i| flags[i] && (i + 1 == n || !flags[i + 1]));
    starts.zip(ends).map(|(s, e)| s..=e).collect()
}

/// Windows over a sorted time index and its parallel flag slice.
///
/// Both slices must have the same length; extra entries in the longer one
/// are ignored. A negative margin is treated as zero.
pub fn anomaly_windows(index: &[NaiveDateTime], flags: &[bool], margin: TimeDelta) -> Vec<AnomalyWindow> {
    let margin = margin.max(TimeDelta::zero());
    let n = index.len().min(flags.len());
    let (Some(&min_time), Some(&max_time)) = (index.first(), index.get(n.saturating_sub(1))) else {
        return Vec::new();
    };

    anomaly_runs(&flags[..n])
        .into_iter()
        .map(|run| {
            let anomaly_start = index[*run.start()];
            let anomaly_end = index[*run.end()];
            let before = anomaly_start.checked_sub_signed(margin).unwrap_or(min_time);
            let after = anomaly_end.checked_add_signed(margin).unwrap_or(max_time);
            AnomalyWindow {
                window_start: before.max(min_time),
                window_end: after.min(max_time),
                anomaly_start,
                anomaly_end,
            }
        })
        .collect()
}
