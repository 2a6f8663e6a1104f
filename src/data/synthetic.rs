//! Synthetic GECCO-shaped datasets.
//!
//! Produces a raw frame with the same layout as the competition CSV (index
//! column, `Time`, the nine sensors, `EVENT`) so the whole pipeline can run
//! without the real file. Sensors follow a daily cycle plus Gaussian noise;
//! event bursts shift the chemistry channels the way contamination does
//! (chlorine and pH drop, turbidity and conductivity rise).

use super::{DataError, RawColumn, RawFrame};
use crate::config::defaults;
use chrono::{DateTime, NaiveDateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::TAU;
use std::ops::Range;
use tracing::info;

// ============================================================================
// Sensor Profiles
// ============================================================================

/// Shape of one synthetic channel.
struct SensorProfile {
    name: &'static str,
    baseline: f64,
    daily_amplitude: f64,
    noise_std: f64,
    /// Offset applied at full event strength.
    event_shift: f64,
}

const PROFILES: [SensorProfile; 9] = [
    SensorProfile { name: "Tp", baseline: 8.0, daily_amplitude: 0.6, noise_std: 0.05, event_shift: 0.0 },
    SensorProfile { name: "Cl", baseline: 0.14, daily_amplitude: 0.01, noise_std: 0.002, event_shift: -0.06 },
    SensorProfile { name: "pH", baseline: 8.45, daily_amplitude: 0.02, noise_std: 0.01, event_shift: -0.35 },
    SensorProfile { name: "Redox", baseline: 760.0, daily_amplitude: 5.0, noise_std: 2.0, event_shift: -60.0 },
    SensorProfile { name: "Leit", baseline: 220.0, daily_amplitude: 3.0, noise_std: 1.0, event_shift: 25.0 },
    SensorProfile { name: "Trueb", baseline: 0.02, daily_amplitude: 0.003, noise_std: 0.002, event_shift: 0.08 },
    SensorProfile { name: "Cl_2", baseline: 0.12, daily_amplitude: 0.01, noise_std: 0.002, event_shift: -0.05 },
    SensorProfile { name: "Fm", baseline: 1400.0, daily_amplitude: 150.0, noise_std: 20.0, event_shift: 0.0 },
    SensorProfile { name: "Fm_2", baseline: 1200.0, daily_amplitude: 120.0, noise_std: 20.0, event_shift: 0.0 },
];

// ============================================================================
// Configuration
// ============================================================================

/// Parameters of a generated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub rows: usize,
    pub seed: u64,
    pub start: NaiveDateTime,
    /// Spacing between samples.
    pub cadence: TimeDelta,
    /// Number of event runs, spread evenly over the rows.
    pub event_bursts: usize,
    /// Inclusive bounds on the length of one run (rows).
    pub burst_length: (usize, usize),
    /// Probability that a sensor cell is left empty.
    pub missing_rate: f64,
    /// Emit a leading unnamed row-number column like spreadsheet exports.
    pub include_index_column: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            rows: defaults::SYNTHETIC_ROWS,
            seed: defaults::BASELINE_SEED,
            start: DateTime::from_timestamp(defaults::SYNTHETIC_START_EPOCH, 0)
                .map(|dt| dt.naive_utc())
                .unwrap_or_default(),
            cadence: TimeDelta::minutes(1),
            event_bursts: 3,
            burst_length: (10, 40),
            missing_rate: 0.002,
            include_index_column: true,
        }
    }
}

impl SyntheticConfig {
    fn validate(&self) -> Result<(), DataError> {
        let (lo, hi) = self.burst_length;
        if lo == 0 || lo > hi {
            return Err(DataError::InvalidParameter(format!(
                "burst_length must satisfy 0 < min <= max, got ({lo}, {hi})"
            )));
        }
        if !(0.0..1.0).contains(&self.missing_rate) {
            return Err(DataError::InvalidParameter(format!(
                "missing_rate must be in [0, 1), got {}",
                self.missing_rate
            )));
        }
        if self.cadence <= TimeDelta::zero() {
            return Err(DataError::InvalidParameter("cadence must be positive".into()));
        }
        Ok(())
    }
}

/// A generated frame plus the row ranges flagged as events.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub frame: RawFrame,
    pub bursts: Vec<Range<usize>>,
}

// ============================================================================
// Generation
// ============================================================================

/// Generate a dataset. The same config always yields the same frame.
pub fn generate(cfg: &SyntheticConfig) -> Result<SyntheticDataset, DataError> {
    cfg.validate()?;
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    let bursts = place_bursts(cfg, &mut rng);
    let mut flags = vec![false; cfg.rows];
    for run in &bursts {
        flags[run.clone()].fill(true);
    }

    let mut columns = Vec::with_capacity(PROFILES.len() + 3);
    if cfg.include_index_column {
        columns.push(RawColumn::new(
            "Unnamed: 0",
            (0..cfg.rows).map(|i| Some(i.to_string())).collect(),
        ));
    }

    let mut times = Vec::with_capacity(cfg.rows);
    let mut t = cfg.start;
    for _ in 0..cfg.rows {
        times.push(Some(t.format("%Y-%m-%d %H:%M:%S").to_string()));
        t = t.checked_add_signed(cfg.cadence).unwrap_or(t);
    }
    columns.push(RawColumn::new(defaults::TIME_COLUMN, times));

    let cadence_minutes = cfg.cadence.num_seconds() as f64 / 60.0;
    for profile in &PROFILES {
        let noise = Normal::new(0.0, profile.noise_std)
            .map_err(|e| DataError::InvalidParameter(format!("{}: {e}", profile.name)))?;
        let cells = (0..cfg.rows)
            .map(|i| {
                let minutes = i as f64 * cadence_minutes;
                let cycle = (TAU * minutes / 1440.0).sin();
                let strength = event_strength(&bursts, i);
                let value = profile.baseline
                    + profile.daily_amplitude * cycle
                    + noise.sample(&mut rng)
                    + profile.event_shift * strength;
                let missing = cfg.missing_rate > 0.0 && rng.gen::<f64>() < cfg.missing_rate;
                (!missing).then(|| format!("{value:.4}"))
            })
            .collect();
        columns.push(RawColumn::new(profile.name, cells));
    }

    columns.push(RawColumn::new(
        defaults::EVENT_COLUMN,
        flags
            .iter()
            .map(|&f| Some(if f { "True" } else { "False" }.to_string()))
            .collect(),
    ));

    let frame = RawFrame::from_columns(columns)?;
    info!(
        rows = cfg.rows,
        seed = cfg.seed,
        bursts = bursts.len(),
        event_rows = flags.iter().filter(|&&f| f).count(),
        "Synthetic dataset generated"
    );
    Ok(SyntheticDataset { frame, bursts })
}

/// One run per equal segment of the rows, never touching the next segment,
/// so every run stays a separate window.
fn place_bursts(cfg: &SyntheticConfig, rng: &mut StdRng) -> Vec<Range<usize>> {
    if cfg.event_bursts == 0 || cfg.rows == 0 {
        return Vec::new();
    }
    let segment = cfg.rows / cfg.event_bursts;
    if segment < 2 {
        return Vec::new();
    }

    (0..cfg.event_bursts)
        .map(|k| {
            let seg_start = k * segment;
            let len = rng
                .gen_range(cfg.burst_length.0..=cfg.burst_length.1)
                .min(segment - 1);
            let slack = segment - len;
            let start = seg_start + rng.gen_range(0..slack);
            start..start + len
        })
        .collect()
}

/// Ramp up over the first few samples of a run, hold, ramp down.
fn event_strength(bursts: &[Range<usize>], row: usize) -> f64 {
    bursts
        .iter()
        .find(|r| r.contains(&row))
        .map_or(0.0, |r| {
            let from_start = (row - r.start + 1) as f64;
            let from_end = (r.end - row) as f64;
            (from_start.min(from_end) / 3.0).min(1.0)
        })
}
