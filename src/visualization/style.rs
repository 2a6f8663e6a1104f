//! Colours, sizes and axis helpers shared by all figures.

use chrono::{NaiveDateTime, TimeDelta};
use plotters::style::RGBColor;
use std::ops::Range;

pub const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);
pub const CRIMSON: RGBColor = RGBColor(220, 20, 60);
pub const GRID_GREY: RGBColor = RGBColor(210, 210, 210);

/// Default line cycle (tab10).
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

pub const FONT: &str = "sans-serif";

/// Figure size in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureSize {
    pub width: f64,
    pub height: f64,
}

impl FigureSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Pixel dimensions at `dpi`, or `None` if either side rounds to zero.
    pub fn pixels(self, dpi: u32) -> Option<(u32, u32)> {
        let to_px = |inches: f64| {
            let px = (inches * f64::from(dpi)).round();
            (px.is_finite() && px >= 1.0 && px <= f64::from(u32::MAX)).then_some(px as u32)
        };
        Some((to_px(self.width)?, to_px(self.height)?))
    }
}

impl From<(f64, f64)> for FigureSize {
    fn from((width, height): (f64, f64)) -> Self {
        Self { width, height }
    }
}

/// Minutes from `origin` to `t`, the x coordinate of every time axis.
pub fn minutes_since(origin: NaiveDateTime, t: NaiveDateTime) -> f64 {
    (t - origin).num_milliseconds() as f64 / 60_000.0
}

/// Tick label for an x coordinate produced by [`minutes_since`].
pub fn time_label(origin: NaiveDateTime, minutes: f64, format: &str) -> String {
    let offset = TimeDelta::try_milliseconds((minutes * 60_000.0).round() as i64).unwrap_or_default();
    origin
        .checked_add_signed(offset)
        .map_or_else(String::new, |t| t.format(format).to_string())
}

/// Tick format suited to the span of an axis.
pub fn time_format_for_span(span_minutes: f64) -> &'static str {
    if span_minutes <= 24.0 * 60.0 {
        "%m-%d %H:%M"
    } else {
        "%Y-%m-%d"
    }
}

/// An x range that is never empty.
pub fn x_range(span_minutes: f64) -> Range<f64> {
    if span_minutes > 0.0 {
        0.0..span_minutes
    } else {
        -0.5..0.5
    }
}

/// Finite min/max of `values` padded by 5%; a flat series gets a unit band.
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if hi - lo <= f64::EPSILON * lo.abs().max(1.0) {
        return (lo - 0.5)..(hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

/// Diverging blue-white-red colour for a value in [-1, 1], white at 0.
pub fn diverging(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);
    let v = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
    let (end, t) = if v < 0.0 { (COLD, -v) } else { (WARM, v) };
    let mix = |c: f64| (255.0 + (c - 255.0) * t).round() as u8;
    RGBColor(mix(end.0), mix(end.1), mix(end.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn pixels_at_dpi() {
        assert_eq!(FigureSize::new(14.0, 4.0).pixels(150), Some((2100, 600)));
        assert_eq!(FigureSize::new(0.0, 4.0).pixels(150), None);
        assert_eq!(FigureSize::new(14.0, f64::NAN).pixels(150), None);
    }

    #[test]
    fn minutes_and_labels_roundtrip() {
        let t0 = NaiveDate::from_ymd_opt(2017, 7, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let t1 = t0 + TimeDelta::minutes(90);
        let m = minutes_since(t0, t1);
        assert_eq!(m, 90.0);
        assert_eq!(time_label(t0, m, "%H:%M"), "11:30");
    }

    #[test]
    fn ranges_are_never_empty() {
        assert_eq!(padded_range([2.0, 2.0]), 1.5..2.5);
        assert_eq!(padded_range([]), 0.0..1.0);
        let r = padded_range([0.0, 10.0, f64::INFINITY]);
        assert!((r.start + 0.5).abs() < 1e-12 && (r.end - 10.5).abs() < 1e-12);
        assert_eq!(x_range(0.0), -0.5..0.5);
    }

    #[test]
    fn diverging_is_white_at_zero() {
        assert_eq!(diverging(0.0), RGBColor(255, 255, 255));
        assert_eq!(diverging(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging(f64::NAN), RGBColor(255, 255, 255));
    }
}
