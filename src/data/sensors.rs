//! GECCO sensor channel selection.

use super::RawFrame;
use crate::config::defaults::STANDARD_SENSORS;

/// Standard GECCO sensors present in `frame`, in canonical order.
pub fn get_standard_sensors(frame: &RawFrame) -> Vec<String> {
    present_columns(frame, &STANDARD_SENSORS)
}

/// The subset of `wanted` that `frame` has, keeping the order of `wanted`.
pub fn present_columns<S: AsRef<str>>(frame: &RawFrame, wanted: &[S]) -> Vec<String> {
    wanted
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| frame.has_column(name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawColumn;

    fn frame_with(names: &[&str]) -> RawFrame {
        RawFrame::from_columns(names.iter().map(|n| RawColumn::new(*n, vec![None])).collect()).unwrap()
    }

    #[test]
    fn keeps_canonical_order() {
        let frame = frame_with(&["EVENT", "pH", "Time", "Tp", "Fm_2", "Extra"]);
        assert_eq!(get_standard_sensors(&frame), vec!["Tp", "pH", "Fm_2"]);
    }

    #[test]
    fn nothing_present() {
        let frame = frame_with(&["Time", "EVENT"]);
        assert!(get_standard_sensors(&frame).is_empty());
    }
}
