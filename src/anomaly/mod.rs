//! Anomaly run segmentation.

mod windows;

pub use windows::{anomaly_runs, anomaly_windows, extract_windows, AnomalyWindow, WindowOptions};
