//! Config Validation Tests
//!
//! Typo detection on raw TOML and range validation of loaded configs,
//! exercised through the public config API.

use std::io::Write;

use wqdab::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use wqdab::config::{ConfigError, ToolkitConfig};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_plot_key_warns_with_suggestion() {
    let toml_str = r#"
[plots]
histogram_bnis = 40
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("histogram_bnis"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("plots.histogram_bins"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn typo_in_section_name_warns() {
    let toml_str = r#"
[dataset]
evnt_column = "LABEL"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("dataset.event_column")
    );
}

#[test]
fn full_valid_config_produces_zero_warnings() {
    let toml_str = r#"
[paths]
root = "/srv/wqdab"

[dataset]
file_name = "1_gecco2018_water_quality.csv"
time_column = "Time"
event_column = "EVENT"
sensors = ["Tp", "Cl", "pH", "Redox", "Leit", "Trueb", "Cl_2", "Fm", "Fm_2"]

[windows]
margin_minutes = 90

[plots]
dpi = 120
zoom_size = [14.0, 4.0]
batch_size = [14.0, 10.0]
zoom_prefix = "zoom"
max_panels_per_figure = 2
histogram_bins = 50
histogram_max_columns = 6
resample_minutes = 30

[baselines]
seed = 7
n_estimators = 200
max_samples = 128
lof_neighbors = 10
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
    let config: ToolkitConfig = toml::from_str(toml_str).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.plots.zoom_prefix, "zoom");
}

#[test]
fn unknown_section_warns() {
    let toml_str = r#"
[plots.colours]
anomaly = "crimson"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(!warnings.is_empty());
    assert!(warnings.iter().any(|w| w.field == "plots.colours"));
}

#[test]
fn multiple_typos_all_warned() {
    let toml_str = r#"
[windows]
margin_minuts = 30

[baselines]
lof_neighbours = 15
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 2, "Expected 2 warnings for 2 typos");
}

#[test]
fn empty_toml_produces_zero_warnings() {
    assert!(validate_unknown_keys("").is_empty());
}

#[test]
fn known_keys_set_is_complete() {
    let mut config = ToolkitConfig::default();
    config.paths.root = Some("/data/wq".into());
    let toml_str = config.to_toml().unwrap();
    let warnings = validate_unknown_keys(&toml_str);
    assert!(
        warnings.is_empty(),
        "Default config serialization should produce 0 unknown-key warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn suggest_correction_finds_close_match() {
    let known = known_config_keys();
    let s = suggest_correction("baselines.n_estimator", &known);
    assert_eq!(s.as_deref(), Some("baselines.n_estimators"));
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    assert!(suggest_correction("zzz_completely_invalid_xyz_12345", &known).is_none());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn negative_margin_is_error() {
    let mut config = ToolkitConfig::default();
    config.windows.margin_minutes = -5;
    match config.validate() {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("margin_minutes")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn zero_margin_is_valid() {
    let mut config = ToolkitConfig::default();
    config.windows.margin_minutes = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn degenerate_figure_sizes_are_errors() {
    let mut config = ToolkitConfig::default();
    config.plots.zoom_size = (0.0, 4.0);
    config.plots.batch_size = (14.0, f64::NAN);
    config.plots.dpi = 0;
    let Err(ConfigError::Validation(errors)) = config.validate() else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 3, "got: {errors:?}");
}

#[test]
fn same_time_and_event_column_is_error() {
    let mut config = ToolkitConfig::default();
    config.dataset.event_column = "Time".into();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("both 'Time'"));
}

#[test]
fn zero_counts_are_errors() {
    let mut config = ToolkitConfig::default();
    config.baselines.n_estimators = 0;
    config.baselines.lof_neighbors = 0;
    config.plots.histogram_bins = 0;
    let Err(ConfigError::Validation(errors)) = config.validate() else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 3);
}

// ============================================================================
// File Loading
// ============================================================================

#[test]
fn load_from_file_rejects_invalid_ranges() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[plots]\nresample_minutes = 0").unwrap();
    let err = ToolkitConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn load_from_file_tolerates_unknown_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[windows]\nmargin_minutes = 15\nmargn = 3").unwrap();
    let config = ToolkitConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.windows.margin_minutes, 15);
}

#[test]
fn parse_errors_carry_the_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[windows]\nmargin_minutes = \"sixty\"").unwrap();
    let err = ToolkitConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(&err, ConfigError::Parse(p, _) if p == file.path()));
}

#[test]
fn save_and_reload_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wqdab.toml");
    let mut config = ToolkitConfig::default();
    config.windows.margin_minutes = 45;
    config.plots.zoom_size = (10.0, 3.0);
    config.save_to_file(&path).unwrap();
    assert_eq!(ToolkitConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn missing_file_is_io_error() {
    let err = ToolkitConfig::load_from_file(std::path::Path::new("/nonexistent/wqdab.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
}
