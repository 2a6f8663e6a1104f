//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! The raw TOML is parsed into `toml::Value` first, its key tree walked and
//! compared against the known field names. Unknown keys become warnings with
//! a "did you mean?" suggestion; they never break loading.

use std::collections::HashSet;

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `ToolkitConfig`.
///
/// Must be kept in step with the structs in `settings.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [paths]
        "paths",
        "paths.root",
        // [dataset]
        "dataset",
        "dataset.file_name",
        "dataset.time_column",
        "dataset.event_column",
        "dataset.sensors",
        // [windows]
        "windows",
        "windows.margin_minutes",
        // [plots]
        "plots",
        "plots.dpi",
        "plots.zoom_size",
        "plots.batch_size",
        "plots.zoom_prefix",
        "plots.max_panels_per_figure",
        "plots.histogram_bins",
        "plots.histogram_max_columns",
        "plots.resample_minutes",
        // [baselines]
        "baselines",
        "baselines.seed",
        "baselines.n_estimators",
        "baselines.max_samples",
        "baselines.lof_neighbors",
    ];
    keys.iter().copied().collect()
}

/// Collect every dotted key path of a parsed TOML document.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut candidates: Vec<&str> = known.iter().copied().collect();
    candidates.sort_unstable();

    let mut best: Option<(&str, usize)> = None;
    for k in candidates {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((k, dist)),
        }
    }
    best.map(|(k, _)| k.to_string())
}

/// Warn about every key in `raw_toml` that `ToolkitConfig` does not know.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // reported by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(&key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key,
                message,
                suggestion,
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("margin", "margin"), 0);
        assert_eq!(levenshtein("margn", "margin"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn typo_gets_suggestion() {
        let warnings = validate_unknown_keys("[windows]\nmargin_minuts = 30\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "windows.margin_minuts");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("windows.margin_minutes")
        );
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn far_off_key_has_no_suggestion() {
        let warnings = validate_unknown_keys("[completely_unrelated]\nx = 1\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }

    #[test]
    fn valid_document_is_silent() {
        let toml_str = r#"
[dataset]
file_name = "gecco.csv"
sensors = ["Tp", "pH"]

[plots]
dpi = 100
zoom_size = [12.0, 4.0]

[baselines]
seed = 1
"#;
        assert!(validate_unknown_keys(toml_str).is_empty());
    }

    #[test]
    fn broken_toml_defers_to_parser() {
        assert!(validate_unknown_keys("[[[").is_empty());
    }
}
