//! Project directory layout.
//!
//! Every component receives a `ProjectPaths` value instead of reading
//! process-wide constants.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the detected project root.
pub const ROOT_ENV_VAR: &str = "WQDAB_ROOT";

/// Files whose presence marks a directory as the project root.
const ROOT_MARKERS: [&str; 2] = ["wqdab.toml", "Cargo.toml"];

/// Where raw, interim and processed data and report figures live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub data: PathBuf,
    pub raw: PathBuf,
    pub interim: PathBuf,
    pub processed: PathBuf,
    pub external: PathBuf,
    pub notebooks: PathBuf,
    pub reports: PathBuf,
    pub figures: PathBuf,
}

impl ProjectPaths {
    /// Derive the standard layout below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data = root.join("data");
        let reports = root.join("reports");
        Self {
            raw: data.join("raw"),
            interim: data.join("interim"),
            processed: data.join("processed"),
            external: data.join("external"),
            notebooks: root.join("notebooks"),
            figures: reports.join("figures"),
            data,
            reports,
            root,
        }
    }

    /// Resolve the project root.
    ///
    /// Order: the explicit `root` argument, `$WQDAB_ROOT`, the nearest
    /// ancestor of the working directory holding `wqdab.toml` or
    /// `Cargo.toml`, and finally the working directory itself.
    pub fn detect(root: Option<&Path>) -> Self {
        if let Some(root) = root {
            return Self::new(root);
        }
        if let Ok(env_root) = std::env::var(ROOT_ENV_VAR) {
            if !env_root.trim().is_empty() {
                return Self::new(env_root);
            }
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let root = find_marked_ancestor(&cwd).unwrap_or(cwd);
        tracing::debug!(root = %root.display(), "Detected project root");
        Self::new(root)
    }

    /// Directories that `ensure_directories_exist` creates.
    pub fn managed_directories(&self) -> [&Path; 5] {
        [
            &self.raw,
            &self.interim,
            &self.processed,
            &self.external,
            &self.figures,
        ]
    }

    /// Create the data and figure directories. Safe to call repeatedly.
    pub fn ensure_directories_exist(&self) -> io::Result<()> {
        for dir in self.managed_directories() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Location of a raw dataset file.
    pub fn raw_file(&self, file_name: &str) -> PathBuf {
        self.raw.join(file_name)
    }

    /// Location of a figure inside `reports/figures`.
    pub fn figure(&self, file_name: &str) -> PathBuf {
        self.figures.join(file_name)
    }
}

fn find_marked_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|m| dir.join(m).is_file()))
        .map(Path::to_path_buf)
}
