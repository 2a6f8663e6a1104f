//! Toolkit Configuration Module
//!
//! Provides the TOML-backed tunables and the project directory layout.
//!
//! ## Loading Order
//!
//! 1. `WQDAB_CONFIG` environment variable (path to TOML file)
//! 2. `wqdab.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! Configuration is a plain value handed to whatever needs it:
//!
//! ```ignore
//! let config = ToolkitConfig::load();
//! let paths = ProjectPaths::detect(config.paths.root.as_deref());
//! paths.ensure_directories_exist()?;
//! ```

mod paths;
mod settings;
pub mod defaults;
pub mod validation;

pub use paths::ProjectPaths;
pub use settings::*;
