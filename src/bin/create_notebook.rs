//! Notebook Generator
//!
//! Writes the time-aware visualisation notebook for the GECCO 2018 dataset.
//!
//! # Usage
//! ```bash
//! ./create-notebook                       # {root}/notebooks/02_visualizations_gecco2018.ipynb
//! ./create-notebook --output /tmp/nb.ipynb
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wqdab::config::ProjectPaths;
use wqdab::notebook::{default_notebook_path, write_notebook};

#[derive(Parser, Debug)]
#[command(name = "create-notebook")]
#[command(about = "Generate the WQDAB visualisation notebook")]
#[command(version)]
struct Args {
    /// Output path (default: notebooks/02_visualizations_gecco2018.ipynb under the project root)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Project root (default: $WQDAB_ROOT or the nearest directory with wqdab.toml / Cargo.toml)
    #[arg(long, env = "WQDAB_ROOT")]
    root: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let out = args
        .output
        .unwrap_or_else(|| default_notebook_path(&ProjectPaths::detect(args.root.as_deref())));

    write_notebook(&out).with_context(|| format!("Failed to write notebook to {}", out.display()))?;
    println!("WROTE {}", out.display());
    Ok(())
}
