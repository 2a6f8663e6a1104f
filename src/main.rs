//! WQDAB - Water Quality Dataset Anomaly Benchmark
//!
//! Command-line front end for preparing the GECCO 2018 water quality data,
//! extracting labelled anomaly windows, rendering review figures and scoring
//! rows with the baseline detectors.
//!
//! # Usage
//!
//! ```bash
//! # Seed a project: data/ and reports/figures/ plus a default wqdab.toml
//! wqdab init
//!
//! # Summarise the dataset in data/raw/
//! wqdab inspect
//!
//! # Render every anomaly window into reports/figures/
//! wqdab plot-windows --margin 90
//!
//! # Zoom into an arbitrary range
//! wqdab zoom --start "2017-07-01 10:00" --end "2017-07-01 14:00" --sensors Cl,pH
//!
//! # Work without the real file
//! wqdab synthesize --rows 2880 && wqdab --csv data/raw/synthetic_water_quality.csv inspect
//! ```
//!
//! # Environment Variables
//!
//! - `WQDAB_CONFIG`: path to a TOML config (default: ./wqdab.toml)
//! - `WQDAB_ROOT`: project root (default: nearest directory with wqdab.toml or Cargo.toml)
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use statrs::statistics::Statistics;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wqdab::analysis::correlation_matrix;
use wqdab::anomaly::{extract_windows, WindowOptions};
use wqdab::baselines::{score_all_with, BaselineParams, ISOLATION_FOREST_KEY, LOF_KEY};
use wqdab::config::{ProjectPaths, ToolkitConfig, CONFIG_FILE_NAME};
use wqdab::data::synthetic::{self, SyntheticConfig};
use wqdab::data::{
    load_dataset_csv, prepare_time_series, present_columns, resample_mean, write_raw_csv,
    write_table_csv, PrepareOptions, RawFrame, Table,
};
use wqdab::features::impute_and_scale;
use wqdab::visualization::{
    plot_correlation_heatmap, plot_pairwise_histograms, plot_resampled_means,
    plot_timeseries_with_events, render_all_windows, render_anomaly_zoom, BatchOptions,
    HeatmapOptions, HistogramOptions, ResampledOptions, TimeseriesOptions, ZoomOptions,
    ZoomOutcome, HEATMAP_FILE_NAME,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "wqdab")]
#[command(about = "Water quality anomaly benchmark toolkit")]
#[command(version)]
struct CliArgs {
    /// TOML config file (default: $WQDAB_CONFIG, then ./wqdab.toml, then built-ins)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root holding data/ and reports/
    #[arg(long, global = true, env = "WQDAB_ROOT")]
    root: Option<PathBuf>,

    /// Dataset CSV (default: data/raw/<dataset.file_name>)
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Use a generated dataset instead of a CSV file
    #[arg(long, global = true, conflicts_with = "csv")]
    synthetic: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the data and figure directories and write a default wqdab.toml
    Init {
        /// Overwrite an existing wqdab.toml
        #[arg(long)]
        force: bool,
    },

    /// Print shape, time range, event count and per-sensor statistics
    Inspect,

    /// List anomaly windows
    Windows {
        /// Context margin in minutes, >= 0 (default from config)
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        margin: Option<i64>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render one zoom figure for a time range
    Zoom {
        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        /// Comma-separated sensor names (default: all)
        #[arg(long, value_delimiter = ',')]
        sensors: Option<Vec<String>>,

        /// Output PNG (default: reports/figures/anomaly_zoom.png)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render every anomaly window as {prefix}_{i}.png
    PlotWindows {
        /// Context margin in minutes, >= 0 (default from config)
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        margin: Option<i64>,

        /// Output directory (default: reports/figures)
        #[arg(long)]
        save_dir: Option<PathBuf>,

        /// File name prefix (default from config)
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Time series, histogram, heatmap and resampled-mean figures
    Overview,

    /// Score rows with Isolation Forest and LOF and write a CSV
    Score {
        /// Only score the first N rows (LOF is quadratic in the row count)
        #[arg(long)]
        max_rows: Option<usize>,

        /// Output CSV (default: data/processed/baseline_scores.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write the cleaned table as CSV
    Prepare {
        /// Output CSV (default: data/processed/<dataset stem>_clean.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate a synthetic dataset with labelled event bursts
    Synthesize {
        #[arg(long)]
        rows: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV (default: data/raw/synthetic_water_quality.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Everything a command needs besides its own arguments.
struct Session {
    config: ToolkitConfig,
    paths: ProjectPaths,
    csv: Option<PathBuf>,
    synthetic: bool,
}

// ============================================================================
// Data loading
// ============================================================================

impl Session {
    fn load_frame(&self) -> Result<RawFrame> {
        if self.synthetic {
            info!("Using synthetic dataset");
            let data = synthetic::generate(&SyntheticConfig::default())?;
            info!(rows = data.frame.n_rows(), bursts = data.bursts.len(), "Generated synthetic frame");
            return Ok(data.frame);
        }
        load_dataset_csv(self.csv.as_deref(), &self.paths, &self.config.dataset.file_name)
            .context("Failed to load dataset")
    }

    fn load_table(&self) -> Result<Table> {
        let frame = self.load_frame()?.drop_unnamed();
        let sensors = present_columns(&frame, &self.config.dataset.sensors);
        let mut opts = PrepareOptions::from(&self.config.dataset);
        if sensors.is_empty() {
            warn!("None of the configured sensors are present, inferring numeric columns");
        } else {
            opts = opts.with_numeric_cols(sensors);
        }
        let table = prepare_time_series(&frame, &opts).context("Failed to prepare time series")?;
        info!(
            rows = table.len(),
            dropped = frame.n_rows() - table.len(),
            sensors = table.sensors().len(),
            events = table.event_count(),
            "Dataset prepared"
        );
        Ok(table)
    }

    fn window_options(&self, margin: Option<i64>) -> WindowOptions {
        let mut opts = WindowOptions::from(&self.config.windows);
        if let Some(m) = margin {
            opts.margin_minutes = m;
        }
        opts
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_init(ctx: &Session, force: bool) -> Result<()> {
    ctx.paths
        .ensure_directories_exist()
        .context("Failed to create project directories")?;
    for dir in ctx.paths.managed_directories() {
        println!("  dir   {}", dir.display());
    }

    let config_path = ctx.paths.root.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        println!("  keep  {} (use --force to overwrite)", config_path.display());
    } else {
        ctx.config.save_to_file(&config_path)?;
        println!("  wrote {}", config_path.display());
    }
    Ok(())
}

fn run_inspect(ctx: &Session) -> Result<()> {
    let frame = ctx.load_frame()?;
    println!("Raw shape: {} rows x {} columns", frame.n_rows(), frame.n_cols());
    for column in frame.columns() {
        let missing = column.cells.iter().filter(|c| c.is_none()).count();
        println!("  {:<12} {:<8?} missing={}", column.name, column.kind(), missing);
    }

    let table = ctx.load_table()?;
    println!();
    println!("Prepared: {} rows, {} sensors", table.len(), table.sensors().len());
    if let Some((first, last)) = table.time_range() {
        println!("Time range: {first} -> {last}");
    }
    println!("EVENT true count: {}", table.event_count());
    println!();
    println!("  {:<8} {:>12} {:>12} {:>12} {:>12}", "sensor", "mean", "std", "min", "max");
    for s in table.sensors() {
        let v = s.values.as_slice();
        println!(
            "  {:<8} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            s.name,
            v.mean(),
            v.std_dev(),
            Statistics::min(v),
            Statistics::max(v)
        );
    }

    let windows = extract_windows(&table, &ctx.window_options(None));
    println!();
    println!("Anomaly windows: {}", windows.len());
    Ok(())
}

fn run_windows(ctx: &Session, margin: Option<i64>, json: bool) -> Result<()> {
    let table = ctx.load_table()?;
    let windows = extract_windows(&table, &ctx.window_options(margin));
    if json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
        return Ok(());
    }
    for (i, w) in windows.iter().enumerate() {
        println!("{i:>4}  {w}  ({} min)", w.window_duration().num_minutes());
    }
    println!("{} windows", windows.len());
    Ok(())
}

fn run_zoom(
    ctx: &Session,
    start: &str,
    end: &str,
    sensors: Option<Vec<String>>,
    out: Option<PathBuf>,
) -> Result<()> {
    let table = ctx.load_table()?;
    let opts = ZoomOptions {
        sensors,
        save_path: Some(out.unwrap_or_else(|| ctx.paths.figure("anomaly_zoom.png"))),
        show: false,
        ..ZoomOptions::from_config(&ctx.config.plots)
    };
    match render_anomaly_zoom(&table, start, end, &opts)? {
        ZoomOutcome::Empty => println!("No data between {start} and {end}"),
        ZoomOutcome::Rendered { saved, .. } => {
            if let Some(path) = saved {
                println!("Saved: {}", path.display());
            }
        }
        ZoomOutcome::Failed { error } => anyhow::bail!("Zoom failed: {error}"),
    }
    Ok(())
}

fn run_plot_windows(
    ctx: &Session,
    margin: Option<i64>,
    save_dir: Option<PathBuf>,
    prefix: Option<String>,
) -> Result<()> {
    let table = ctx.load_table()?;
    let windows = extract_windows(&table, &ctx.window_options(margin));
    if windows.is_empty() {
        println!("No anomaly windows found");
        return Ok(());
    }

    let mut opts = BatchOptions::from_config(&ctx.config.plots);
    opts.save_dir = Some(save_dir.unwrap_or_else(|| ctx.paths.figures.clone()));
    if let Some(prefix) = prefix {
        opts.prefix = prefix;
    }
    let outcomes = render_all_windows(&table, &windows, &opts)?;
    let mut failed = 0;
    for (i, outcome) in outcomes.iter().enumerate() {
        match outcome {
            ZoomOutcome::Rendered { saved: Some(path), .. } => println!("Saved: {}", path.display()),
            ZoomOutcome::Failed { error } => {
                eprintln!("Window {i} failed: {error}");
                failed += 1;
            }
            _ => {}
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} windows failed to render", outcomes.len());
    }
    Ok(())
}

fn run_overview(ctx: &Session) -> Result<()> {
    let table = ctx.load_table()?;
    let plots = &ctx.config.plots;
    let figures = &ctx.paths.figures;

    let ts = TimeseriesOptions {
        save_dir: Some(figures.clone()),
        show: false,
        ..TimeseriesOptions::from_config(plots)
    };
    for figure in plot_timeseries_with_events(&table, None, &ts)? {
        if let Some(path) = figure.saved {
            println!("Saved: {}", path.display());
        }
    }

    let hist = HistogramOptions {
        save_path: Some(figures.join("histograms.png")),
        show: false,
        ..HistogramOptions::from_config(plots)
    };
    print_saved(plot_pairwise_histograms(&table, &hist)?.and_then(|f| f.saved));

    let corr = correlation_matrix(&table, &table.sensor_names())?;
    let heatmap = HeatmapOptions {
        dpi: plots.dpi,
        save_path: Some(figures.join(HEATMAP_FILE_NAME)),
        show: false,
        ..HeatmapOptions::default()
    };
    print_saved(plot_correlation_heatmap(&corr, &heatmap)?.and_then(|f| f.saved));

    let bucket = TimeDelta::try_minutes(plots.resample_minutes)
        .context("resample_minutes out of range")?;
    let resampled = resample_mean(&table, bucket)?;
    let means = ResampledOptions {
        dpi: plots.dpi,
        save_path: Some(figures.join("resampled_mean.png")),
        show: false,
        ..ResampledOptions::default()
    };
    print_saved(plot_resampled_means(&resampled, &means)?.and_then(|f| f.saved));
    Ok(())
}

fn print_saved(path: Option<PathBuf>) {
    if let Some(path) = path {
        println!("Saved: {}", path.display());
    }
}

fn run_score(ctx: &Session, max_rows: Option<usize>, out: Option<PathBuf>) -> Result<()> {
    let mut table = ctx.load_table()?;
    if let Some(n) = max_rows.filter(|&n| n < table.len()) {
        info!(rows = n, of = table.len(), "Scoring the first rows only");
        table = table.slice(0..n);
    }

    let (features, scaler) = impute_and_scale(&table.numeric_frame())?;
    info!(features = scaler.names.len(), rows = features.n_rows(), "Features scaled");
    let scores = score_all_with(&features.rows, &BaselineParams::from(&ctx.config.baselines))?;

    let out = out.unwrap_or_else(|| ctx.paths.processed.join("baseline_scores.csv"));
    write_scores(&out, &table, &scores[ISOLATION_FOREST_KEY], &scores[LOF_KEY])?;
    println!("Saved: {}", out.display());

    let mut ranked: Vec<usize> = (0..table.len()).collect();
    ranked.sort_by(|&a, &b| scores[ISOLATION_FOREST_KEY][b].total_cmp(&scores[ISOLATION_FOREST_KEY][a]));
    println!();
    println!("  {:<20} {:>6} {:>16} {:>6}", "time", "EVENT", ISOLATION_FOREST_KEY, LOF_KEY);
    for &row in ranked.iter().take(10) {
        println!(
            "  {:<20} {:>6} {:>16.4} {:>6}",
            table.index()[row].format("%Y-%m-%d %H:%M:%S"),
            table.events()[row],
            scores[ISOLATION_FOREST_KEY][row],
            scores[LOF_KEY][row]
        );
    }
    Ok(())
}

fn write_scores(path: &Path, table: &Table, iforest: &[f64], lof: &[f64]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    writer.write_record([
        table.time_column(),
        table.event_column(),
        ISOLATION_FOREST_KEY,
        LOF_KEY,
    ])?;
    for (row, t) in table.index().iter().enumerate() {
        writer.write_record([
            t.format("%Y-%m-%d %H:%M:%S").to_string(),
            if table.events()[row] { "True" } else { "False" }.to_string(),
            iforest[row].to_string(),
            lof[row].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn run_prepare(ctx: &Session, out: Option<PathBuf>) -> Result<()> {
    let table = ctx.load_table()?;
    let out = out.unwrap_or_else(|| {
        let stem = ctx
            .csv
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .map_or_else(
                || {
                    Path::new(&ctx.config.dataset.file_name)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("dataset")
                        .to_string()
                },
                str::to_string,
            );
        ctx.paths.processed.join(format!("{stem}_clean.csv"))
    });
    write_table_csv(&table, &out)?;
    println!("Saved: {} ({} rows)", out.display(), table.len());
    Ok(())
}

fn run_synthesize(
    ctx: &Session,
    rows: Option<usize>,
    seed: Option<u64>,
    out: Option<PathBuf>,
) -> Result<()> {
    let defaults = SyntheticConfig::default();
    let cfg = SyntheticConfig {
        rows: rows.unwrap_or(defaults.rows),
        seed: seed.unwrap_or(defaults.seed),
        ..defaults
    };
    let data = synthetic::generate(&cfg)?;
    let out = out.unwrap_or_else(|| ctx.paths.raw_file("synthetic_water_quality.csv"));
    write_raw_csv(&data.frame, &out)?;
    println!("Saved: {} ({} rows, {} event bursts)", out.display(), data.frame.n_rows(), data.bursts.len());
    for run in &data.bursts {
        println!("  rows {}..{}", run.start, run.end);
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }

    let config = match &args.config {
        Some(path) => ToolkitConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ToolkitConfig::load(),
    };
    let paths = ProjectPaths::detect(args.root.as_deref().or(config.paths.root.as_deref()));
    info!(root = %paths.root.display(), "Project root");

    let ctx = Session {
        config,
        paths,
        csv: args.csv,
        synthetic: args.synthetic,
    };

    match args.command {
        Command::Init { force } => run_init(&ctx, force),
        Command::Inspect => run_inspect(&ctx),
        Command::Windows { margin, json } => run_windows(&ctx, margin, json),
        Command::Zoom {
            start,
            end,
            sensors,
            out,
        } => run_zoom(&ctx, &start, &end, sensors, out),
        Command::PlotWindows {
            margin,
            save_dir,
            prefix,
        } => run_plot_windows(&ctx, margin, save_dir, prefix),
        Command::Overview => run_overview(&ctx),
        Command::Score { max_rows, out } => run_score(&ctx, max_rows, out),
        Command::Prepare { out } => run_prepare(&ctx, out),
        Command::Synthesize { rows, seed, out } => run_synthesize(&ctx, rows, seed, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_margin_is_rejected() {
        for cmd in ["windows", "plot-windows"] {
            let err = CliArgs::try_parse_from(["wqdab", cmd, "--margin=-5"]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{cmd}");
        }
    }

    #[test]
    fn margin_is_parsed() {
        let args = CliArgs::try_parse_from(["wqdab", "windows", "--margin", "0", "--json"]).unwrap();
        assert!(matches!(args.command, Command::Windows { margin: Some(0), json: true }));

        let args = CliArgs::try_parse_from(["wqdab", "plot-windows", "--margin", "90"]).unwrap();
        assert!(matches!(args.command, Command::PlotWindows { margin: Some(90), .. }));
    }
}
