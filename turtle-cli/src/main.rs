//! Turtle CLI: backtest, live levels, signal scan and synthetic data.
//!
//! Commands:
//! - `backtest`: run a config against a CSV, print the summary, save artifacts
//! - `levels`: print next-session System 2 levels and the order plan
//! - `scan`: report which instruments broke out on their latest bar
//! - `synth`: write a synthetic OHLCV CSV

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use turtle_core::config::TurtleConfig;
use turtle_core::domain::Bar;
use turtle_core::live::{compute_levels, plan_orders, OrderPlan, SignalLevels};
use turtle_runner::{
    bars_to_csv, generate_synthetic_bars, load_state, read_configs, read_ohlcv_csv,
    run_single_backtest, save_artifacts, save_state, scan_configs, BacktestResult, CsvDirSource,
    CsvSchema, LiveState,
};

#[derive(Parser)]
#[command(name = "turtle", about = "Turtle breakout backtester and live level calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest from a config file and an OHLCV CSV.
    Backtest {
        /// Path to a JSON or TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Daily OHLCV CSV.
        #[arg(long)]
        csv: PathBuf,

        /// Artifact directory.
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Print System 2 levels and the orders to stage for the next session.
    Levels {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        csv: PathBuf,

        /// Account equity for sizing. Defaults to the configured starting equity.
        #[arg(long)]
        equity: Option<f64>,

        /// Pyramid state file, updated after planning.
        #[arg(long)]
        state: Option<PathBuf>,

        /// Signed broker position in contracts (negative for short).
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        position: i64,
    },
    /// Scan every config in a directory for breakouts on the latest bar.
    Scan {
        #[arg(long)]
        configs_dir: PathBuf,

        /// Directory holding `{symbol}.csv` files.
        #[arg(long)]
        data_dir: PathBuf,

        /// Write the full report as JSON.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a synthetic OHLCV CSV.
    Synth {
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value_t = 5)]
        years: usize,

        #[arg(long, default_value_t = 7)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest { config, csv, out } => run_backtest_cmd(&config, &csv, &out),
        Commands::Levels {
            config,
            csv,
            equity,
            state,
            position,
        } => run_levels_cmd(&config, &csv, equity, state.as_deref(), position),
        Commands::Scan {
            configs_dir,
            data_dir,
            out,
        } => run_scan_cmd(&configs_dir, &data_dir, out.as_deref()),
        Commands::Synth { out, years, seed } => run_synth_cmd(&out, years, seed),
    }
}

/// Logs go to stderr so stdout stays clean for reports. `RUST_LOG` overrides the level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: &Path) -> Result<TurtleConfig> {
    TurtleConfig::from_file(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    read_ohlcv_csv(path, &CsvSchema::default())
        .with_context(|| format!("failed to read bars from {}", path.display()))
}

fn run_backtest_cmd(config_path: &Path, csv: &Path, out: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let bars = load_bars(csv)?;
    let result = run_single_backtest(&config, &bars)?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, out)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!(
        "=== {} {} .. {} ({} bars) ===",
        result.symbol, result.start_date, result.end_date, result.bar_count
    );
    println!("{}", result.summary.render());
    if let Some(pos) = &result.open_position {
        println!(
            "  open: {} {} units, qty {}, avg {:.4}, stop {:.4}",
            pos.side, pos.units, pos.qty, pos.avg_price, pos.stop_price
        );
    }
}

fn run_levels_cmd(
    config_path: &Path,
    csv: &Path,
    equity: Option<f64>,
    state_path: Option<&Path>,
    position: i64,
) -> Result<()> {
    let config = load_config(config_path)?;
    let bars = load_bars(csv)?;
    let levels = compute_levels(&config, &bars)
        .with_context(|| format!("cannot compute levels for {}", config.instrument.symbol))?;
    let last_close = bars.last().map_or(0.0, |b| b.close);

    let equity = equity.unwrap_or(config.account.starting_equity);
    let mut state = match state_path {
        Some(path) => load_state(path, &config.instrument.symbol),
        None => LiveState::new(config.instrument.symbol.clone()),
    };

    let plan = plan_orders(&config, &levels, equity, state.to_position(position), last_close);
    print_levels(&config, &levels);
    print_plan(&plan);

    if let (Some(path), Some(persisted)) = (state_path, plan.state) {
        state.apply(persisted);
        save_state(path, &state)?;
        info!(path = %path.display(), units = state.units, "state saved");
    }
    Ok(())
}

fn print_levels(config: &TurtleConfig, levels: &SignalLevels) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "NA".to_string(), |x| format!("{x}"));
    println!(
        "=== {} System 2 levels as of {} ===",
        config.instrument.symbol, levels.asof_date
    );
    println!("  N: {:.4}", levels.n);
    println!("  long_entry: {}", fmt(levels.long_entry));
    println!("  short_entry: {}", fmt(levels.short_entry));
    println!("  long_exit: {}", fmt(levels.long_exit));
    println!("  short_exit: {}", fmt(levels.short_exit));
}

fn print_plan(plan: &OrderPlan) {
    println!(
        "=== Orders (equity {:.2}, unit qty {}, position {}) ===",
        plan.equity, plan.qty_unit, plan.position_qty
    );
    if let Some(reason) = &plan.skipped_reason {
        println!("  skipped: {reason}");
    }
    for order in &plan.orders {
        let mut line = format!(
            "  {:?} {:?} {} @ stop {}",
            order.role, order.action, order.qty, order.stop_price
        );
        if let Some(stop) = order.protective_stop {
            line.push_str(&format!(" (protective {stop})"));
        }
        if let Some(group) = &order.oca_group {
            line.push_str(&format!(" oca={group}"));
        }
        println!("{line}");
    }
}

fn run_scan_cmd(configs_dir: &Path, data_dir: &Path, out: Option<&Path>) -> Result<()> {
    let configs = read_configs(configs_dir)?;
    let report = scan_configs(&configs, &CsvDirSource::new(data_dir));

    println!("=== Turtle S2: triggered on the latest bar ===");
    println!("{}", report.render_triggered());

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&report).context("failed to serialize scan report")?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote: {}", path.display());
    }
    Ok(())
}

fn run_synth_cmd(out: &Path, years: usize, seed: u64) -> Result<()> {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).context("invalid start date")?;
    let bars = generate_synthetic_bars(start, years * 365, seed);
    let csv = bars_to_csv(&bars).context("failed to encode bars")?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, csv).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {} bars to {}", bars.len(), out.display());
    Ok(())
}
