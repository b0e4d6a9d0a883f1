//! Turtle runner: everything around the core engine that touches files.
//!
//! This crate builds on `turtle-core` to provide:
//! - CSV bar loading behind a `BarSource` trait
//! - Synthetic bars for demos and tests
//! - Single-backtest runner with config and dataset fingerprints
//! - Summary metrics and artifact export
//! - The live pyramid state file and the multi-instrument scan

pub mod data_loader;
pub mod export;
pub mod live_state;
pub mod metrics;
pub mod runner;
pub mod scan;
pub mod synthetic;

pub use data_loader::{
    dataset_hash, parse_ohlcv_csv, read_ohlcv_csv, BarSource, CsvDirSource, CsvSchema, LoadError,
};
pub use export::{export_json, import_json, load_artifacts, save_artifacts};
pub use live_state::{load_state, save_state, LiveState};
pub use metrics::Summary;
pub use runner::{run_from_source, run_single_backtest, BacktestResult, RunError, SCHEMA_VERSION};
pub use scan::{load_config_dir, read_configs, scan_configs, ScanReport};
pub use synthetic::{bars_to_csv, generate_synthetic_bars};
