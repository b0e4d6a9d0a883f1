//! Bar loading for the runner.
//!
//! Daily OHLCV bars come from CSV files. A `BarSource` resolves the bars for
//! an instrument; `CsvDirSource` reads `{dir}/{symbol}.csv`. Broker-backed
//! sources plug in behind the same trait.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;
use turtle_core::domain::{Bar, InstrumentConfig};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("row {row}: invalid date '{value}'")]
    BadDate { row: usize, value: String },

    #[error("row {row}: invalid {column} '{value}'")]
    BadValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row} ({date}): inconsistent OHLC")]
    InconsistentBar { row: usize, date: NaiveDate },
}

/// Column names for an OHLCV CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSchema {
    pub date_col: String,
    pub open_col: String,
    pub high_col: String,
    pub low_col: String,
    pub close_col: String,
    pub volume_col: String,
}

impl Default for CsvSchema {
    fn default() -> Self {
        Self {
            date_col: "date".into(),
            open_col: "open".into(),
            high_col: "high".into(),
            low_col: "low".into(),
            close_col: "close".into(),
            volume_col: "volume".into(),
        }
    }
}

/// Read bars from a CSV file.
pub fn read_ohlcv_csv(path: &Path, schema: &CsvSchema) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let bars = parse_ohlcv_csv(file, schema)?;
    debug!(path = %path.display(), bars = bars.len(), "loaded CSV bars");
    Ok(bars)
}

/// Parse bars from any CSV reader, sorted ascending by date.
///
/// Dates are read from the first ten characters as `YYYY-MM-DD`, so
/// timestamps like `2024-01-02 00:00:00` are accepted. A row with
/// inconsistent OHLC fails the whole load.
pub fn parse_ohlcv_csv<R: Read>(reader: R, schema: &CsvSchema) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

    let required = [
        &schema.date_col,
        &schema.open_col,
        &schema.high_col,
        &schema.low_col,
        &schema.close_col,
    ];
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !index.contains_key(c.as_str()))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let col = |name: &str| index[name];
    let (date_i, open_i, high_i, low_i, close_i) = (
        col(&schema.date_col),
        col(&schema.open_col),
        col(&schema.high_col),
        col(&schema.low_col),
        col(&schema.close_col),
    );
    let volume_i = index.get(schema.volume_col.as_str()).copied();

    let mut bars = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let raw_date = field(date_i);
        let date = raw_date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or_else(|| LoadError::BadDate {
                row,
                value: raw_date.to_string(),
            })?;

        let price = |i: usize, column: &str| -> Result<f64, LoadError> {
            field(i).parse::<f64>().map_err(|_| LoadError::BadValue {
                row,
                column: column.to_string(),
                value: field(i).to_string(),
            })
        };

        let mut bar = Bar::new(
            date,
            price(open_i, &schema.open_col)?,
            price(high_i, &schema.high_col)?,
            price(low_i, &schema.low_col)?,
            price(close_i, &schema.close_col)?,
        );
        if let Some(v) = volume_i.and_then(|i| field(i).parse::<f64>().ok()) {
            bar = bar.with_volume(v);
        }

        if !bar.is_sane() {
            return Err(LoadError::InconsistentBar { row, date });
        }
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.unwrap_or(0.0).to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Source of completed daily bars for an instrument.
pub trait BarSource: Send + Sync {
    fn daily_bars(&self, instrument: &InstrumentConfig) -> Result<Vec<Bar>, LoadError>;
}

/// Reads `{dir}/{symbol}.csv` with a fixed schema.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
    schema: CsvSchema,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            schema: CsvSchema::default(),
        }
    }

    pub fn with_schema(mut self, schema: CsvSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl BarSource for CsvDirSource {
    fn daily_bars(&self, instrument: &InstrumentConfig) -> Result<Vec<Bar>, LoadError> {
        read_ohlcv_csv(&self.path_for(&instrument.symbol), &self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
date,open,high,low,close,volume
2024-01-03,101,103,100,102,1100
2024-01-02 00:00:00,100,102,99,101,1000
2024-01-04,102,104,101,103,
";

    #[test]
    fn parses_and_sorts_rows() {
        let bars = parse_ohlcv_csv(SAMPLE.as_bytes(), &CsvSchema::default()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].volume, Some(1000.0));
        assert_eq!(bars[2].volume, None);
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn missing_columns_are_named() {
        let csv = "date,open,high,close\n2024-01-02,1,2,1.5\n";
        let err = parse_ohlcv_csv(csv.as_bytes(), &CsvSchema::default()).unwrap_err();
        match err {
            LoadError::MissingColumns(cols) => assert_eq!(cols, vec!["low".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn volume_column_is_optional() {
        let csv = "date,open,high,low,close\n2024-01-02,1,2,0.5,1.5\n";
        let bars = parse_ohlcv_csv(csv.as_bytes(), &CsvSchema::default()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, None);
    }

    #[test]
    fn bad_date_is_an_error() {
        let csv = "date,open,high,low,close\n01/02/2024,1,2,0.5,1.5\n";
        let err = parse_ohlcv_csv(csv.as_bytes(), &CsvSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::BadDate { row: 0, .. }));
    }

    #[test]
    fn inconsistent_row_fails_the_load() {
        let csv = "date,open,high,low,close\n2024-01-02,1,2,0.5,1.5\n2024-01-03,1,0.5,2,1\n";
        let err = parse_ohlcv_csv(csv.as_bytes(), &CsvSchema::default()).unwrap_err();
        match err {
            LoadError::InconsistentBar { row, date } => {
                assert_eq!(row, 1);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_prices_fail_the_load() {
        let csv = "date,open,high,low,close\n2024-01-02,NaN,2,0.5,1.5\n";
        let err = parse_ohlcv_csv(csv.as_bytes(), &CsvSchema::default()).unwrap_err();
        assert!(matches!(err, LoadError::InconsistentBar { row: 0, .. }));
    }

    #[test]
    fn custom_schema() {
        let csv = "Date,O,H,L,C\n2024-01-02,1,2,0.5,1.5\n";
        let schema = CsvSchema {
            date_col: "Date".into(),
            open_col: "O".into(),
            high_col: "H".into(),
            low_col: "L".into(),
            close_col: "C".into(),
            volume_col: "V".into(),
        };
        let bars = parse_ohlcv_csv(csv.as_bytes(), &schema).unwrap();
        assert_eq!(bars[0].close, 1.5);
    }

    #[test]
    fn dataset_hash_is_deterministic() {
        let bars = parse_ohlcv_csv(SAMPLE.as_bytes(), &CsvSchema::default()).unwrap();
        assert_eq!(dataset_hash(&bars), dataset_hash(&bars));
        assert_ne!(dataset_hash(&bars), dataset_hash(&bars[..2]));
        assert_eq!(dataset_hash(&bars).len(), 64);
    }
}
