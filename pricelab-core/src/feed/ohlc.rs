//! OHLC bar files (CSV or TSV).
//!
//! Layout is `date, open, high, low, close[, ...]` with a header line. Rows that
//! cannot be read as a bar are skipped rather than failing the whole file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::PriceFeed;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Error)]
pub enum OhlcError {
    #[error("unsupported file extension for {path} (expected .csv or .tsv)")]
    UnsupportedExtension { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed OHLC data: {0}")]
    Csv(#[from] csv::Error),
}

fn delimiter_for(path: &Path) -> Option<u8> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some(b','),
        "tsv" => Some(b'\t'),
        _ => None,
    }
}

/// `true` if the path has a `.csv` or `.tsv` extension (any case).
pub fn is_valid_ohlc_path(path: impl AsRef<Path>) -> bool {
    delimiter_for(path.as_ref()).is_some()
}

/// Parse bars from delimited text.
///
/// The first line is a header. Blank lines, rows with fewer than five columns and
/// rows whose open/high/low/close are not numbers are skipped. Fields are trimmed.
pub fn parse_ohlc(content: &str, delimiter: u8) -> Result<Vec<OhlcBar>, OhlcError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 5 {
            continue;
        }
        let number = |i: usize| record.get(i).and_then(|v| v.parse::<f64>().ok());
        let (Some(open), Some(high), Some(low), Some(close)) =
            (number(1), number(2), number(3), number(4))
        else {
            continue;
        };
        if [open, high, low, close].iter().any(|v| v.is_nan()) {
            continue;
        }
        bars.push(OhlcBar {
            date: record.get(0).unwrap_or_default().to_string(),
            open,
            high,
            low,
            close,
        });
    }

    tracing::debug!(bars = bars.len(), "parsed OHLC data");
    Ok(bars)
}

/// Read and parse an OHLC file, picking the delimiter from its extension.
pub fn read_ohlc_file(path: impl AsRef<Path>) -> Result<Vec<OhlcBar>, OhlcError> {
    let path = path.as_ref();
    let delimiter = delimiter_for(path).ok_or_else(|| OhlcError::UnsupportedExtension {
        path: path.display().to_string(),
    })?;
    let content = std::fs::read_to_string(path).map_err(|source| OhlcError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_ohlc(&content, delimiter)
}

/// Replays the closes of a bar series, one per call.
#[derive(Debug, Clone)]
pub struct OhlcFeed {
    closes: std::vec::IntoIter<f64>,
}

impl OhlcFeed {
    pub fn new(bars: &[OhlcBar]) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        Self {
            closes: closes.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.closes.len()
    }
}

impl PriceFeed for OhlcFeed {
    fn next_price(&mut self, _current: f64) -> Option<f64> {
        self.closes.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close
2024-01-02, 100.0, 105.0, 99.0, 104.0

2024-01-03,104.0,106.0,101.0,102.5
2024-01-04,bad,106.0,101.0,102.5
2024-01-05,102.5,103.0
2024-01-08,102.5,110.0,102.0,109.0,123456
";

    #[test]
    fn parses_valid_rows_only() {
        let bars = parse_ohlc(SAMPLE, b',').unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, "2024-01-02");
        assert_eq!(bars[0].close, 104.0);
        assert_eq!(bars[1].close, 102.5);
        assert_eq!(bars[2].high, 110.0);
    }

    #[test]
    fn header_only_yields_nothing() {
        assert!(parse_ohlc("Date,Open,High,Low,Close\n", b',').unwrap().is_empty());
        assert!(parse_ohlc("", b',').unwrap().is_empty());
    }

    #[test]
    fn tab_delimited() {
        let content = "date\topen\thigh\tlow\tclose\n2024-01-02\t1\t2\t0.5\t1.5\n";
        let bars = parse_ohlc(content, b'\t').unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].low, 0.5);
    }

    #[test]
    fn nan_values_are_skipped() {
        let content = "d,o,h,l,c\n2024-01-02,NaN,2,1,1.5\n";
        assert!(parse_ohlc(content, b',').unwrap().is_empty());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_valid_ohlc_path("prices.csv"));
        assert!(is_valid_ohlc_path("prices.TSV"));
        assert!(!is_valid_ohlc_path("prices.txt"));
        assert!(!is_valid_ohlc_path("prices"));
    }

    #[test]
    fn unsupported_extension_is_rejected_before_reading() {
        let err = read_ohlc_file("/nonexistent/prices.json").unwrap_err();
        assert!(matches!(err, OhlcError::UnsupportedExtension { .. }));
    }

    #[test]
    fn read_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.tsv");
        std::fs::write(&path, "d\to\th\tl\tc\n2024-01-02\t1\t2\t0.5\t1.5\n").unwrap();
        let bars = read_ohlc_file(&path).unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn feed_yields_closes_then_exhausts() {
        let bars = parse_ohlc(SAMPLE, b',').unwrap();
        let mut feed = OhlcFeed::new(&bars);
        assert_eq!(feed.remaining(), 3);
        assert_eq!(feed.next_price(0.0), Some(104.0));
        assert_eq!(feed.next_price(0.0), Some(102.5));
        assert_eq!(feed.next_price(0.0), Some(109.0));
        assert_eq!(feed.next_price(0.0), None);
    }
}
