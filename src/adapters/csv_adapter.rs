//! CSV file bar source.
//!
//! One file per ticker, `<TICKER>.csv`, with a header row. Required columns:
//! `date, open, high, low, close, entry_signal, exit_signal`. Optional:
//! `ticker` and `stop`.

use crate::domain::bar::SignalBar;
use crate::domain::error::TradegenError;
use crate::domain::signal::Action;
use crate::ports::data_port::BarSource;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;

const REQUIRED_COLUMNS: [&str; 7] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "entry_signal",
    "exit_signal",
];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    /// Parse bars for `ticker` from CSV text.
    pub fn parse_bars(content: &str, ticker: &str) -> Result<Vec<SignalBar>, TradegenError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = column(name).ok_or_else(|| TradegenError::MissingColumn {
                column: name.to_string(),
            })?;
        }
        let [date_col, open_col, high_col, low_col, close_col, entry_col, exit_col] = required;
        let ticker_col = column("ticker");
        let stop_col = column("stop");

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let field = |col: usize| record.get(col).unwrap_or("");

            if [open_col, high_col, low_col, close_col]
                .iter()
                .all(|&c| field(c).is_empty())
            {
                warn!("{ticker}: skipping row {row} with no prices");
                continue;
            }

            if let Some(col) = ticker_col {
                let found = field(col);
                if !found.is_empty() && found != ticker {
                    return Err(TradegenError::TickerMismatch {
                        expected: ticker.to_string(),
                        found: found.to_string(),
                        bar: row,
                    });
                }
            }

            let datetime = parse_datetime(field(date_col)).ok_or_else(|| {
                TradegenError::data(format!("row {row}: invalid date '{}'", field(date_col)))
            })?;
            let stop = match stop_col.map(field) {
                Some(s) if !s.is_empty() => Some(parse_decimal(s, "stop", row)?),
                _ => None,
            };

            bars.push(SignalBar {
                ticker: ticker.to_string(),
                datetime,
                open: parse_decimal(field(open_col), "open", row)?,
                high: parse_decimal(field(high_col), "high", row)?,
                low: parse_decimal(field(low_col), "low", row)?,
                close: parse_decimal(field(close_col), "close", row)?,
                entry_signal: field(entry_col).parse::<Action>()?,
                exit_signal: field(exit_col).parse::<Action>()?,
                stop,
            });
        }

        bars.sort_by_key(|b| b.datetime);
        Ok(bars)
    }
}

impl BarSource for CsvAdapter {
    fn load_bars(&self, ticker: &str) -> Result<Vec<SignalBar>, TradegenError> {
        let path = self.csv_path(ticker);
        debug!("reading bars from {}", path.display());
        let content = fs::read_to_string(&path)?;
        Self::parse_bars(&content, ticker)
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD_HHMM`.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d_%H%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_decimal(value: &str, column: &str, row: usize) -> Result<Decimal, TradegenError> {
    value
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| {
            TradegenError::data(format!("row {row}: invalid {column} value '{value}': {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    const HEADER: &str = "date,open,high,low,close,entry_signal,exit_signal";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = format!(
            "{HEADER}\n\
            2024-01-15,100.0,110.0,90.0,105.0,buy,wait\n\
            2024-01-16,105.0,115.0,100.0,110.0,wait,wait\n\
            2024-01-17,110.0,120.0,105.0,115.0,wait,sell\n"
        );
        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        (dir, path)
    }

    #[test]
    fn load_bars_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.load_bars("BHP").unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].ticker, "BHP");
        assert_eq!(bars[0].datetime, parse_datetime("2024-01-15").unwrap());
        assert_eq!(bars[0].open, dec!(100.0));
        assert_eq!(bars[0].high, dec!(110));
        assert_eq!(bars[0].low, dec!(90));
        assert_eq!(bars[0].close, dec!(105));
        assert_eq!(bars[0].entry_signal, Action::Buy);
        assert_eq!(bars[2].exit_signal, Action::Sell);
        assert!(bars[0].stop.is_none());
    }

    #[test]
    fn load_bars_missing_file_is_io_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(adapter.load_bars("XYZ"), Err(TradegenError::Io(_))));
    }

    #[test]
    fn missing_required_column() {
        let err = CsvAdapter::parse_bars(
            "date,open,high,low,close,entry_signal\n2024-01-15,1,1,1,1,wait\n",
            "BHP",
        )
        .unwrap_err();
        assert!(matches!(err, TradegenError::MissingColumn { column } if column == "exit_signal"));
    }

    #[test]
    fn columns_in_any_order_with_optional_stop() {
        let content = "Exit_Signal,Entry_Signal,Close,Low,High,Open,Date,Stop\n\
            wait,BUY,10.5,9.5,11,10,2024-01-15,9.0\n\
            sell,wait,11,10,11.5,10.5,2024-01-16,\n";
        let bars = CsvAdapter::parse_bars(content, "BHP").unwrap();
        assert_eq!(bars[0].open, dec!(10));
        assert_eq!(bars[0].entry_signal, Action::Buy);
        assert_eq!(bars[0].stop, Some(dec!(9.0)));
        assert_eq!(bars[1].exit_signal, Action::Sell);
        assert!(bars[1].stop.is_none());
    }

    #[test]
    fn ticker_column_must_match() {
        let content = format!(
            "ticker,{HEADER}\nBHP,2024-01-15,1,1,1,1,wait,wait\nCBA,2024-01-16,1,1,1,1,wait,wait\n"
        );
        let err = CsvAdapter::parse_bars(&content, "BHP").unwrap_err();
        assert!(matches!(
            err,
            TradegenError::TickerMismatch { found, bar: 1, .. } if found == "CBA"
        ));
    }

    #[test]
    fn unknown_marker_is_rejected() {
        let content = format!("{HEADER}\n2024-01-15,1,1,1,1,hold,wait\n");
        assert!(matches!(
            CsvAdapter::parse_bars(&content, "BHP").unwrap_err(),
            TradegenError::UnknownVariant { .. }
        ));
    }

    #[test]
    fn invalid_price_is_data_error() {
        let content = format!("{HEADER}\n2024-01-15,abc,1,1,1,wait,wait\n");
        assert!(matches!(
            CsvAdapter::parse_bars(&content, "BHP").unwrap_err(),
            TradegenError::Data { .. }
        ));
    }

    #[test]
    fn rows_without_prices_are_skipped() {
        let content = format!("{HEADER}\n2024-01-15,1,1,1,1,wait,wait\n2024-01-16,,,,,wait,wait\n");
        assert_eq!(CsvAdapter::parse_bars(&content, "BHP").unwrap().len(), 1);
    }

    #[test]
    fn parse_datetime_formats() {
        let midnight = parse_datetime("2024-01-15").unwrap();
        assert_eq!(midnight.to_string(), "2024-01-15 00:00:00");
        let full = parse_datetime("2024-01-15 09:30:00").unwrap();
        assert_eq!(full.to_string(), "2024-01-15 09:30:00");
        let compact = parse_datetime("2024-01-15_0930").unwrap();
        assert_eq!(compact, full);
        assert!(parse_datetime("15/01/2024").is_none());
    }
}
