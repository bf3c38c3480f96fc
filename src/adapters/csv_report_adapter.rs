//! CSV writer for the trade ledger and annotated signal series.

use crate::domain::bar::AnnotatedBar;
use crate::domain::error::TradegenError;
use crate::domain::position::CompletedTrade;
use crate::ports::report_port::ReportPort;
use log::info;
use std::path::Path;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TRADE_COLUMNS: [&str; 16] = [
    "ticker",
    "seq",
    "entry_datetime",
    "entry_action",
    "entry_lots",
    "entry_price",
    "exit_datetime",
    "exit_action",
    "exit_lots",
    "exit_price",
    "exit_reason",
    "days_held",
    "profit_loss",
    "percent_ret",
    "daily_ret",
    "win",
];

const BAR_COLUMNS: [&str; 13] = [
    "ticker",
    "date",
    "open",
    "high",
    "low",
    "close",
    "entry_signal",
    "exit_signal",
    "stop_price",
    "stop_triggered",
    "trail_price",
    "trail_triggered",
    "exit_reason",
];

pub struct CsvReportAdapter;

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write_trades(
        &self,
        trades: &[CompletedTrade],
        output_path: &Path,
    ) -> Result<(), TradegenError> {
        let mut wtr = csv::Writer::from_path(output_path)?;
        wtr.write_record(TRADE_COLUMNS)?;
        for t in trades {
            wtr.write_record([
                t.ticker.clone(),
                t.seq.to_string(),
                t.entry_datetime.format(DATETIME_FORMAT).to_string(),
                t.entry_action.to_string(),
                t.entry_lots.to_string(),
                t.entry_price.to_string(),
                t.exit_datetime.format(DATETIME_FORMAT).to_string(),
                t.exit_action.to_string(),
                t.exit_lots.to_string(),
                t.exit_price.to_string(),
                t.exit_reason.to_string(),
                t.days_held().to_string(),
                t.profit_loss().to_string(),
                t.percent_ret().to_string(),
                optional(t.daily_ret()),
                t.win().to_string(),
            ])?;
        }
        wtr.flush()?;
        info!("wrote {} trades to {}", trades.len(), output_path.display());
        Ok(())
    }

    fn write_bars(&self, bars: &[AnnotatedBar], output_path: &Path) -> Result<(), TradegenError> {
        let mut wtr = csv::Writer::from_path(output_path)?;
        wtr.write_record(BAR_COLUMNS)?;
        for a in bars {
            let b = &a.bar;
            wtr.write_record([
                b.ticker.clone(),
                b.datetime.format(DATETIME_FORMAT).to_string(),
                b.open.to_string(),
                b.high.to_string(),
                b.low.to_string(),
                b.close.to_string(),
                b.entry_signal.to_string(),
                b.exit_signal.to_string(),
                optional(a.stop_price),
                a.stop_triggered.to_string(),
                optional(a.trail_price),
                a.trail_triggered.to_string(),
                optional(a.exit_reason),
            ])?;
        }
        wtr.flush()?;
        info!("wrote {} bars to {}", bars.len(), output_path.display());
        Ok(())
    }
}
