//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{error, info};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::{
    DEFAULT_PERCENT_LOSS, DEFAULT_TRIGGER_TRAIL, RiskConfig, TradingConfig,
};
use crate::domain::config_validation::{
    optional_value, validate_risk_config, validate_trading_config,
};
use crate::domain::engine::TradeEngine;
use crate::domain::entry::EntryStruct;
use crate::domain::error::TradegenError;
use crate::domain::exit::ExitStruct;
use crate::domain::metrics::LedgerSummary;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "tradegen", about = "Trade generation over annotated price series")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trade engine over one ticker's signal series
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding `<TICKER>.csv` files
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        ticker: String,
        /// Trade ledger CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Annotated signal series CSV
        #[arg(short, long)]
        signals: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Where a pass writes its results. Either output may be skipped.
#[derive(Debug, Default, Clone)]
pub struct OutputPaths {
    pub trades: Option<PathBuf>,
    pub bars: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            ticker,
            output,
            signals,
        } => run_trades(
            &config,
            &data,
            &ticker,
            &OutputPaths {
                trades: output,
                bars: signals,
            },
        ),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TradegenError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Validate both sections and build the engine.
pub fn build_engine(adapter: &dyn ConfigPort) -> Result<TradeEngine, TradegenError> {
    validate_trading_config(adapter)?;
    validate_risk_config(adapter)?;
    TradeEngine::new(build_trading_config(adapter)?, build_risk_config(adapter)?)
}

pub fn build_trading_config(adapter: &dyn ConfigPort) -> Result<TradingConfig, TradegenError> {
    let entry_struct = required(adapter, "trading", "entry_struct")?.parse::<EntryStruct>()?;
    let exit_struct = required(adapter, "trading", "exit_struct")?.parse::<ExitStruct>()?;
    let num_lots = adapter.get_decimal("trading", "num_lots", Decimal::ZERO);

    let mut config = TradingConfig::new(entry_struct, exit_struct, num_lots);
    config.monitor_close = adapter.get_bool("trading", "monitor_close", config.monitor_close);
    config.entry_type = variant_or_default(adapter, "trading", "entry_type")?;
    Ok(config)
}

pub fn build_risk_config(adapter: &dyn ConfigPort) -> Result<RiskConfig, TradegenError> {
    Ok(RiskConfig {
        sig_eval_method: variant_or_default(adapter, "risk", "sig_eval_method")?,
        trigger_percent: optional_decimal(adapter, "trigger_percent"),
        breakout_window: optional_count(adapter, "breakout_window"),
        stop_method: variant_or_default(adapter, "risk", "stop_method")?,
        percent_loss: adapter.get_decimal("risk", "percent_loss", DEFAULT_PERCENT_LOSS),
        trail_method: variant_or_default(adapter, "risk", "trail_method")?,
        trigger_trail: adapter.get_decimal("risk", "trigger_trail", DEFAULT_TRIGGER_TRAIL),
        step: optional_decimal(adapter, "step"),
        time_period: optional_count(adapter, "time_period"),
    })
}

fn required(adapter: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TradegenError> {
    optional_value(adapter, section, key).ok_or_else(|| TradegenError::ConfigMissing {
        section: section.into(),
        key: key.into(),
    })
}

fn variant_or_default<T>(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<T, TradegenError>
where
    T: FromStr<Err = TradegenError> + Default,
{
    match optional_value(adapter, section, key) {
        Some(name) => name.parse(),
        None => Ok(T::default()),
    }
}

fn optional_decimal(adapter: &dyn ConfigPort, key: &str) -> Option<Decimal> {
    optional_value(adapter, "risk", key)
        .map(|_| adapter.get_decimal("risk", key, Decimal::ZERO))
}

fn optional_count(adapter: &dyn ConfigPort, key: &str) -> Option<usize> {
    optional_value(adapter, "risk", key)
        .map(|_| adapter.get_int("risk", key, 0))
        .and_then(|n| usize::try_from(n).ok())
}

fn run_trades(
    config_path: &Path,
    data_dir: &Path,
    ticker: &str,
    outputs: &OutputPaths,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = match build_engine(&adapter) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let source = CsvAdapter::new(data_dir.to_path_buf());
    run_pipeline(&engine, &source, &CsvReportAdapter, ticker, outputs)
}

pub fn run_pipeline(
    engine: &TradeEngine,
    source: &dyn BarSource,
    report: &dyn ReportPort,
    ticker: &str,
    outputs: &OutputPaths,
) -> ExitCode {
    let bars = match source.load_bars(ticker) {
        Ok(bars) => bars,
        Err(e) => {
            error!("failed to load bars for {ticker}: {e}");
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    info!("loaded {} bars for {}", bars.len(), ticker);

    let result = match engine.run(&bars) {
        Ok(r) => r,
        Err(e) => {
            error!("trade pass for {ticker} failed: {e}");
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_summary(ticker, &LedgerSummary::compute(&result.trades));

    if let Some(path) = &outputs.trades {
        if let Err(e) = report.write_trades(&result.trades, path) {
            eprintln!("error: failed to write trades: {e}");
            return (&e).into();
        }
        eprintln!("Trades written to: {}", path.display());
    }
    if let Some(path) = &outputs.bars {
        if let Err(e) = report.write_bars(&result.bars, path) {
            eprintln!("error: failed to write signal series: {e}");
            return (&e).into();
        }
        eprintln!("Signal series written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn print_summary(ticker: &str, summary: &LedgerSummary) {
    eprintln!("\n=== {ticker} ===");
    eprintln!("Total Trades:     {}", summary.total_trades);
    eprintln!(
        "Wins / Losses:    {} / {} ({} flat)",
        summary.wins, summary.losses, summary.breakeven
    );
    eprintln!("Win Rate:         {:.1}%", summary.win_rate * 100.0);
    eprintln!("Total Profit:     {}", summary.total_profit);
    eprintln!("Avg Return:       {}", summary.avg_percent_ret);
    eprintln!("Avg Days Held:    {:.1}", summary.avg_days_held);
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let engine = match build_engine(&adapter) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let trading = engine.trading();
    let risk = engine.risk();
    eprintln!("\nTrading:");
    eprintln!("  entry_struct:    {}", trading.entry_struct);
    eprintln!("  exit_struct:     {}", trading.exit_struct);
    eprintln!("  num_lots:        {}", trading.num_lots);
    eprintln!("  monitor_close:   {}", trading.monitor_close);
    eprintln!("  entry_type:      {}", trading.entry_type);
    eprintln!("\nRisk:");
    eprintln!("  sig_eval_method: {}", risk.sig_eval_method.name());
    eprintln!("  stop_method:     {}", risk.stop_method.name());
    eprintln!("  trail_method:    {}", risk.trail_method.name());
    if let Some(period) = risk.time_period {
        eprintln!("  time_period:     {period} bars");
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
