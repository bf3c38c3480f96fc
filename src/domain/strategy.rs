//! Coordinator: markers from a signal generator, then the trade engine.

use log::info;

use super::bar::SignalBar;
use super::engine::{TradeEngine, TradeRun};
use super::error::TradegenError;
use super::signal::Action;
use crate::ports::signal_port::SignalGenerator;

pub struct TradingStrategy<'a> {
    entry: &'a dyn SignalGenerator,
    exit: &'a dyn SignalGenerator,
    engine: &'a TradeEngine,
}

impl<'a> TradingStrategy<'a> {
    pub fn new(
        entry: &'a dyn SignalGenerator,
        exit: &'a dyn SignalGenerator,
        engine: &'a TradeEngine,
    ) -> Self {
        TradingStrategy {
            entry,
            exit,
            engine,
        }
    }

    /// Mark `bars` with entry then exit signals and run the engine over them.
    pub fn run(&self, bars: &[SignalBar]) -> Result<TradeRun, TradegenError> {
        check_single_ticker(bars)?;

        let entry = self.entry.entry_signals(bars);
        let exit = self.exit.exit_signals(bars);
        check_len("entry", &entry, bars.len())?;
        check_len("exit", &exit, bars.len())?;

        let marked: Vec<SignalBar> = bars
            .iter()
            .zip(entry.into_iter().zip(exit))
            .map(|(bar, (ent, ex))| bar.clone().with_entry(ent).with_exit(ex))
            .collect();

        if let Some(first) = marked.first() {
            info!("running strategy on {} ({} bars)", first.ticker, marked.len());
        }
        self.engine.run(&marked)
    }
}

fn check_single_ticker(bars: &[SignalBar]) -> Result<(), TradegenError> {
    let mut found: Vec<String> = Vec::new();
    for bar in bars {
        if !found.contains(&bar.ticker) {
            found.push(bar.ticker.clone());
        }
    }
    if found.len() > 1 {
        return Err(TradegenError::MultipleTickers { found });
    }
    Ok(())
}

fn check_len(channel: &str, signals: &[Action], expected: usize) -> Result<(), TradegenError> {
    if signals.len() != expected {
        return Err(TradegenError::data(format!(
            "{channel} signal generator returned {} markers for {expected} bars",
            signals.len()
        )));
    }
    Ok(())
}
