//! Per-position profit and stop levels for the fixed exit structure.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::bar::SignalBar;
use super::error::TradegenError;
use super::open_positions::OpenPositions;
use super::position::ExitReason;
use super::signal::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLevel {
    pub profit: Decimal,
    pub stop: Decimal,
}

impl FixedLevel {
    /// Levels symmetric around the entry: profit = 2 * entry - stop.
    pub fn from_entry(
        entry_action: Action,
        entry_price: Decimal,
        stop: Decimal,
    ) -> Result<Self, TradegenError> {
        let losing_side = match entry_action {
            Action::Buy => stop < entry_price,
            Action::Sell => stop > entry_price,
            Action::Wait => false,
        };
        if !losing_side {
            return Err(TradegenError::invariant(format!(
                "stop {stop} is not on the losing side of a '{entry_action}' entry at {entry_price}"
            )));
        }
        Ok(FixedLevel {
            profit: Decimal::TWO * entry_price - stop,
            stop,
        })
    }
}

/// A position whose fixed level was hit on the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHit {
    pub seq: u64,
    pub price: Decimal,
    pub reason: ExitReason,
}

/// Levels keyed by position sequence number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedLevels {
    levels: BTreeMap<u64, FixedLevel>,
}

impl FixedLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, seq: u64, level: FixedLevel) {
        self.levels.insert(seq, level);
    }

    pub fn get(&self, seq: u64) -> Option<&FixedLevel> {
        self.levels.get(&seq)
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Drop levels of positions that are no longer open.
    pub fn retain_open(&mut self, open: &OpenPositions) {
        self.levels.retain(|seq, _| open.get(*seq).is_some());
    }

    /// Positions whose profit level is reached on `bar`, oldest first.
    pub fn profit_hits(&self, open: &OpenPositions, bar: &SignalBar) -> Vec<FixedHit> {
        self.hits(open, |action, level| {
            let profit = level.profit;
            let price = match action {
                Action::Buy if bar.open >= profit => Some(bar.open),
                Action::Buy if bar.high >= profit => Some(profit),
                Action::Sell if bar.open <= profit => Some(bar.open),
                Action::Sell if bar.low <= profit => Some(profit),
                _ => None,
            };
            price.map(|p| (p, ExitReason::FixedProfit))
        })
    }

    /// Positions whose stop level is breached on `bar`, oldest first.
    pub fn stop_hits(
        &self,
        open: &OpenPositions,
        bar: &SignalBar,
        monitor_close: bool,
    ) -> Vec<FixedHit> {
        self.hits(open, |action, level| {
            let stop = level.stop;
            let price = match action {
                Action::Buy if bar.open <= stop => Some(bar.open),
                Action::Buy if monitor_close && bar.close <= stop => Some(stop),
                Action::Buy if !monitor_close && bar.low <= stop => Some(stop),
                Action::Sell if bar.open >= stop => Some(bar.open),
                Action::Sell if monitor_close && bar.close >= stop => Some(stop),
                Action::Sell if !monitor_close && bar.high >= stop => Some(stop),
                _ => None,
            };
            price.map(|p| (p, ExitReason::FixedStop))
        })
    }

    fn hits<F>(&self, open: &OpenPositions, check: F) -> Vec<FixedHit>
    where
        F: Fn(Action, &FixedLevel) -> Option<(Decimal, ExitReason)>,
    {
        open.iter()
            .filter_map(|pos| {
                let level = self.levels.get(&pos.seq)?;
                let (price, reason) = check(pos.entry_action, level)?;
                Some(FixedHit {
                    seq: pos.seq,
                    price,
                    reason,
                })
            })
            .collect()
    }
}
