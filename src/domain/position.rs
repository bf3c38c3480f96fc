//! Open positions and completed trades.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use super::error::TradegenError;
use super::numeric::{direction_sign, round_percent};
use super::signal::Action;

/// Why a position (or part of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    Signal,
    Time,
    Stop,
    Trail,
    FixedProfit,
    FixedStop,
    Flip,
    EndOfSeries,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::Time => "time",
            ExitReason::Stop => "stop",
            ExitReason::Trail => "trail",
            ExitReason::FixedProfit => "fixed_profit",
            ExitReason::FixedStop => "fixed_stop",
            ExitReason::Flip => "flip",
            ExitReason::EndOfSeries => "end_of_series",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExitReason {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signal" => Ok(ExitReason::Signal),
            "time" => Ok(ExitReason::Time),
            "stop" => Ok(ExitReason::Stop),
            "trail" => Ok(ExitReason::Trail),
            "fixed_profit" => Ok(ExitReason::FixedProfit),
            "fixed_stop" => Ok(ExitReason::FixedStop),
            "flip" => Ok(ExitReason::Flip),
            "end_of_series" => Ok(ExitReason::EndOfSeries),
            _ => Err(TradegenError::UnknownVariant {
                kind: "exit reason",
                name: s.to_string(),
            }),
        }
    }
}

/// A group of lots opened by one entry event.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    /// Creation sequence number, unique within a pass.
    pub seq: u64,
    pub entry_datetime: NaiveDateTime,
    pub entry_action: Action,
    pub entry_lots: Decimal,
    pub entry_price: Decimal,
    pub closed_lots: Decimal,
    /// Index of the bar the position was opened on.
    pub entry_bar: usize,
}

impl Position {
    pub fn remaining(&self) -> Decimal {
        self.entry_lots - self.closed_lots
    }

    pub fn is_open(&self) -> bool {
        self.remaining() > Decimal::ZERO
    }

    /// Close `lots` of this position and return the resulting trade record.
    pub fn close(
        &mut self,
        lots: Decimal,
        exit_datetime: NaiveDateTime,
        exit_price: Decimal,
        exit_reason: ExitReason,
    ) -> Result<CompletedTrade, TradegenError> {
        if lots <= Decimal::ZERO {
            return Err(TradegenError::invariant(format!(
                "position {}: close quantity must be positive, got {lots}",
                self.seq
            )));
        }
        if lots > self.remaining() {
            return Err(TradegenError::invariant(format!(
                "position {}: cannot close {lots} lots, only {} remaining",
                self.seq,
                self.remaining()
            )));
        }
        self.closed_lots += lots;

        Ok(CompletedTrade {
            ticker: self.ticker.clone(),
            seq: self.seq,
            entry_datetime: self.entry_datetime,
            entry_action: self.entry_action,
            entry_lots: self.entry_lots,
            entry_price: self.entry_price,
            exit_datetime,
            exit_action: self.entry_action.opposite(),
            exit_lots: lots,
            exit_price,
            exit_reason,
        })
    }
}

/// Immutable record of a full or partial close.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrade {
    pub ticker: String,
    pub seq: u64,
    pub entry_datetime: NaiveDateTime,
    pub entry_action: Action,
    pub entry_lots: Decimal,
    pub entry_price: Decimal,
    pub exit_datetime: NaiveDateTime,
    pub exit_action: Action,
    pub exit_lots: Decimal,
    pub exit_price: Decimal,
    pub exit_reason: ExitReason,
}

impl CompletedTrade {
    pub fn is_long(&self) -> bool {
        self.entry_action == Action::Buy
    }

    pub fn profit_loss(&self) -> Decimal {
        direction_sign(self.is_long()) * (self.exit_price - self.entry_price) * self.exit_lots
    }

    /// Return on the capital committed to the closed lots, 6 dp.
    pub fn percent_ret(&self) -> Decimal {
        let invested = self.entry_price * self.exit_lots;
        if invested.is_zero() {
            return Decimal::ZERO;
        }
        round_percent(self.profit_loss() / invested)
    }

    pub fn days_held(&self) -> i64 {
        (self.exit_datetime.date() - self.entry_datetime.date()).num_days()
    }

    /// Compounded daily return; `None` when the percent return is -100% or worse.
    pub fn daily_ret(&self) -> Option<Decimal> {
        let percent_ret = self.percent_ret();
        let days = self.days_held();
        if days <= 0 {
            return Some(percent_ret);
        }
        let growth = (Decimal::ONE + percent_ret).to_f64()?;
        if growth <= 0.0 {
            return None;
        }
        let daily = growth.powf(1.0 / days as f64) - 1.0;
        Decimal::from_f64(daily).map(round_percent)
    }

    pub fn win(&self) -> bool {
        self.percent_ret() > Decimal::ZERO
    }
}
