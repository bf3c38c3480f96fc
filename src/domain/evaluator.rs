//! Signal evaluators: turn raw markers into confirmed, priced actions.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::bar::SignalBar;
use super::error::TradegenError;
use super::numeric::round_price;
use super::signal::Action;

/// Price increment used by a breakout without a trigger percent.
const BREAKOUT_TICK: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigEvalMethod {
    /// Confirm at the next bar's open.
    #[default]
    Open,
    /// Confirm once price breaks the pending bar's extreme.
    Breakout,
    /// Confirm at the signal bar's own close.
    Close,
}

impl SigEvalMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SigEvalMethod::Open => "OpenEvaluator",
            SigEvalMethod::Breakout => "BreakoutEvaluator",
            SigEvalMethod::Close => "CloseEvaluator",
        }
    }
}

impl fmt::Display for SigEvalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SigEvalMethod {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "OpenEvaluator" => Ok(SigEvalMethod::Open),
            "BreakoutEvaluator" => Ok(SigEvalMethod::Breakout),
            "CloseEvaluator" => Ok(SigEvalMethod::Close),
            other => Err(TradegenError::UnknownVariant {
                kind: "signal evaluator",
                name: other.to_string(),
            }),
        }
    }
}

/// A confirmed action and the price it fills at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub datetime: NaiveDateTime,
    pub action: Action,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    action: Action,
    high: Decimal,
    low: Decimal,
    /// Bars seen since the signal without a confirmation.
    waited: usize,
}

impl Pending {
    fn from_bar(action: Action, bar: &SignalBar) -> Self {
        Pending {
            action,
            high: bar.high,
            low: bar.low,
            waited: 0,
        }
    }
}

/// Per-channel evaluator state for one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvaluator {
    method: SigEvalMethod,
    trigger_percent: Option<Decimal>,
    breakout_window: Option<usize>,
    pending: Option<Pending>,
}

impl SignalEvaluator {
    pub fn new(
        method: SigEvalMethod,
        trigger_percent: Option<Decimal>,
        breakout_window: Option<usize>,
    ) -> Self {
        SignalEvaluator {
            method,
            trigger_percent,
            breakout_window,
            pending: None,
        }
    }

    pub fn pending_action(&self) -> Option<Action> {
        self.pending.map(|p| p.action)
    }

    /// Forget any pending signal.
    pub fn reset(&mut self) {
        self.pending = None;
    }

    /// Feed `bar` with this channel's `marker`; returns a confirmation if one fires.
    pub fn evaluate(&mut self, bar: &SignalBar, marker: Action) -> Option<Confirmation> {
        match self.method {
            SigEvalMethod::Open => self.evaluate_open(bar, marker),
            SigEvalMethod::Breakout => self.evaluate_breakout(bar, marker),
            SigEvalMethod::Close => (!marker.is_wait()).then_some(Confirmation {
                datetime: bar.datetime,
                action: marker,
                price: bar.close,
            }),
        }
    }

    fn evaluate_open(&mut self, bar: &SignalBar, marker: Action) -> Option<Confirmation> {
        let confirmed = self.pending.take().map(|p| Confirmation {
            datetime: bar.datetime,
            action: p.action,
            price: bar.open,
        });
        if !marker.is_wait() {
            self.pending = Some(Pending::from_bar(marker, bar));
        }
        confirmed
    }

    fn evaluate_breakout(&mut self, bar: &SignalBar, marker: Action) -> Option<Confirmation> {
        let Some(mut pending) = self.pending else {
            if !marker.is_wait() {
                self.pending = Some(Pending::from_bar(marker, bar));
            }
            return None;
        };

        if !marker.is_wait() && marker != pending.action {
            self.pending = Some(Pending::from_bar(marker, bar));
            return None;
        }

        if let Some(price) = self.breakout_price(&pending, bar) {
            self.pending = None;
            if !marker.is_wait() {
                self.pending = Some(Pending::from_bar(marker, bar));
            }
            return Some(Confirmation {
                datetime: bar.datetime,
                action: pending.action,
                price,
            });
        }

        if marker == pending.action {
            self.pending = Some(Pending::from_bar(marker, bar));
            return None;
        }

        pending.high = bar.high;
        pending.low = bar.low;
        pending.waited += 1;
        let expired = self
            .breakout_window
            .is_some_and(|window| pending.waited >= window);
        self.pending = if expired { None } else { Some(pending) };
        None
    }

    fn breakout_price(&self, pending: &Pending, bar: &SignalBar) -> Option<Decimal> {
        match pending.action {
            Action::Buy => {
                let level = match self.trigger_percent {
                    Some(tp) => round_price(pending.high * (Decimal::ONE + tp)),
                    None => pending.high + BREAKOUT_TICK,
                };
                if bar.open >= level {
                    Some(bar.open)
                } else if bar.high >= level {
                    Some(level)
                } else {
                    None
                }
            }
            Action::Sell => {
                let level = match self.trigger_percent {
                    Some(tp) => round_price(pending.low * (Decimal::ONE - tp)),
                    None => pending.low - BREAKOUT_TICK,
                };
                if bar.open <= level {
                    Some(bar.open)
                } else if bar.low <= level {
                    Some(level)
                } else {
                    None
                }
            }
            Action::Wait => None,
        }
    }
}
