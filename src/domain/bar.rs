//! Input bars carrying signal markers, and their annotated output form.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::position::ExitReason;
use super::signal::Action;

/// One OHLC bar of a single instrument plus its entry/exit markers.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBar {
    pub ticker: String,
    pub datetime: NaiveDateTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub entry_signal: Action,
    pub exit_signal: Action,
    /// Per-bar stop level, only read by the fixed exit structure.
    pub stop: Option<Decimal>,
}

impl SignalBar {
    pub fn new(
        ticker: impl Into<String>,
        datetime: NaiveDateTime,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        SignalBar {
            ticker: ticker.into(),
            datetime,
            open,
            high,
            low,
            close,
            entry_signal: Action::Wait,
            exit_signal: Action::Wait,
            stop: None,
        }
    }

    pub fn with_entry(mut self, action: Action) -> Self {
        self.entry_signal = action;
        self
    }

    pub fn with_exit(mut self, action: Action) -> Self {
        self.exit_signal = action;
        self
    }

    pub fn with_stop(mut self, stop: Decimal) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// A processed bar: the input plus what the risk controls saw on it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedBar {
    pub bar: SignalBar,
    pub stop_price: Option<Decimal>,
    pub stop_triggered: bool,
    pub trail_price: Option<Decimal>,
    pub trail_triggered: bool,
    /// Set when the engine force-closed positions on this bar.
    pub exit_reason: Option<ExitReason>,
}

impl AnnotatedBar {
    pub fn new(bar: SignalBar) -> Self {
        AnnotatedBar {
            bar,
            stop_price: None,
            stop_triggered: false,
            trail_price: None,
            trail_triggered: false,
            exit_reason: None,
        }
    }

    /// Record a forced close: the exit marker becomes `action`.
    pub fn mark_forced_exit(&mut self, action: Action, reason: ExitReason) {
        self.bar.exit_signal = action;
        self.exit_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample() -> SignalBar {
        SignalBar::new("AAPL", midnight(2024, 1, 2), dec!(10), dec!(11), dec!(9), dec!(10.5))
    }

    #[test]
    fn new_bar_defaults_to_wait() {
        let bar = sample();
        assert_eq!(bar.entry_signal, Action::Wait);
        assert_eq!(bar.exit_signal, Action::Wait);
        assert!(bar.stop.is_none());
    }

    #[test]
    fn builder_sets_markers_and_stop() {
        let bar = sample()
            .with_entry(Action::Buy)
            .with_exit(Action::Sell)
            .with_stop(dec!(9.5));
        assert_eq!(bar.entry_signal, Action::Buy);
        assert_eq!(bar.exit_signal, Action::Sell);
        assert_eq!(bar.stop, Some(dec!(9.5)));
    }

    #[test]
    fn forced_exit_overwrites_marker() {
        let bar = sample();
        let mut annotated = AnnotatedBar::new(bar);
        annotated.mark_forced_exit(Action::Sell, ExitReason::Stop);
        assert_eq!(annotated.bar.exit_signal, Action::Sell);
        assert_eq!(annotated.exit_reason, Some(ExitReason::Stop));
    }
}
