//! Portfolio stop-loss pricing and the shared breach rule.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::bar::SignalBar;
use super::error::TradegenError;
use super::numeric::round_price;
use super::open_positions::OpenPositions;
use super::position::Position;
use super::signal::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMethod {
    #[default]
    NoStop,
    /// Loss level from the most recent entry.
    LatestLoss,
    /// Tightest per-position loss level.
    NearestLoss,
    /// Level at which the whole open set loses `percent_loss` of invested capital.
    PercentLoss,
}

impl StopMethod {
    pub fn is_enabled(&self) -> bool {
        *self != StopMethod::NoStop
    }

    /// Stop price for the open set, rounded to 2 dp.
    pub fn stop_price(
        &self,
        open: &OpenPositions,
        percent_loss: Decimal,
    ) -> Result<Option<Decimal>, TradegenError> {
        let Some(action) = open.entry_action() else {
            return Ok(None);
        };
        let factor = loss_factor(action, percent_loss);

        let stop = match self {
            StopMethod::NoStop => return Ok(None),
            StopMethod::LatestLoss => open.newest().map(|p| round_price(p.entry_price * factor)),
            StopMethod::NearestLoss => {
                let levels = open.iter().map(|p| round_price(p.entry_price * factor));
                if action == Action::Buy {
                    levels.max()
                } else {
                    levels.min()
                }
            }
            StopMethod::PercentLoss => {
                let lots = open.total_remaining();
                if lots.is_zero() {
                    return Err(TradegenError::invariant("open positions hold zero lots"));
                }
                let invested: Decimal = open
                    .iter()
                    .map(|p: &Position| p.remaining() * p.entry_price)
                    .sum();
                Some(round_price(invested * factor / lots))
            }
        };

        match stop {
            Some(price) if price < Decimal::ZERO => Err(TradegenError::invariant(format!(
                "negative stop price {price}"
            ))),
            other => Ok(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StopMethod::NoStop => "no_stop",
            StopMethod::LatestLoss => "LatestLoss",
            StopMethod::NearestLoss => "NearestLoss",
            StopMethod::PercentLoss => "PercentLoss",
        }
    }
}

fn loss_factor(action: Action, percent_loss: Decimal) -> Decimal {
    if action == Action::Buy {
        Decimal::ONE - percent_loss
    } else {
        Decimal::ONE + percent_loss
    }
}

/// Price at which positions of `entry_action` are closed when `level` is
/// breached on `bar`, or `None` if it holds.
///
/// A gap through the level fills at the open. Otherwise `monitor_close`
/// decides between the close (checked against the close) and the level
/// itself (checked against the intrabar extreme).
pub fn breach_price(
    entry_action: Action,
    level: Decimal,
    bar: &SignalBar,
    monitor_close: bool,
) -> Option<Decimal> {
    match entry_action {
        Action::Buy => {
            if bar.open <= level {
                Some(bar.open)
            } else if monitor_close && bar.close <= level {
                Some(bar.close)
            } else if !monitor_close && bar.low <= level {
                Some(level)
            } else {
                None
            }
        }
        Action::Sell => {
            if bar.open >= level {
                Some(bar.open)
            } else if monitor_close && bar.close >= level {
                Some(bar.close)
            } else if !monitor_close && bar.high >= level {
                Some(level)
            } else {
                None
            }
        }
        Action::Wait => None,
    }
}

impl fmt::Display for StopMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StopMethod {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "no_stop" => Ok(StopMethod::NoStop),
            "LatestLoss" => Ok(StopMethod::LatestLoss),
            "NearestLoss" => Ok(StopMethod::NearestLoss),
            "PercentLoss" => Ok(StopMethod::PercentLoss),
            other => Err(TradegenError::UnknownVariant {
                kind: "stop method",
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn dt() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn open_with(action: Action, entries: &[(Decimal, Decimal)]) -> OpenPositions {
        let mut open = OpenPositions::new();
        for (i, (lots, price)) in entries.iter().enumerate() {
            open.open("AAPL", dt(), action, *lots, *price, i).unwrap();
        }
        open
    }

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> SignalBar {
        SignalBar::new("AAPL", dt(), open, high, low, close)
    }

    #[test]
    fn no_stop_returns_none() {
        let open = open_with(Action::Buy, &[(dec!(10), dec!(100))]);
        assert_eq!(StopMethod::NoStop.stop_price(&open, dec!(0.05)).unwrap(), None);
    }

    #[test]
    fn empty_open_set_has_no_stop() {
        let open = OpenPositions::new();
        assert_eq!(StopMethod::PercentLoss.stop_price(&open, dec!(0.05)).unwrap(), None);
    }

    #[test]
    fn latest_loss_uses_newest_entry() {
        let open = open_with(Action::Buy, &[(dec!(10), dec!(100)), (dec!(10), dec!(110))]);
        assert_eq!(
            StopMethod::LatestLoss.stop_price(&open, dec!(0.05)).unwrap(),
            Some(dec!(104.50))
        );
    }

    #[test]
    fn latest_loss_short_uses_upper_level() {
        let open = open_with(Action::Sell, &[(dec!(10), dec!(100))]);
        assert_eq!(
            StopMethod::LatestLoss.stop_price(&open, dec!(0.05)).unwrap(),
            Some(dec!(105))
        );
    }

    #[test]
    fn nearest_loss_takes_tightest_level() {
        let long = open_with(Action::Buy, &[(dec!(10), dec!(100)), (dec!(10), dec!(90))]);
        assert_eq!(
            StopMethod::NearestLoss.stop_price(&long, dec!(0.1)).unwrap(),
            Some(dec!(90))
        );
        let short = open_with(Action::Sell, &[(dec!(10), dec!(100)), (dec!(10), dec!(90))]);
        assert_eq!(
            StopMethod::NearestLoss.stop_price(&short, dec!(0.1)).unwrap(),
            Some(dec!(99))
        );
    }

    #[test]
    fn percent_loss_is_size_weighted() {
        // invested = 10*100 + 30*120 = 4600 over 40 lots; 4600 * 0.9 / 40 = 103.5
        let open = open_with(Action::Buy, &[(dec!(10), dec!(100)), (dec!(30), dec!(120))]);
        assert_eq!(
            StopMethod::PercentLoss.stop_price(&open, dec!(0.1)).unwrap(),
            Some(dec!(103.50))
        );
    }

    #[test]
    fn long_breach_gap_fills_at_open() {
        let b = bar(dec!(90), dec!(95), dec!(85), dec!(92));
        assert_eq!(breach_price(Action::Buy, dec!(95), &b, false), Some(dec!(90)));
    }

    #[test]
    fn long_breach_intrabar_fills_at_level() {
        let b = bar(dec!(100), dec!(101), dec!(94), dec!(99));
        assert_eq!(breach_price(Action::Buy, dec!(95), &b, false), Some(dec!(95)));
        // monitoring the close ignores the intrabar low
        assert_eq!(breach_price(Action::Buy, dec!(95), &b, true), None);
    }

    #[test]
    fn long_breach_on_close_fills_at_close() {
        let b = bar(dec!(100), dec!(101), dec!(93), dec!(94));
        assert_eq!(breach_price(Action::Buy, dec!(95), &b, true), Some(dec!(94)));
    }

    #[test]
    fn short_breach_mirrors_long() {
        let gap = bar(dec!(110), dec!(112), dec!(108), dec!(111));
        assert_eq!(breach_price(Action::Sell, dec!(105), &gap, false), Some(dec!(110)));
        let intrabar = bar(dec!(100), dec!(106), dec!(99), dec!(101));
        assert_eq!(breach_price(Action::Sell, dec!(105), &intrabar, false), Some(dec!(105)));
        assert_eq!(breach_price(Action::Sell, dec!(105), &intrabar, true), None);
    }

    #[test]
    fn parse_names() {
        assert_eq!("no_stop".parse::<StopMethod>().unwrap(), StopMethod::NoStop);
        assert_eq!("PercentLoss".parse::<StopMethod>().unwrap(), StopMethod::PercentLoss);
        assert!("TightLoss".parse::<StopMethod>().is_err());
    }
}
