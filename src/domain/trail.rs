//! Trailing-profit ratchet.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::bar::SignalBar;
use super::error::TradegenError;
use super::numeric::round_price;
use super::open_positions::OpenPositions;
use super::signal::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailMethod {
    #[default]
    NoTrail,
    /// Trail measured from the oldest open position's entry price.
    FirstTrail,
}

impl TrailMethod {
    pub fn is_enabled(&self) -> bool {
        *self != TrailMethod::NoTrail
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrailMethod::NoTrail => "no_trail",
            TrailMethod::FirstTrail => "FirstTrail",
        }
    }
}

impl fmt::Display for TrailMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrailMethod {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "no_trail" => Ok(TrailMethod::NoTrail),
            "FirstTrail" => Ok(TrailMethod::FirstTrail),
            other => Err(TradegenError::UnknownVariant {
                kind: "trail method",
                name: other.to_string(),
            }),
        }
    }
}

/// Trail parameters copied from the risk configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailParams {
    pub method: TrailMethod,
    pub trigger_trail: Decimal,
    pub step: Option<Decimal>,
}

/// Ratchet state for one pass. Long trails only rise, short trails only fall.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailState {
    reference: Option<Decimal>,
    price: Option<Decimal>,
}

impl TrailState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(&self) -> Option<Decimal> {
        self.price
    }

    pub fn reset(&mut self) {
        self.reference = None;
        self.price = None;
    }

    /// Advance the ratchet with `bar` and return the current trail price.
    pub fn update(
        &mut self,
        params: &TrailParams,
        open: &OpenPositions,
        bar: &SignalBar,
    ) -> Result<Option<Decimal>, TradegenError> {
        if params.method == TrailMethod::NoTrail {
            return Ok(None);
        }
        let Some(first) = open.oldest() else {
            self.reset();
            return Ok(None);
        };

        let reference = first.entry_price;
        if self.reference != Some(reference) {
            self.reference = Some(reference);
            self.price = None;
        }

        let is_long = first.entry_action == Action::Buy;
        let trigger_level = if is_long {
            reference * (Decimal::ONE + params.trigger_trail)
        } else {
            reference * (Decimal::ONE - params.trigger_trail)
        };
        let excess = if is_long {
            bar.high - trigger_level
        } else {
            trigger_level - bar.low
        };
        if excess < Decimal::ZERO {
            return Ok(self.price);
        }

        let advance = match params.step {
            Some(step) => {
                let step_level = reference * step;
                if step_level <= Decimal::ZERO {
                    return Err(TradegenError::invariant(format!(
                        "trail step level must be positive, got {step_level}"
                    )));
                }
                (excess / step_level).floor() * step_level
            }
            None => excess,
        };
        let candidate = if is_long {
            round_price(reference + advance)
        } else {
            round_price(reference - advance)
        };

        self.price = Some(match self.price {
            Some(current) if is_long => current.max(candidate),
            Some(current) => current.min(candidate),
            None => candidate,
        });
        Ok(self.price)
    }
}
