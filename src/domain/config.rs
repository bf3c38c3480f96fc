//! Trading and risk configuration consumed by the trade engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::entry::EntryStruct;
use super::error::TradegenError;
use super::evaluator::SigEvalMethod;
use super::exit::ExitStruct;
use super::signal::EntryType;
use super::stop::StopMethod;
use super::trail::{TrailMethod, TrailParams};

/// Position sizing and closing policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub entry_struct: EntryStruct,
    pub exit_struct: ExitStruct,
    pub num_lots: Decimal,
    /// Check stop and trail levels against the close instead of the intrabar extreme.
    pub monitor_close: bool,
    pub entry_type: EntryType,
}

impl TradingConfig {
    pub fn new(entry_struct: EntryStruct, exit_struct: ExitStruct, num_lots: Decimal) -> Self {
        TradingConfig {
            entry_struct,
            exit_struct,
            num_lots,
            monitor_close: true,
            entry_type: EntryType::LongShort,
        }
    }

    pub fn validate(&self) -> Result<(), TradegenError> {
        if self.num_lots <= Decimal::ZERO {
            return Err(invalid("trading", "num_lots", "num_lots must be positive"));
        }
        Ok(())
    }
}

/// Signal confirmation and risk controls.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub sig_eval_method: SigEvalMethod,
    pub trigger_percent: Option<Decimal>,
    /// Bars a breakout signal may wait before it expires.
    pub breakout_window: Option<usize>,
    pub stop_method: StopMethod,
    pub percent_loss: Decimal,
    pub trail_method: TrailMethod,
    pub trigger_trail: Decimal,
    pub step: Option<Decimal>,
    /// Maximum holding period in bars.
    pub time_period: Option<usize>,
}

pub const DEFAULT_PERCENT_LOSS: Decimal = dec!(0.05);
pub const DEFAULT_TRIGGER_TRAIL: Decimal = dec!(0.2);

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            sig_eval_method: SigEvalMethod::Open,
            trigger_percent: None,
            breakout_window: None,
            stop_method: StopMethod::NoStop,
            percent_loss: DEFAULT_PERCENT_LOSS,
            trail_method: TrailMethod::NoTrail,
            trigger_trail: DEFAULT_TRIGGER_TRAIL,
            step: None,
            time_period: None,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), TradegenError> {
        if self.percent_loss <= Decimal::ZERO || self.percent_loss > Decimal::ONE {
            return Err(invalid(
                "risk",
                "percent_loss",
                "percent_loss must be in (0, 1]",
            ));
        }
        if self.trigger_trail <= Decimal::ZERO {
            return Err(invalid(
                "risk",
                "trigger_trail",
                "trigger_trail must be positive",
            ));
        }
        if self.step.is_some_and(|s| s <= Decimal::ZERO) {
            return Err(invalid("risk", "step", "step must be positive"));
        }
        if self.trigger_percent.is_some_and(|t| t < Decimal::ZERO) {
            return Err(invalid(
                "risk",
                "trigger_percent",
                "trigger_percent must be non-negative",
            ));
        }
        if self.time_period == Some(0) {
            return Err(invalid("risk", "time_period", "time_period must be at least 1"));
        }
        if self.breakout_window == Some(0) {
            return Err(invalid(
                "risk",
                "breakout_window",
                "breakout_window must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn trail_params(&self) -> TrailParams {
        TrailParams {
            method: self.trail_method,
            trigger_trail: self.trigger_trail,
            step: self.step,
        }
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> TradegenError {
    TradegenError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(err: TradegenError) -> String {
        match err {
            TradegenError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn risk_defaults() {
        let risk = RiskConfig::default();
        assert_eq!(risk.sig_eval_method, SigEvalMethod::Open);
        assert_eq!(risk.percent_loss, dec!(0.05));
        assert_eq!(risk.trigger_trail, dec!(0.2));
        assert_eq!(risk.stop_method, StopMethod::NoStop);
        assert_eq!(risk.trail_method, TrailMethod::NoTrail);
        assert!(risk.time_period.is_none());
        assert!(risk.validate().is_ok());
    }

    #[test]
    fn trading_defaults() {
        let trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(100));
        assert!(trading.monitor_close);
        assert_eq!(trading.entry_type, EntryType::LongShort);
        assert!(trading.validate().is_ok());
    }

    #[test]
    fn num_lots_must_be_positive() {
        let trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(0));
        assert_eq!(key_of(trading.validate().unwrap_err()), "num_lots");
    }

    #[test]
    fn percent_loss_bounds() {
        let mut risk = RiskConfig::default();
        risk.percent_loss = dec!(1);
        assert!(risk.validate().is_ok());
        risk.percent_loss = dec!(1.01);
        assert_eq!(key_of(risk.validate().unwrap_err()), "percent_loss");
        risk.percent_loss = dec!(0);
        assert_eq!(key_of(risk.validate().unwrap_err()), "percent_loss");
    }

    #[test]
    fn trail_parameters_must_be_positive() {
        let risk = RiskConfig {
            trigger_trail: dec!(0),
            ..RiskConfig::default()
        };
        assert_eq!(key_of(risk.validate().unwrap_err()), "trigger_trail");
        let risk = RiskConfig {
            step: Some(dec!(-0.1)),
            ..RiskConfig::default()
        };
        assert_eq!(key_of(risk.validate().unwrap_err()), "step");
    }

    #[test]
    fn bar_counts_must_be_at_least_one() {
        let risk = RiskConfig {
            time_period: Some(0),
            ..RiskConfig::default()
        };
        assert_eq!(key_of(risk.validate().unwrap_err()), "time_period");
        let risk = RiskConfig {
            breakout_window: Some(0),
            ..RiskConfig::default()
        };
        assert_eq!(key_of(risk.validate().unwrap_err()), "breakout_window");
    }
}
