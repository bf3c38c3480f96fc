//! Configuration validation.
//!
//! Checks every `[trading]` and `[risk]` key before the engine is built, so a
//! bad file fails with the offending section and key.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::entry::EntryStruct;
use crate::domain::error::TradegenError;
use crate::domain::evaluator::SigEvalMethod;
use crate::domain::exit::ExitStruct;
use crate::domain::signal::EntryType;
use crate::domain::stop::StopMethod;
use crate::domain::trail::TrailMethod;
use crate::ports::config_port::ConfigPort;

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), TradegenError> {
    validate_variant::<EntryStruct>(config, "trading", "entry_struct", true)?;
    validate_variant::<ExitStruct>(config, "trading", "exit_struct", true)?;
    validate_num_lots(config)?;
    validate_bool(config, "trading", "monitor_close")?;
    validate_variant::<EntryType>(config, "trading", "entry_type", false)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), TradegenError> {
    validate_variant::<SigEvalMethod>(config, "risk", "sig_eval_method", false)?;
    validate_variant::<StopMethod>(config, "risk", "stop_method", false)?;
    validate_variant::<TrailMethod>(config, "risk", "trail_method", false)?;
    validate_decimal(
        config,
        "percent_loss",
        |v| v > Decimal::ZERO && v <= Decimal::ONE,
        "must be in (0, 1]",
    )?;
    validate_decimal(config, "trigger_trail", |v| v > Decimal::ZERO, "must be positive")?;
    validate_decimal(config, "step", |v| v > Decimal::ZERO, "must be positive")?;
    validate_decimal(
        config,
        "trigger_percent",
        |v| v >= Decimal::ZERO,
        "must be non-negative",
    )?;
    validate_count(config, "breakout_window")?;
    validate_count(config, "time_period")?;
    Ok(())
}

/// Value of an optional key, with blank values treated as absent.
pub fn optional_value(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn validate_variant<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    required: bool,
) -> Result<(), TradegenError>
where
    T: FromStr<Err = TradegenError>,
{
    match optional_value(config, section, key) {
        Some(name) => name.parse::<T>().map(|_| ()),
        None if required => Err(TradegenError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

fn validate_num_lots(config: &dyn ConfigPort) -> Result<(), TradegenError> {
    let Some(value) = optional_value(config, "trading", "num_lots") else {
        return Err(TradegenError::ConfigMissing {
            section: "trading".to_string(),
            key: "num_lots".to_string(),
        });
    };
    match value.parse::<Decimal>() {
        Ok(lots) if lots > Decimal::ZERO => Ok(()),
        _ => Err(TradegenError::ConfigInvalid {
            section: "trading".to_string(),
            key: "num_lots".to_string(),
            reason: format!("num_lots must be a positive number, got '{value}'"),
        }),
    }
}

fn validate_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TradegenError> {
    let Some(value) = optional_value(config, section, key) else {
        return Ok(());
    };
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "false" | "no" | "0" => Ok(()),
        _ => Err(TradegenError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("expected true or false, got '{value}'"),
        }),
    }
}

fn validate_decimal(
    config: &dyn ConfigPort,
    key: &str,
    accept: impl Fn(Decimal) -> bool,
    rule: &str,
) -> Result<(), TradegenError> {
    let Some(value) = optional_value(config, "risk", key) else {
        return Ok(());
    };
    match value.parse::<Decimal>() {
        Ok(v) if accept(v) => Ok(()),
        _ => Err(TradegenError::ConfigInvalid {
            section: "risk".to_string(),
            key: key.to_string(),
            reason: format!("{key} {rule}, got '{value}'"),
        }),
    }
}

fn validate_count(config: &dyn ConfigPort, key: &str) -> Result<(), TradegenError> {
    let Some(value) = optional_value(config, "risk", key) else {
        return Ok(());
    };
    match value.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(()),
        _ => Err(TradegenError::ConfigInvalid {
            section: "risk".to_string(),
            key: key.to_string(),
            reason: format!("{key} must be a whole number of bars of at least 1, got '{value}'"),
        }),
    }
}
