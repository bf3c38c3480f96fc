//! Domain error types.

use super::signal::{Action, Channel, EntryType};

/// Top-level error type for tradegen.
#[derive(Debug, thiserror::Error)]
pub enum TradegenError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown {kind} '{name}'")]
    UnknownVariant { kind: &'static str, name: String },

    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("input must contain exactly one ticker, found {found:?}")]
    MultipleTickers { found: Vec<String> },

    #[error("bar {bar}: ticker '{found}' differs from '{expected}'")]
    TickerMismatch {
        expected: String,
        found: String,
        bar: usize,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("bar {bar}: '{action}' {channel} signal is not allowed for '{entry_type}' strategy")]
    DirectionMode {
        bar: usize,
        channel: Channel,
        action: Action,
        entry_type: EntryType,
    },

    #[error("invariant violated: {reason}")]
    Invariant { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradegenError {
    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        TradegenError::Invariant {
            reason: reason.into(),
        }
    }

    pub(crate) fn data(reason: impl Into<String>) -> Self {
        TradegenError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&TradegenError> for std::process::ExitCode {
    fn from(err: &TradegenError) -> Self {
        let code: u8 = match err {
            TradegenError::Io(_) => 1,
            TradegenError::ConfigParse { .. }
            | TradegenError::ConfigMissing { .. }
            | TradegenError::ConfigInvalid { .. }
            | TradegenError::UnknownVariant { .. } => 2,
            TradegenError::MissingColumn { .. }
            | TradegenError::MultipleTickers { .. }
            | TradegenError::TickerMismatch { .. }
            | TradegenError::Data { .. }
            | TradegenError::Csv(_) => 3,
            TradegenError::DirectionMode { .. } => 4,
            TradegenError::Invariant { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
