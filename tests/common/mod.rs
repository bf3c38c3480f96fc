#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
pub use tradegen::domain::bar::SignalBar;
use tradegen::domain::config::{RiskConfig, TradingConfig};
use tradegen::domain::engine::TradeEngine;
use tradegen::domain::error::TradegenError;
pub use tradegen::domain::signal::Action;
use tradegen::ports::data_port::BarSource;

pub struct MockBarSource {
    pub data: HashMap<String, Vec<SignalBar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<SignalBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl BarSource for MockBarSource {
    fn load_bars(&self, ticker: &str) -> Result<Vec<SignalBar>, TradegenError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(TradegenError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(ticker).cloned().unwrap_or_default())
    }
}

pub fn day(n: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(n)
}

/// Bar on day `n` with explicit prices and no markers.
pub fn bar(n: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> SignalBar {
    SignalBar::new("AAPL", day(n), open, high, low, close)
}

/// Bar on day `n` trading at a single price.
pub fn flat(n: i64, price: Decimal) -> SignalBar {
    bar(n, price, price, price, price)
}

pub fn engine(trading: TradingConfig, risk: RiskConfig) -> TradeEngine {
    TradeEngine::new(trading, risk).unwrap()
}
