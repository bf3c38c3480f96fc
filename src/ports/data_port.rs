//! Bar data access port trait.

use crate::domain::bar::SignalBar;
use crate::domain::error::TradegenError;

pub trait BarSource {
    /// All bars for `ticker`, oldest first.
    fn load_bars(&self, ticker: &str) -> Result<Vec<SignalBar>, TradegenError>;
}
