//! Output port for the trade ledger and annotated series.

use std::path::Path;

use crate::domain::bar::AnnotatedBar;
use crate::domain::error::TradegenError;
use crate::domain::position::CompletedTrade;

pub trait ReportPort {
    fn write_trades(
        &self,
        trades: &[CompletedTrade],
        output_path: &Path,
    ) -> Result<(), TradegenError>;

    fn write_bars(&self, bars: &[AnnotatedBar], output_path: &Path) -> Result<(), TradegenError>;
}
