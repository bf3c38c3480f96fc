//! Entry structures: how many lots a confirmed entry opens.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::TradegenError;
use super::numeric::half_lots;
use super::open_positions::OpenPositions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryStruct {
    /// At most one open position.
    #[default]
    Single,
    /// Pyramid `num_lots` on every confirmed entry.
    Multi,
    /// Pyramid with each scale-in half the latest position, rounded up.
    MultiHalf,
}

impl EntryStruct {
    /// Lots to open for a confirmed entry, or `None` to skip it.
    pub fn entry_lots(&self, open: &OpenPositions, num_lots: Decimal) -> Option<Decimal> {
        match self {
            EntryStruct::Single => open.is_empty().then_some(num_lots),
            EntryStruct::Multi => Some(num_lots),
            EntryStruct::MultiHalf => match open.newest() {
                Some(latest) => Some(half_lots(latest.remaining())),
                None => Some(num_lots),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntryStruct::Single => "SingleEntry",
            EntryStruct::Multi => "MultiEntry",
            EntryStruct::MultiHalf => "MultiHalfEntry",
        }
    }
}

impl fmt::Display for EntryStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntryStruct {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SingleEntry" => Ok(EntryStruct::Single),
            "MultiEntry" => Ok(EntryStruct::Multi),
            "MultiHalfEntry" => Ok(EntryStruct::MultiHalf),
            other => Err(TradegenError::UnknownVariant {
                kind: "entry structure",
                name: other.to_string(),
            }),
        }
    }
}
