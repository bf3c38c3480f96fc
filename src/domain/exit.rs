//! Exit structures: which open lots a confirmed exit signal closes.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::TradegenError;
use super::numeric::half_lots;
use super::open_positions::OpenPositions;
use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitStruct {
    #[default]
    Fifo,
    Lifo,
    TakeAll,
    /// Closes only on preset per-position profit or stop levels.
    Fixed,
    HalfFifo,
    HalfLifo,
}

/// Close `lots` of position `seq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOrder {
    pub seq: u64,
    pub lots: Decimal,
}

impl ExitOrder {
    fn full(pos: &Position) -> Self {
        ExitOrder {
            seq: pos.seq,
            lots: pos.remaining(),
        }
    }
}

impl ExitStruct {
    /// Orders to apply, in sequence, for one confirmed exit signal.
    pub fn select(&self, open: &OpenPositions) -> Vec<ExitOrder> {
        match self {
            ExitStruct::Fifo => open.oldest().map(ExitOrder::full).into_iter().collect(),
            ExitStruct::Lifo => open.newest().map(ExitOrder::full).into_iter().collect(),
            ExitStruct::TakeAll => open.iter().map(ExitOrder::full).collect(),
            ExitStruct::Fixed => Vec::new(),
            ExitStruct::HalfFifo => take_half(open.iter(), open.total_remaining()),
            ExitStruct::HalfLifo => take_half(open.iter().rev(), open.total_remaining()),
        }
    }

    pub fn is_fixed(&self) -> bool {
        *self == ExitStruct::Fixed
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExitStruct::Fifo => "FIFOExit",
            ExitStruct::Lifo => "LIFOExit",
            ExitStruct::TakeAll => "TakeAllExit",
            ExitStruct::Fixed => "FixedExit",
            ExitStruct::HalfFifo => "HalfFIFOExit",
            ExitStruct::HalfLifo => "HalfLIFOExit",
        }
    }
}

fn take_half<'a>(
    positions: impl Iterator<Item = &'a Position>,
    total: Decimal,
) -> Vec<ExitOrder> {
    let mut target = half_lots(total);
    let mut orders = Vec::new();
    for pos in positions {
        if target <= Decimal::ZERO {
            break;
        }
        let lots = pos.remaining().min(target);
        target -= lots;
        orders.push(ExitOrder { seq: pos.seq, lots });
    }
    orders
}

impl fmt::Display for ExitStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExitStruct {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FIFOExit" => Ok(ExitStruct::Fifo),
            "LIFOExit" => Ok(ExitStruct::Lifo),
            "TakeAllExit" => Ok(ExitStruct::TakeAll),
            "FixedExit" => Ok(ExitStruct::Fixed),
            "HalfFIFOExit" => Ok(ExitStruct::HalfFifo),
            "HalfLIFOExit" => Ok(ExitStruct::HalfLifo),
            other => Err(TradegenError::UnknownVariant {
                kind: "exit structure",
                name: other.to_string(),
            }),
        }
    }
}
