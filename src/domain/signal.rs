//! Signal markers and direction modes.

use std::fmt;
use std::str::FromStr;

use super::error::TradegenError;

/// Per-bar marker on the entry or exit channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    Buy,
    Sell,
    #[default]
    Wait,
}

impl Action {
    pub fn is_wait(self) -> bool {
        self == Action::Wait
    }

    /// Buy <-> Sell; Wait stays Wait.
    pub fn opposite(self) -> Action {
        match self {
            Action::Buy => Action::Sell,
            Action::Sell => Action::Buy,
            Action::Wait => Action::Wait,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Wait => "wait",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            "wait" | "" => Ok(Action::Wait),
            _ => Err(TradegenError::UnknownVariant {
                kind: "price action",
                name: s.to_string(),
            }),
        }
    }
}

/// Which marker column a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Entry,
    Exit,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Entry => f.write_str("entry"),
            Channel::Exit => f.write_str("exit"),
        }
    }
}

/// Direction mode of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryType {
    Long,
    Short,
    #[default]
    LongShort,
}

impl EntryType {
    /// Whether `action` may appear on `channel` under this direction mode.
    ///
    /// Long-only rejects sell entries and buy exits; short-only rejects buy
    /// entries and sell exits. Wait is always allowed.
    pub fn permits(self, channel: Channel, action: Action) -> bool {
        match (self, channel, action) {
            (_, _, Action::Wait) | (EntryType::LongShort, _, _) => true,
            (EntryType::Long, Channel::Entry, a) => a == Action::Buy,
            (EntryType::Long, Channel::Exit, a) => a == Action::Sell,
            (EntryType::Short, Channel::Entry, a) => a == Action::Sell,
            (EntryType::Short, Channel::Exit, a) => a == Action::Buy,
        }
    }

    pub fn validate(
        self,
        bar: usize,
        channel: Channel,
        action: Action,
    ) -> Result<(), TradegenError> {
        if self.permits(channel, action) {
            Ok(())
        } else {
            Err(TradegenError::DirectionMode {
                bar,
                channel,
                action,
                entry_type: self,
            })
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Long => f.write_str("long"),
            EntryType::Short => f.write_str("short"),
            EntryType::LongShort => f.write_str("longshort"),
        }
    }
}

impl FromStr for EntryType {
    type Err = TradegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(EntryType::Long),
            "short" => Ok(EntryType::Short),
            "longshort" => Ok(EntryType::LongShort),
            _ => Err(TradegenError::UnknownVariant {
                kind: "entry type",
                name: s.to_string(),
            }),
        }
    }
}
