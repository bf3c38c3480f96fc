//! The ordered set of open positions for one ticker.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::error::TradegenError;
use super::position::{CompletedTrade, ExitReason, Position};
use super::signal::Action;

/// Open positions in creation order: the head is the oldest.
///
/// Every position shares one ticker and one entry action.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPositions {
    positions: VecDeque<Position>,
    next_seq: u64,
}

impl Default for OpenPositions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenPositions {
    pub fn new() -> Self {
        OpenPositions {
            positions: VecDeque::new(),
            next_seq: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Position> {
        self.positions.iter()
    }

    pub fn oldest(&self) -> Option<&Position> {
        self.positions.front()
    }

    pub fn newest(&self) -> Option<&Position> {
        self.positions.back()
    }

    pub fn get(&self, seq: u64) -> Option<&Position> {
        self.positions.iter().find(|p| p.seq == seq)
    }

    /// Entry action shared by the open positions, if any.
    pub fn entry_action(&self) -> Option<Action> {
        self.positions.front().map(|p| p.entry_action)
    }

    pub fn total_remaining(&self) -> Decimal {
        self.positions.iter().map(Position::remaining).sum()
    }

    /// Open a new position at the tail and return its sequence number.
    pub fn open(
        &mut self,
        ticker: &str,
        entry_datetime: NaiveDateTime,
        entry_action: Action,
        lots: Decimal,
        price: Decimal,
        entry_bar: usize,
    ) -> Result<u64, TradegenError> {
        if entry_action.is_wait() {
            return Err(TradegenError::invariant("cannot open a position on 'wait'"));
        }
        if lots <= Decimal::ZERO {
            return Err(TradegenError::invariant(format!(
                "entry quantity must be positive, got {lots}"
            )));
        }
        if let Some(head) = self.positions.front() {
            if head.ticker != ticker {
                return Err(TradegenError::invariant(format!(
                    "open positions hold '{}', cannot add '{ticker}'",
                    head.ticker
                )));
            }
            if head.entry_action != entry_action {
                return Err(TradegenError::invariant(format!(
                    "open positions are '{}', cannot add '{entry_action}'",
                    head.entry_action
                )));
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.positions.push_back(Position {
            ticker: ticker.to_string(),
            seq,
            entry_datetime,
            entry_action,
            entry_lots: lots,
            entry_price: price,
            closed_lots: Decimal::ZERO,
            entry_bar,
        });
        Ok(seq)
    }

    /// Close `lots` of position `seq`; the position is dropped once fully closed.
    pub fn close(
        &mut self,
        seq: u64,
        lots: Decimal,
        exit_datetime: NaiveDateTime,
        exit_price: Decimal,
        reason: ExitReason,
    ) -> Result<CompletedTrade, TradegenError> {
        let idx = self
            .positions
            .iter()
            .position(|p| p.seq == seq)
            .ok_or_else(|| TradegenError::invariant(format!("no open position {seq}")))?;

        let trade = self.positions[idx].close(lots, exit_datetime, exit_price, reason)?;
        if !self.positions[idx].is_open() {
            self.positions.remove(idx);
        }
        Ok(trade)
    }

    /// Fully close position `seq`.
    pub fn close_full(
        &mut self,
        seq: u64,
        exit_datetime: NaiveDateTime,
        exit_price: Decimal,
        reason: ExitReason,
    ) -> Result<CompletedTrade, TradegenError> {
        let lots = self
            .get(seq)
            .map(Position::remaining)
            .ok_or_else(|| TradegenError::invariant(format!("no open position {seq}")))?;
        self.close(seq, lots, exit_datetime, exit_price, reason)
    }

    /// Close every position, oldest first.
    pub fn close_all(
        &mut self,
        exit_datetime: NaiveDateTime,
        exit_price: Decimal,
        reason: ExitReason,
    ) -> Result<Vec<CompletedTrade>, TradegenError> {
        let mut trades = Vec::with_capacity(self.positions.len());
        while let Some(mut pos) = self.positions.pop_front() {
            let lots = pos.remaining();
            trades.push(pos.close(lots, exit_datetime, exit_price, reason)?);
        }
        Ok(trades)
    }
}
