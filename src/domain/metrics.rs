//! Aggregate statistics over a completed-trade ledger.

use rust_decimal::Decimal;

use super::numeric::round_percent;
use super::position::CompletedTrade;

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub total_profit: Decimal,
    pub avg_percent_ret: Decimal,
    pub avg_days_held: f64,
}

impl LedgerSummary {
    pub fn compute(trades: &[CompletedTrade]) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut breakeven = 0usize;
        let mut total_profit = Decimal::ZERO;
        let mut total_percent = Decimal::ZERO;
        let mut total_days = 0i64;

        for trade in trades {
            let percent_ret = trade.percent_ret();
            if percent_ret > Decimal::ZERO {
                wins += 1;
            } else if percent_ret < Decimal::ZERO {
                losses += 1;
            } else {
                breakeven += 1;
            }
            total_profit += trade.profit_loss();
            total_percent += percent_ret;
            total_days += trade.days_held();
        }

        let total_trades = trades.len();
        let (win_rate, avg_percent_ret, avg_days_held) = if total_trades > 0 {
            (
                wins as f64 / total_trades as f64,
                round_percent(total_percent / Decimal::from(total_trades)),
                total_days as f64 / total_trades as f64,
            )
        } else {
            (0.0, Decimal::ZERO, 0.0)
        };

        LedgerSummary {
            total_trades,
            wins,
            losses,
            breakeven,
            win_rate,
            total_profit,
            avg_percent_ret,
            avg_days_held,
        }
    }
}
