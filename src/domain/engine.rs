//! Bar-by-bar trade generation.
//!
//! Each bar runs, in order: time exit, exit signal (or fixed profit levels),
//! stop loss, trailing profit, then entry. The last bar closes everything at
//! its close and does nothing else.

use log::{debug, info};
use rust_decimal::Decimal;

use super::bar::{AnnotatedBar, SignalBar};
use super::config::{RiskConfig, TradingConfig};
use super::error::TradegenError;
use super::evaluator::SignalEvaluator;
use super::fixed_exit::{FixedHit, FixedLevel, FixedLevels};
use super::open_positions::OpenPositions;
use super::position::{CompletedTrade, ExitReason};
use super::signal::{Action, Channel};
use super::stop::breach_price;
use super::trail::TrailState;

/// Output of one pass: the trade ledger and the annotated input series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeRun {
    pub trades: Vec<CompletedTrade>,
    pub bars: Vec<AnnotatedBar>,
}

/// Immutable engine; all mutable state lives in a per-pass struct.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEngine {
    trading: TradingConfig,
    risk: RiskConfig,
}

impl TradeEngine {
    pub fn new(trading: TradingConfig, risk: RiskConfig) -> Result<Self, TradegenError> {
        trading.validate()?;
        risk.validate()?;
        Ok(TradeEngine { trading, risk })
    }

    pub fn trading(&self) -> &TradingConfig {
        &self.trading
    }

    pub fn risk(&self) -> &RiskConfig {
        &self.risk
    }

    /// Walk `bars` once and return completed trades plus the annotated series.
    pub fn run(&self, bars: &[SignalBar]) -> Result<TradeRun, TradegenError> {
        if bars.is_empty() {
            return Ok(TradeRun::default());
        }
        self.check_inputs(bars)?;

        let mut pass = Pass::new(self, bars.len());
        let last = bars.len() - 1;
        for (idx, bar) in bars.iter().enumerate() {
            if idx == last {
                pass.close_at_end(bar)?;
            } else {
                pass.step(idx, bar)?;
            }
        }

        let run = pass.finish();
        info!(
            "{}: {} bars, {} completed trades",
            bars[0].ticker,
            run.bars.len(),
            run.trades.len()
        );
        Ok(run)
    }

    fn check_inputs(&self, bars: &[SignalBar]) -> Result<(), TradegenError> {
        let ticker = &bars[0].ticker;
        let entry_type = self.trading.entry_type;

        for (idx, bar) in bars.iter().enumerate() {
            if &bar.ticker != ticker {
                return Err(TradegenError::TickerMismatch {
                    expected: ticker.clone(),
                    found: bar.ticker.clone(),
                    bar: idx,
                });
            }
            if idx > 0 && bar.datetime <= bars[idx - 1].datetime {
                return Err(TradegenError::data(format!(
                    "bar {idx}: timestamp {} is not after {}",
                    bar.datetime,
                    bars[idx - 1].datetime
                )));
            }
            entry_type.validate(idx, Channel::Entry, bar.entry_signal)?;
            entry_type.validate(idx, Channel::Exit, bar.exit_signal)?;
        }

        if self.trading.exit_struct.is_fixed() && bars.iter().any(|b| b.stop.is_none()) {
            return Err(TradegenError::MissingColumn {
                column: "stop".to_string(),
            });
        }
        Ok(())
    }
}

struct Pass<'a> {
    trading: &'a TradingConfig,
    risk: &'a RiskConfig,
    open: OpenPositions,
    entry_eval: SignalEvaluator,
    exit_eval: SignalEvaluator,
    trail: TrailState,
    fixed: FixedLevels,
    trades: Vec<CompletedTrade>,
    annotated: Vec<AnnotatedBar>,
}

impl<'a> Pass<'a> {
    fn new(engine: &'a TradeEngine, len: usize) -> Self {
        let risk = &engine.risk;
        let evaluator = || {
            SignalEvaluator::new(
                risk.sig_eval_method,
                risk.trigger_percent,
                risk.breakout_window,
            )
        };
        Pass {
            trading: &engine.trading,
            risk,
            open: OpenPositions::new(),
            entry_eval: evaluator(),
            exit_eval: evaluator(),
            trail: TrailState::new(),
            fixed: FixedLevels::new(),
            trades: Vec::new(),
            annotated: Vec::with_capacity(len),
        }
    }

    fn finish(self) -> TradeRun {
        TradeRun {
            trades: self.trades,
            bars: self.annotated,
        }
    }

    fn close_at_end(&mut self, bar: &SignalBar) -> Result<(), TradegenError> {
        let mut out = AnnotatedBar::new(bar.clone());
        self.close_all(&mut out, bar.close, ExitReason::EndOfSeries)?;
        self.annotated.push(out);
        Ok(())
    }

    fn step(&mut self, idx: usize, bar: &SignalBar) -> Result<(), TradegenError> {
        let mut out = AnnotatedBar::new(bar.clone());

        self.check_time_exit(idx, bar, &mut out)?;
        if self.trading.exit_struct.is_fixed() {
            self.check_fixed_profit(bar, &mut out)?;
        } else {
            self.check_exit_signal(bar, &mut out)?;
        }
        if self.risk.stop_method.is_enabled() {
            if self.trading.exit_struct.is_fixed() {
                self.check_fixed_stop(bar, &mut out)?;
            } else {
                self.check_stop_loss(bar, &mut out)?;
            }
        }
        self.check_trailing_profit(bar, &mut out)?;
        self.check_new_pos(idx, bar)?;

        self.annotated.push(out);
        Ok(())
    }

    fn check_time_exit(
        &mut self,
        idx: usize,
        bar: &SignalBar,
        out: &mut AnnotatedBar,
    ) -> Result<(), TradegenError> {
        let Some(period) = self.risk.time_period else {
            return Ok(());
        };
        let expired: Vec<u64> = self
            .open
            .iter()
            .filter(|p| idx - p.entry_bar >= period)
            .map(|p| p.seq)
            .collect();
        if expired.is_empty() {
            return Ok(());
        }

        let exit_action = self.exit_action();
        for seq in expired {
            let trade = self
                .open
                .close_full(seq, bar.datetime, bar.close, ExitReason::Time)?;
            self.record(trade);
        }
        out.mark_forced_exit(exit_action, ExitReason::Time);
        self.after_close();
        Ok(())
    }

    fn check_exit_signal(
        &mut self,
        bar: &SignalBar,
        out: &mut AnnotatedBar,
    ) -> Result<(), TradegenError> {
        let Some(entry_action) = self.open.entry_action() else {
            return Ok(());
        };
        let Some(conf) = self.exit_eval.evaluate(bar, bar.exit_signal) else {
            return Ok(());
        };
        if conf.action != entry_action.opposite() {
            debug!(
                "{}: ignoring '{}' exit while holding '{}'",
                bar.datetime, conf.action, entry_action
            );
            return Ok(());
        }

        for order in self.trading.exit_struct.select(&self.open) {
            let trade = self.open.close(
                order.seq,
                order.lots,
                conf.datetime,
                conf.price,
                ExitReason::Signal,
            )?;
            self.record(trade);
        }
        out.exit_reason = Some(ExitReason::Signal);
        self.after_close();
        Ok(())
    }

    fn check_fixed_profit(
        &mut self,
        bar: &SignalBar,
        out: &mut AnnotatedBar,
    ) -> Result<(), TradegenError> {
        let hits = self.fixed.profit_hits(&self.open, bar);
        self.apply_fixed_hits(hits, bar, out)
    }

    fn check_fixed_stop(
        &mut self,
        bar: &SignalBar,
        out: &mut AnnotatedBar,
    ) -> Result<(), TradegenError> {
        let hits = self
            .fixed
            .stop_hits(&self.open, bar, self.trading.monitor_close);
        if let Some(level) = hits.last().and_then(|h| self.fixed.get(h.seq)) {
            out.stop_price = Some(level.stop);
            out.stop_triggered = true;
        }
        self.apply_fixed_hits(hits, bar, out)
    }

    fn apply_fixed_hits(
        &mut self,
        hits: Vec<FixedHit>,
        bar: &SignalBar,
        out: &mut AnnotatedBar,
    ) -> Result<(), TradegenError> {
        let Some(last) = hits.last().copied() else {
            return Ok(());
        };
        let exit_action = self.exit_action();
        for hit in hits {
            let trade = self
                .open
                .close_full(hit.seq, bar.datetime, hit.price, hit.reason)?;
            self.record(trade);
        }
        out.mark_forced_exit(exit_action, last.reason);
        self.after_close();
        Ok(())
    }

    fn check_stop_loss(
        &mut self,
        bar: &SignalBar,
        out: &mut AnnotatedBar,
    ) -> Result<(), TradegenError> {
        let Some(entry_action) = self.open.entry_action() else {
            return Ok(());
        };
        let Some(stop) = self
            .risk
            .stop_method
            .stop_price(&self.open, self.risk.percent_loss)?
        else {
            return Ok(());
        };

        out.stop_price = Some(stop);
        if let Some(price) = breach_price(entry_action, stop, bar, self.trading.monitor_close) {
            debug!("{}: stop {} breached, exit at {}", bar.datetime, stop, price);
            out.stop_triggered = true;
            self.close_all(out, price, ExitReason::Stop)?;
        }
        Ok(())
    }

    fn check_trailing_profit(
        &mut self,
        bar: &SignalBar,
        out: &mut AnnotatedBar,
    ) -> Result<(), TradegenError> {
        if !self.risk.trail_method.is_enabled() {
            return Ok(());
        }
        let Some(entry_action) = self.open.entry_action() else {
            return Ok(());
        };
        let Some(level) = self
            .trail
            .update(&self.risk.trail_params(), &self.open, bar)?
        else {
            return Ok(());
        };

        out.trail_price = Some(level);
        if let Some(price) = breach_price(entry_action, level, bar, self.trading.monitor_close) {
            debug!("{}: trail {} breached, exit at {}", bar.datetime, level, price);
            out.trail_triggered = true;
            self.close_all(out, price, ExitReason::Trail)?;
        }
        Ok(())
    }

    fn check_new_pos(&mut self, idx: usize, bar: &SignalBar) -> Result<(), TradegenError> {
        let Some(conf) = self.entry_eval.evaluate(bar, bar.entry_signal) else {
            return Ok(());
        };

        if let Some(held) = self.open.entry_action() {
            if held != conf.action {
                debug!(
                    "{}: '{}' entry flips '{}' positions at {}",
                    conf.datetime, conf.action, held, conf.price
                );
                let trades = self
                    .open
                    .close_all(conf.datetime, conf.price, ExitReason::Flip)?;
                for trade in trades {
                    self.record(trade);
                }
                self.trail.reset();
                self.fixed.clear();
            }
        }

        let Some(lots) = self
            .trading
            .entry_struct
            .entry_lots(&self.open, self.trading.num_lots)
        else {
            return Ok(());
        };
        let seq = self.open.open(
            &bar.ticker,
            conf.datetime,
            conf.action,
            lots,
            conf.price,
            idx,
        )?;
        debug!(
            "{}: open #{} '{}' {} lots at {}",
            conf.datetime, seq, conf.action, lots, conf.price
        );

        if self.trading.exit_struct.is_fixed() {
            let stop = bar.stop.ok_or_else(|| TradegenError::MissingColumn {
                column: "stop".to_string(),
            })?;
            self.fixed
                .register(seq, FixedLevel::from_entry(conf.action, conf.price, stop)?);
        }
        Ok(())
    }

    fn close_all(
        &mut self,
        out: &mut AnnotatedBar,
        price: Decimal,
        reason: ExitReason,
    ) -> Result<(), TradegenError> {
        if self.open.is_empty() {
            return Ok(());
        }
        let exit_action = self.exit_action();
        let trades = self.open.close_all(out.bar.datetime, price, reason)?;
        for trade in trades {
            self.record(trade);
        }
        out.mark_forced_exit(exit_action, reason);
        self.after_close();
        Ok(())
    }

    fn exit_action(&self) -> Action {
        self.open
            .entry_action()
            .map(Action::opposite)
            .unwrap_or(Action::Wait)
    }

    fn record(&mut self, trade: CompletedTrade) {
        debug!(
            "{}: close #{} {} lots at {} ({})",
            trade.exit_datetime, trade.seq, trade.exit_lots, trade.exit_price, trade.exit_reason
        );
        self.trades.push(trade);
    }

    /// Drop state tied to positions that are gone.
    fn after_close(&mut self) {
        self.fixed.retain_open(&self.open);
        if self.open.is_empty() {
            self.trail.reset();
            self.entry_eval.reset();
            self.exit_eval.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entry::EntryStruct;
    use crate::domain::evaluator::SigEvalMethod;
    use crate::domain::exit::ExitStruct;
    use crate::domain::signal::EntryType;
    use crate::domain::stop::StopMethod;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn day(n: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(n)
    }

    fn flat(n: i64, price: Decimal) -> SignalBar {
        SignalBar::new("AAPL", day(n), price, price, price, price)
    }

    fn engine(trading: TradingConfig, risk: RiskConfig) -> TradeEngine {
        TradeEngine::new(trading, risk).unwrap()
    }

    fn close_eval() -> RiskConfig {
        RiskConfig {
            sig_eval_method: SigEvalMethod::Close,
            ..RiskConfig::default()
        }
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(0));
        assert!(TradeEngine::new(trading, RiskConfig::default()).is_err());
    }

    #[test]
    fn empty_input_gives_empty_run() {
        let e = engine(
            TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(1)),
            RiskConfig::default(),
        );
        assert_eq!(e.run(&[]).unwrap(), TradeRun::default());
    }

    #[test]
    fn unordered_timestamps_rejected() {
        let e = engine(
            TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(1)),
            RiskConfig::default(),
        );
        let bars = vec![flat(2, dec!(10)), flat(1, dec!(10))];
        assert!(matches!(e.run(&bars).unwrap_err(), TradegenError::Data { .. }));
    }

    #[test]
    fn fixed_exit_requires_stop_column() {
        let e = engine(
            TradingConfig::new(EntryStruct::Single, ExitStruct::Fixed, dec!(1)),
            RiskConfig::default(),
        );
        let bars = vec![flat(1, dec!(10)), flat(2, dec!(10))];
        assert!(matches!(
            e.run(&bars).unwrap_err(),
            TradegenError::MissingColumn { column } if column == "stop"
        ));
    }

    #[test]
    fn close_evaluator_round_trip() {
        let e = engine(
            TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(100)),
            close_eval(),
        );
        let bars = vec![
            flat(1, dec!(10)).with_entry(Action::Buy),
            flat(2, dec!(11)),
            flat(3, dec!(12)).with_exit(Action::Sell),
            flat(4, dec!(12)),
        ];
        let run = e.run(&bars).unwrap();
        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].entry_price, dec!(10));
        assert_eq!(run.trades[0].exit_price, dec!(12));
        assert_eq!(run.trades[0].profit_loss(), dec!(200));
        assert_eq!(run.bars.len(), 4);
    }

    #[test]
    fn same_direction_exit_is_ignored() {
        let trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(1));
        let e = engine(trading, close_eval());
        let bars = vec![
            flat(1, dec!(10)).with_entry(Action::Buy),
            flat(2, dec!(11)).with_exit(Action::Buy),
            flat(3, dec!(12)),
        ];
        let run = e.run(&bars).unwrap();
        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].exit_reason, ExitReason::EndOfSeries);
    }

    #[test]
    fn end_of_series_closes_at_last_close() {
        let e = engine(
            TradingConfig::new(EntryStruct::Multi, ExitStruct::Fifo, dec!(5)),
            close_eval(),
        );
        let bars = vec![
            flat(1, dec!(10)).with_entry(Action::Buy),
            flat(2, dec!(11)).with_entry(Action::Buy),
            SignalBar::new("AAPL", day(3), dec!(12), dec!(13), dec!(11), dec!(12.5))
                .with_entry(Action::Buy),
        ];
        let run = e.run(&bars).unwrap();
        assert_eq!(run.trades.len(), 2);
        assert!(run
            .trades
            .iter()
            .all(|t| t.exit_reason == ExitReason::EndOfSeries && t.exit_price == dec!(12.5)));
        assert_eq!(run.bars[2].bar.exit_signal, Action::Sell);
    }

    #[test]
    fn flip_closes_opposite_positions() {
        let e = engine(
            TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(10)),
            close_eval(),
        );
        let bars = vec![
            flat(1, dec!(10)).with_entry(Action::Buy),
            flat(2, dec!(9)).with_entry(Action::Sell),
            flat(3, dec!(8)),
        ];
        let run = e.run(&bars).unwrap();
        assert_eq!(run.trades.len(), 2);
        assert_eq!(run.trades[0].exit_reason, ExitReason::Flip);
        assert_eq!(run.trades[0].exit_price, dec!(9));
        assert_eq!(run.trades[1].entry_action, Action::Sell);
        assert_eq!(run.trades[1].profit_loss(), dec!(10));
    }

    #[test]
    fn long_only_rejects_sell_entry_before_trading() {
        let mut trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(1));
        trading.entry_type = EntryType::Long;
        let e = engine(trading, close_eval());
        let bars = vec![
            flat(1, dec!(10)).with_entry(Action::Buy),
            flat(2, dec!(10)),
            flat(3, dec!(10)).with_entry(Action::Sell),
        ];
        assert!(matches!(
            e.run(&bars).unwrap_err(),
            TradegenError::DirectionMode { bar: 2, channel: Channel::Entry, .. }
        ));
    }

    #[test]
    fn stop_annotates_price_and_trigger() {
        let risk = RiskConfig {
            stop_method: StopMethod::LatestLoss,
            percent_loss: dec!(0.1),
            ..close_eval()
        };
        let mut trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(10));
        trading.monitor_close = false;
        let e = engine(trading, risk);
        let bars = vec![
            flat(1, dec!(100)).with_entry(Action::Buy),
            SignalBar::new("AAPL", day(2), dec!(99), dec!(100), dec!(92), dec!(95)),
            flat(3, dec!(95)),
        ];
        let run = e.run(&bars).unwrap();
        assert_eq!(run.bars[1].stop_price, Some(dec!(90)));
        assert!(!run.bars[1].stop_triggered);

        let bars = vec![
            flat(1, dec!(100)).with_entry(Action::Buy),
            SignalBar::new("AAPL", day(2), dec!(99), dec!(100), dec!(88), dec!(95)),
            flat(3, dec!(95)),
        ];
        let run = e.run(&bars).unwrap();
        assert!(run.bars[1].stop_triggered);
        assert_eq!(run.bars[1].exit_reason, Some(ExitReason::Stop));
        assert_eq!(run.trades[0].exit_price, dec!(90));
    }

    #[test]
    fn engine_is_reusable_across_passes() {
        let e = engine(
            TradingConfig::new(EntryStruct::Single, ExitStruct::Fifo, dec!(1)),
            close_eval(),
        );
        let bars = vec![
            flat(1, dec!(10)).with_entry(Action::Buy),
            flat(2, dec!(11)).with_exit(Action::Sell),
            flat(3, dec!(12)),
        ];
        let first = e.run(&bars).unwrap();
        let second = e.run(&bars).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.trades[0].seq, 1);
    }

    fn fixed_stop_bars() -> Vec<SignalBar> {
        let breach = SignalBar::new("AAPL", day(2), dec!(99), dec!(100), dec!(90), dec!(96));
        vec![
            flat(1, dec!(100)).with_entry(Action::Buy).with_stop(dec!(95)),
            breach.with_stop(dec!(95)),
            flat(3, dec!(97)).with_stop(dec!(95)),
        ]
    }

    #[test]
    fn fixed_stop_ignored_without_stop_method() {
        let mut trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fixed, dec!(1));
        trading.monitor_close = false;
        let run = engine(trading, close_eval()).run(&fixed_stop_bars()).unwrap();

        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].exit_reason, ExitReason::EndOfSeries);
        assert_eq!(run.trades[0].exit_price, dec!(97));
        assert!(!run.bars[1].stop_triggered);
        assert_eq!(run.bars[1].stop_price, None);
    }

    #[test]
    fn fixed_stop_records_level_on_bar() {
        let mut trading = TradingConfig::new(EntryStruct::Single, ExitStruct::Fixed, dec!(1));
        trading.monitor_close = false;
        let risk = RiskConfig {
            stop_method: StopMethod::LatestLoss,
            ..close_eval()
        };
        let run = engine(trading, risk).run(&fixed_stop_bars()).unwrap();

        assert_eq!(run.trades[0].exit_reason, ExitReason::FixedStop);
        assert_eq!(run.trades[0].exit_price, dec!(95));
        assert!(run.bars[1].stop_triggered);
        assert_eq!(run.bars[1].stop_price, Some(dec!(95)));
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TradeEngine>();
        assert_send_sync::<TradeRun>();
    }
}
