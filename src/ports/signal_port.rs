//! Signal generation port trait, implemented by callers.

use crate::domain::bar::SignalBar;
use crate::domain::signal::Action;

/// Produces one marker per bar for each channel.
pub trait SignalGenerator {
    fn entry_signals(&self, bars: &[SignalBar]) -> Vec<Action>;
    fn exit_signals(&self, bars: &[SignalBar]) -> Vec<Action>;
}
