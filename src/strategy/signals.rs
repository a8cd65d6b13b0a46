use crate::indicators::{ArrayManager, MaPair};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Last two points of the fast, slow and filter averages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    pub fast: MaPair,
    pub slow: MaPair,
    pub filter: MaPair,
}

impl SignalState {
    /// Read the tracked averages out of the buffer. None until the buffer is
    /// warmed up and every window has produced a value.
    pub fn from_buffer(am: &ArrayManager, fast: usize, slow: usize, filter: usize) -> Option<Self> {
        if !am.is_warmed_up() {
            return None;
        }

        Some(Self {
            fast: am.sma_pair(fast)?,
            slow: am.sma_pair(slow)?,
            filter: am.sma_pair(filter)?,
        })
    }
}

/// Flags evaluated once per closed bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    /// Fast average moved from below to above the slow average
    pub cross_over: bool,
    /// Fast average moved from above to below the slow average
    pub cross_below: bool,
    /// Close above the filter average
    pub filter_up: bool,
    /// Close below the filter average
    pub filter_down: bool,
    /// Filter average flat or rising
    pub trend_up: bool,
    /// Filter average flat or falling
    pub trend_down: bool,
}

/// Crossover and regime detector
///
/// Stateless apart from configuration: every flag is a strict comparison of the
/// current and previous points, so signals can fire on consecutive bars.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalDetector {
    /// Gate entries on the slope of the filter average
    trend_slope_filter: bool,
}

impl SignalDetector {
    pub fn new(trend_slope_filter: bool) -> Self {
        Self { trend_slope_filter }
    }

    pub fn detect(&self, state: &SignalState, close: Decimal) -> Signals {
        let (cross_over, cross_below) = crossings(&state.fast, &state.slow);
        let filter0 = state.filter.current;

        let (trend_up, trend_down) = match state.filter.previous {
            Some(filter1) => (filter0 >= filter1, filter0 <= filter1),
            None => (false, false),
        };

        Signals {
            cross_over,
            cross_below,
            filter_up: close > filter0,
            filter_down: close < filter0,
            trend_up,
            trend_down,
        }
    }

    /// Long entries: crossover in a bullish regime
    pub fn long_entry(&self, signals: &Signals) -> bool {
        let trend_ok = !self.trend_slope_filter || !signals.trend_down;
        signals.cross_over && signals.filter_up && trend_ok
    }

    /// Short entries: crossunder in a bearish regime
    pub fn short_entry(&self, signals: &Signals) -> bool {
        let trend_ok = !self.trend_slope_filter || !signals.trend_up;
        signals.cross_below && signals.filter_down && trend_ok
    }
}

/// (cross_over, cross_below) of `fast` against `slow`. Both false while
/// either series lacks a previous point.
pub fn crossings(fast: &MaPair, slow: &MaPair) -> (bool, bool) {
    let (fast1, slow1) = match (fast.previous, slow.previous) {
        (Some(f), Some(s)) => (f, s),
        _ => return (false, false),
    };
    let (fast0, slow0) = (fast.current, slow.current);

    let cross_over = fast0 > slow0 && fast1 < slow1;
    let cross_below = fast0 < slow0 && fast1 > slow1;
    (cross_over, cross_below)
}
