use crate::data::{Bar, Tick, TradeFill};
use anyhow::Result;

/// Hooks a host event loop drives a strategy through.
///
/// The host owns scheduling; the strategy never calls back into it except
/// through its order gateway. Every hook takes `&mut self`, so events are
/// processed one at a time in the order the host delivers them.
pub trait Strategy {
    /// Load warm-up history. Orders are suppressed until `on_start`.
    fn on_init(&mut self, history: &mut dyn HistoryProvider) -> Result<()>;

    fn on_start(&mut self);

    fn on_stop(&mut self);

    fn on_tick(&mut self, tick: &Tick);

    /// One-minute sub-bar, used when no tick stream is available
    fn on_bar(&mut self, bar: &Bar);

    fn on_trade(&mut self, fill: &TradeFill);
}

/// Source of historical one-minute bars for warm-up
pub trait HistoryProvider {
    fn load_bars(&mut self, symbol: &str, days: u32) -> Result<Vec<Bar>>;
}

/// History held in memory, returned as-is regardless of the requested span
#[derive(Debug, Clone, Default)]
pub struct StaticHistory {
    bars: Vec<Bar>,
}

impl StaticHistory {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }
}

impl HistoryProvider for StaticHistory {
    fn load_bars(&mut self, symbol: &str, _days: u32) -> Result<Vec<Bar>> {
        Ok(self
            .bars
            .iter()
            .filter(|b| b.symbol == symbol)
            .cloned()
            .collect())
    }
}
