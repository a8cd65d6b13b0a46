use crate::data::{Bar, Tick, TradeFill};
use crate::error::ConfigError;
use crate::execution::paper::PaperGateway;
use crate::strategy::{Strategy, TripleMaStrategy};
use crate::utils::config::StrategyConfig;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Strategy wired to the paper venue.
///
/// Fills produced while handling an event are applied before the call
/// returns, so the next bar is always decided on the real position.
pub struct PaperSession {
    strategy: TripleMaStrategy<PaperGateway>,
    fill_rx: mpsc::UnboundedReceiver<TradeFill>,
    ticks: usize,
    fills: usize,
}

impl PaperSession {
    pub fn new(symbol: impl Into<String>, params: StrategyConfig, slippage_bps: Decimal) -> Result<Self, ConfigError> {
        let (fill_tx, fill_rx) = mpsc::unbounded_channel();
        let gateway = PaperGateway::new(fill_tx, slippage_bps);

        Ok(Self {
            strategy: TripleMaStrategy::new(symbol, params, gateway)?,
            fill_rx,
            ticks: 0,
            fills: 0,
        })
    }

    /// Match resting orders, then let the strategy see the tick
    pub fn on_tick(&mut self, tick: &Tick) {
        self.ticks += 1;

        if let Err(e) = self.strategy.gateway_mut().on_tick(tick) {
            warn!("Paper venue failed to match orders: {}", e);
        }
        self.apply_fills();

        self.strategy.on_tick(tick);
        self.apply_fills();
    }

    pub fn on_bar(&mut self, bar: &Bar) {
        self.strategy.on_bar(bar);
        self.apply_fills();
    }

    /// Close the partial bar, settle its orders and stop trading
    pub fn finish(&mut self) {
        self.strategy.flush();
        self.apply_fills();
        self.strategy.on_stop();
    }

    pub fn strategy(&self) -> &TripleMaStrategy<PaperGateway> {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut TripleMaStrategy<PaperGateway> {
        &mut self.strategy
    }

    pub fn tick_count(&self) -> usize {
        self.ticks
    }

    pub fn fill_count(&self) -> usize {
        self.fills
    }

    fn apply_fills(&mut self) {
        while let Ok(fill) = self.fill_rx.try_recv() {
            self.fills += 1;
            info!(
                "Fill | {:?}/{:?} {} @ {} | order {}",
                fill.direction, fill.offset, fill.volume, fill.price, fill.order_id
            );
            self.strategy.on_trade(&fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketEvent, SyntheticFeed};
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn params() -> StrategyConfig {
        StrategyConfig {
            bar_window: 1,
            fast_window: 3,
            slow_window: 5,
            filter_window: 10,
            trade_money: dec!(1000),
            per_win: dec!(0.07),
            per_lose: dec!(0.01),
            history_capacity: 20,
            load_days: 1,
            trend_slope_filter: false,
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_queued_ticks_never_stack_entries() {
        let ticks = SyntheticFeed::new("BTCUSDT", dec!(100), start(), 7)
            .with_tick_interval(Duration::from_secs(15))
            .with_tick_count(2_400)
            .with_volatility(0.002)
            .generate();

        // Whole feed queued ahead of the loop
        let (tx, mut rx) = mpsc::unbounded_channel();
        for tick in ticks {
            tx.send(MarketEvent::Tick(tick)).unwrap();
        }
        drop(tx);

        let mut session = PaperSession::new("BTCUSDT", params(), Decimal::ZERO).unwrap();
        session.strategy_mut().on_start();

        let mut low = Decimal::MAX;
        while let Ok(event) = rx.try_recv() {
            let MarketEvent::Tick(tick) = event else { continue };
            low = low.min(tick.price);
            session.on_tick(&tick);

            // One entry is trade_money / close, and no close is below the lowest price seen
            let one_entry = params().trade_money / low;
            let pos = session.strategy().position().pos();
            assert!(pos.abs() <= one_entry, "position {} exceeds one entry of {}", pos, one_entry);
        }

        session.finish();
        assert_eq!(session.tick_count(), 2_400);
        assert!(session.fill_count() >= 2);
        assert_eq!(session.strategy().snapshot().fills, session.fill_count());
        assert!(!session.strategy().is_trading());
    }

    #[test]
    fn test_entry_fill_applied_before_next_bar() {
        let mut session = PaperSession::new("BTCUSDT", params(), Decimal::ZERO).unwrap();
        session.strategy_mut().on_start();

        // Dip then rally: fast crosses above slow on the 104 close, above the filter
        let closes = [
            dec!(100), dec!(100), dec!(100), dec!(100), dec!(100), dec!(100), dec!(100), dec!(100),
            dec!(99), dec!(98), dec!(97), dec!(104), dec!(110),
        ];
        for (i, close) in closes.iter().enumerate() {
            let bar = Bar::from_close(
                "BTCUSDT",
                *close,
                start() + chrono::Duration::minutes(i as i64),
                Duration::from_secs(60),
            );
            session.on_bar(&bar);
        }

        // Entered at 104 on the crossover bar; the next bar already saw the long
        let strategy = session.strategy();
        assert_eq!(session.fill_count(), 1);
        assert_eq!(strategy.position().pos(), dec!(1000) / dec!(104));
        assert_eq!(strategy.position().long_entry_price(), Some(dec!(104)));
        assert_eq!(strategy.gateway().resting_orders().len(), 2);
    }
}
