use crate::data::{Bar, Tick};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Events delivered to the strategy loop, in arrival order
#[derive(Debug, Clone)]
pub enum MarketEvent {
    Tick(Tick),
    /// Pre-aggregated one-minute bar, used when no tick stream is available
    MinuteBar(Bar),
    Connected,
    Disconnected,
}

/// Random-walk tick source standing in for a live market-data connection
pub struct SyntheticFeed {
    symbol: String,
    start_price: Decimal,
    start_time: DateTime<Utc>,
    tick_interval: Duration,
    tick_count: usize,
    /// Max relative move per tick, e.g. 0.001 = 0.1%
    volatility: f64,
    /// Wall-clock delay between ticks; zero replays as fast as possible
    pace: Duration,
    rng: StdRng,
}

impl SyntheticFeed {
    pub fn new(symbol: impl Into<String>, start_price: Decimal, start_time: DateTime<Utc>, seed: u64) -> Self {
        Self {
            symbol: symbol.into(),
            start_price,
            start_time,
            tick_interval: Duration::from_secs(1),
            tick_count: 10_000,
            volatility: 0.001,
            pace: Duration::ZERO,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_tick_count(mut self, count: usize) -> Self {
        self.tick_count = count;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Generate the whole tick sequence up front
    pub fn generate(&mut self) -> Vec<Tick> {
        let mut ticks = Vec::with_capacity(self.tick_count);
        let mut price = self.start_price;
        let mut time = self.start_time;
        let step = chrono::Duration::from_std(self.tick_interval).unwrap_or_else(|_| chrono::Duration::seconds(1));

        for _ in 0..self.tick_count {
            let change = self.rng.gen_range(-self.volatility..=self.volatility);
            let factor = Decimal::from_f64(1.0 + change).unwrap_or(Decimal::ONE);
            price = (price * factor).round_dp(8);

            let volume = Decimal::from_f64(self.rng.gen_range(0.01..1.0))
                .unwrap_or(Decimal::ONE)
                .round_dp(4);

            ticks.push(Tick {
                symbol: self.symbol.clone(),
                price,
                volume,
                timestamp: time,
            });
            time += step;
        }

        ticks
    }

    /// Push every tick into the event channel. Stops early if the receiver is gone.
    pub async fn run(mut self, event_tx: mpsc::UnboundedSender<MarketEvent>) {
        let ticks = self.generate();
        info!("Synthetic feed started: {} ticks for {}", ticks.len(), self.symbol);
        let _ = event_tx.send(MarketEvent::Connected);

        for tick in ticks {
            if event_tx.send(MarketEvent::Tick(tick)).is_err() {
                debug!("Event receiver dropped, stopping feed");
                return;
            }
            if !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            } else {
                tokio::task::yield_now().await;
            }
        }

        let _ = event_tx.send(MarketEvent::Disconnected);
        info!("Synthetic feed finished");
    }
}
