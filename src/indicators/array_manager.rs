use crate::data::Bar;
use crate::error::ConfigError;
use crate::indicators::rolling::{MaPair, RollingSma};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Bounded rolling history of closed bars
///
/// Holds at most `capacity` bars, evicting the oldest first. Moving averages
/// are available two ways:
/// 1. `simple_moving_average` recomputes the full aligned series from history
/// 2. `track` registers an incremental accumulator whose last two points are
///    read back with `sma_pair` in O(1)
///
/// Both agree on the last two values as long as `capacity >= window`.
pub struct ArrayManager {
    capacity: usize,

    /// Bars required before `is_warmed_up` reports true
    warmup: usize,

    /// Bars ever observed, not capped by capacity
    count: usize,

    bars: VecDeque<Bar>,

    trackers: Vec<RollingSma>,
}

impl ArrayManager {
    /// # Arguments
    /// * `capacity` - Bars retained (typically 200)
    /// * `warmup` - Bars required before indicators are considered valid,
    ///   usually the longest window in use
    pub fn new(capacity: usize, warmup: usize) -> Result<Self, ConfigError> {
        if warmup == 0 {
            return Err(ConfigError::ZeroWindow { name: "warmup" });
        }
        if capacity < warmup {
            return Err(ConfigError::CapacityTooSmall {
                capacity,
                window: warmup,
            });
        }

        Ok(Self {
            capacity,
            warmup,
            count: 0,
            bars: VecDeque::with_capacity(capacity + 1),
            trackers: Vec::new(),
        })
    }

    /// Append a closed bar
    pub fn update_bar(&mut self, bar: &Bar) {
        self.count += 1;
        self.bars.push_back(bar.clone());
        if self.bars.len() > self.capacity {
            self.bars.pop_front();
        }

        for tracker in &mut self.trackers {
            tracker.update(bar.close);
        }
    }

    pub fn is_warmed_up(&self) -> bool {
        self.count >= self.warmup
    }

    /// Alias of `is_warmed_up`
    pub fn inited(&self) -> bool {
        self.is_warmed_up()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn closes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Mean of the trailing `window` closes at every retained position that
    /// has a full window, oldest first. Empty if fewer than `window` bars are held.
    pub fn simple_moving_average(&self, window: usize) -> Vec<Decimal> {
        let n = self.bars.len();
        if window == 0 || n < window {
            return Vec::new();
        }

        let divisor = Decimal::from(window);
        let mut result = Vec::with_capacity(n - window + 1);

        let mut sum: Decimal = self.bars.iter().take(window).map(|b| b.close).sum();
        result.push(sum / divisor);

        for i in window..n {
            sum += self.bars[i].close;
            sum -= self.bars[i - window].close;
            result.push(sum / divisor);
        }

        result
    }

    /// Register an incremental average for `window`. Seeded from retained
    /// history, so it can be added after bars have arrived.
    pub fn track(&mut self, window: usize) -> Result<(), ConfigError> {
        if self.trackers.iter().any(|t| t.window() == window) {
            return Ok(());
        }

        let mut tracker = RollingSma::new(window)?;
        for bar in &self.bars {
            tracker.update(bar.close);
        }
        self.trackers.push(tracker);
        Ok(())
    }

    /// Last two points of a tracked average
    pub fn sma_pair(&self, window: usize) -> Option<MaPair> {
        self.trackers
            .iter()
            .find(|t| t.window() == window)
            .and_then(|t| t.pair())
    }
}
