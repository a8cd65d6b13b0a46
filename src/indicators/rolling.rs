use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Last two points of a moving-average series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaPair {
    pub current: Decimal,
    /// None while the series has a single point
    pub previous: Option<Decimal>,
}

/// Incremental simple moving average
///
/// Keeps a running sum of the trailing `window` closes: the new close is added
/// on append and the close leaving the window is subtracted. Decimal addition
/// is exact, so the result matches a fresh recomputation of the window.
#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    values: VecDeque<Decimal>,
    sum: Decimal,
    current: Option<Decimal>,
    previous: Option<Decimal>,
}

impl RollingSma {
    pub fn new(window: usize) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::ZeroWindow { name: "sma_window" });
        }

        Ok(Self {
            window,
            values: VecDeque::with_capacity(window + 1),
            sum: Decimal::ZERO,
            current: None,
            previous: None,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn update(&mut self, close: Decimal) {
        self.values.push_back(close);
        self.sum += close;

        if self.values.len() > self.window {
            if let Some(evicted) = self.values.pop_front() {
                self.sum -= evicted;
            }
        }

        if self.values.len() == self.window {
            self.previous = self.current;
            self.current = Some(self.sum / Decimal::from(self.window));
        }
    }

    /// Current and previous average, once a full window has been seen
    pub fn pair(&self) -> Option<MaPair> {
        self.current.map(|current| MaPair {
            current,
            previous: self.previous,
        })
    }
}
