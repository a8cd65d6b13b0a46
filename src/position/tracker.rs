use crate::data::{Direction, Offset, TradeFill};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directional state derived from the sign of the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

/// Fill price of the most recent opening trade in each direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPrices {
    pub long: Option<Decimal>,
    pub short: Option<Decimal>,
}

/// Signed single-instrument position, mutated only by fills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionTracker {
    symbol: String,
    /// Positive = long, negative = short
    pos: Decimal,
    entry: EntryPrices,
    fill_count: usize,
}

impl PositionTracker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            pos: Decimal::ZERO,
            entry: EntryPrices::default(),
            fill_count: 0,
        }
    }

    /// Apply a fill notification.
    ///
    /// The entry price is only recorded for opening fills that leave a
    /// non-zero position. Closing fills never touch it.
    pub fn apply_fill(&mut self, fill: &TradeFill) {
        self.pos += fill.position_delta();
        self.fill_count += 1;

        if !self.pos.is_zero() && fill.offset == Offset::Open {
            match fill.direction {
                Direction::Long => self.entry.long = Some(fill.price),
                Direction::Short => self.entry.short = Some(fill.price),
            }
        }

        debug!(
            "Fill applied | {} {:?}/{:?} {} @ {} -> pos {}",
            self.symbol, fill.direction, fill.offset, fill.volume, fill.price, self.pos
        );
    }

    pub fn state(&self) -> PositionState {
        if self.pos > Decimal::ZERO {
            PositionState::Long
        } else if self.pos < Decimal::ZERO {
            PositionState::Short
        } else {
            PositionState::Flat
        }
    }

    /// Signed position
    pub fn pos(&self) -> Decimal {
        self.pos
    }

    /// Absolute position size
    pub fn volume(&self) -> Decimal {
        self.pos.abs()
    }

    pub fn entry_prices(&self) -> EntryPrices {
        self.entry
    }

    pub fn long_entry_price(&self) -> Option<Decimal> {
        self.entry.long
    }

    pub fn short_entry_price(&self) -> Option<Decimal> {
        self.entry.short
    }

    pub fn fill_count(&self) -> usize {
        self.fill_count
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}
