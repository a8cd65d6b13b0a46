//! Market data and order types shared across the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Trade direction of a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Signed multiplier applied to a fill volume when updating the position
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Whether a fill opens new exposure or reduces existing exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Offset {
    Open,
    Close,
}

/// Order side as issued by the strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Open long
    Buy,
    /// Close long
    Sell,
    /// Open short
    Short,
    /// Close short
    Cover,
}

impl Side {
    pub fn direction(&self) -> Direction {
        match self {
            Side::Buy | Side::Cover => Direction::Long,
            Side::Sell | Side::Short => Direction::Short,
        }
    }

    pub fn offset(&self) -> Offset {
        match self {
            Side::Buy | Side::Short => Offset::Open,
            Side::Sell | Side::Cover => Offset::Close,
        }
    }
}

/// How the order is worked by the execution venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Execute now; `price` is the reference close that triggered it
    Market,
    /// Rest at `price` (take-profit)
    Limit,
    /// Trigger once `price` is touched (stop-loss)
    Stop,
}

/// Order request handed to the execution gateway. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub volume: Decimal,
}

impl OrderRequest {
    pub fn new(symbol: impl Into<String>, side: Side, kind: OrderKind, price: Decimal, volume: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind,
            price,
            volume,
        }
    }

    /// Send at market, keeping `price` as the reference for slippage
    pub fn at_market(mut self) -> Self {
        self.kind = OrderKind::Market;
        self
    }
}

/// Identifier assigned by the gateway on submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last-trade observation from the market-data feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: Decimal,
    /// Volume traded at this tick (not cumulative)
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// OHLCV bar. Immutable once closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Start of the bar window
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
}

impl Bar {
    /// Single-price bar, mostly useful for replaying close series
    pub fn from_close(symbol: impl Into<String>, close: Decimal, timestamp: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            symbol: symbol.into(),
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ZERO,
            timestamp,
            duration,
        }
    }

    /// End of the bar window (exclusive)
    pub fn end_time(&self) -> DateTime<Utc> {
        self.timestamp + chrono::Duration::from_std(self.duration).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// Fill notification reported by the execution gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: Direction,
    pub offset: Offset,
    pub price: Decimal,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TradeFill {
    /// Signed change this fill applies to the position
    pub fn position_delta(&self) -> Decimal {
        self.direction.sign() * self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_mapping() {
        assert_eq!(Side::Buy.direction(), Direction::Long);
        assert_eq!(Side::Buy.offset(), Offset::Open);
        assert_eq!(Side::Sell.direction(), Direction::Short);
        assert_eq!(Side::Sell.offset(), Offset::Close);
        assert_eq!(Side::Short.direction(), Direction::Short);
        assert_eq!(Side::Short.offset(), Offset::Open);
        assert_eq!(Side::Cover.direction(), Direction::Long);
        assert_eq!(Side::Cover.offset(), Offset::Close);
    }

    #[test]
    fn test_fill_position_delta() {
        let fill = TradeFill {
            order_id: OrderId("1".into()),
            symbol: "BTCUSDT".into(),
            direction: Direction::Short,
            offset: Offset::Open,
            price: dec!(100),
            volume: dec!(2.5),
            timestamp: Utc::now(),
        };
        assert_eq!(fill.position_delta(), dec!(-2.5));
    }

    #[test]
    fn test_bar_end_time() {
        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let bar = Bar::from_close("BTCUSDT", dec!(1), start, Duration::from_secs(300));
        assert_eq!(bar.end_time(), start + chrono::Duration::minutes(5));
    }
}
