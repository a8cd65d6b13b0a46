pub mod data;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod market;
pub mod position;
pub mod strategy;
pub mod utils;

// Re-export commonly used types
pub use data::{Bar, Direction, Offset, OrderId, OrderKind, OrderRequest, Side, Tick, TradeFill};
pub use error::{ConfigError, GatewayError};
pub use execution::{GatewayCall, OrderGateway, PaperGateway, PaperSession, RecordingGateway};
pub use indicators::{ArrayManager, MaPair, RollingSma};
pub use market::{BarGenerator, MarketEvent, SyntheticFeed};
pub use position::{EntryPrices, PositionState, PositionTracker};
pub use strategy::{
    HistoryProvider, SignalDetector, SignalState, Signals, StaticHistory, Strategy,
    StrategySnapshot, TripleMaStrategy,
};
pub use utils::{Config, StrategyConfig};
