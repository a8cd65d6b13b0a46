pub mod signals;
pub mod template;
pub mod triple_ma;

pub use signals::{crossings, SignalDetector, SignalState, Signals};
pub use template::{HistoryProvider, StaticHistory, Strategy};
pub use triple_ma::{StrategySnapshot, TripleMaStrategy};
