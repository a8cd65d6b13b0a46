pub mod bar_generator;
pub mod feed;

pub use bar_generator::BarGenerator;
pub use feed::{MarketEvent, SyntheticFeed};
