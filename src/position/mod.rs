pub mod tracker;

pub use tracker::{EntryPrices, PositionState, PositionTracker};
