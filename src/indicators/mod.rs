pub mod array_manager;
pub mod rolling;

pub use array_manager::ArrayManager;
pub use rolling::{MaPair, RollingSma};
