pub mod config;
pub mod logger;

pub use config::{Config, GeneralConfig, LoggingConfig, PaperConfig, StrategyConfig};
pub use logger::{init_from_config, init_logger};
