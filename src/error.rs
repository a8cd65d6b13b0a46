use thiserror::Error;

/// Invalid or unreadable strategy configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroWindow { name: &'static str },

    #[error("history capacity {capacity} is smaller than the longest window {window}")]
    CapacityTooSmall { capacity: usize, window: usize },

    #[error("bar window of {0} minutes does not divide a trading day")]
    UnalignedBarWindow(u32),

    #[error("trade money must be positive, got {0}")]
    NonPositiveTradeMoney(rust_decimal::Decimal),

    #[error("{name} must be within [0, 1), got {value}")]
    PercentOutOfRange {
        name: &'static str,
        value: rust_decimal::Decimal,
    },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure reported by the execution collaborator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("gateway disconnected")]
    Disconnected,
}
