use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub strategy: StrategyConfig,
    pub paper: PaperConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub symbol: String,
    pub environment: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            environment: "paper".to_string(),
        }
    }
}

/// Strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minutes per decision bar
    pub bar_window: u32,
    pub fast_window: usize,
    pub slow_window: usize,
    /// Regime filter window, normally the longest
    pub filter_window: usize,
    /// Capital per entry; entry volume = trade_money / close
    pub trade_money: Decimal,
    /// Take-profit distance as a fraction of the entry price
    pub per_win: Decimal,
    /// Stop-loss distance as a fraction of the entry price
    pub per_lose: Decimal,
    /// Closed bars retained for indicator computation
    pub history_capacity: usize,
    /// Days of history requested for warm-up
    pub load_days: u32,
    /// Require the filter average to slope with the trade before entering
    pub trend_slope_filter: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            bar_window: 60,
            fast_window: 7,
            slow_window: 30,
            filter_window: 120,
            trade_money: dec!(10),
            per_win: dec!(0.07),
            per_lose: dec!(0.01),
            history_capacity: 200,
            load_days: 3,
            trend_slope_filter: false,
        }
    }
}

impl StrategyConfig {
    /// Bars needed before signals are evaluated
    pub fn longest_window(&self) -> usize {
        self.fast_window.max(self.slow_window).max(self.filter_window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, window) in [
            ("fast_window", self.fast_window),
            ("slow_window", self.slow_window),
            ("filter_window", self.filter_window),
        ] {
            if window == 0 {
                return Err(ConfigError::ZeroWindow { name });
            }
        }

        if self.bar_window == 0 {
            return Err(ConfigError::ZeroWindow { name: "bar_window" });
        }
        if (24 * 60) % self.bar_window != 0 {
            return Err(ConfigError::UnalignedBarWindow(self.bar_window));
        }

        if self.history_capacity < self.longest_window() {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.history_capacity,
                window: self.longest_window(),
            });
        }

        if self.trade_money <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveTradeMoney(self.trade_money));
        }

        for (name, value) in [("per_win", self.per_win), ("per_lose", self.per_lose)] {
            if value < Decimal::ZERO || value >= Decimal::ONE {
                return Err(ConfigError::PercentOutOfRange { name, value });
            }
        }

        Ok(())
    }
}

/// Paper trading driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub start_price: Decimal,
    pub slippage_bps: Decimal,
    pub tick_interval_ms: u64,
    pub ticks: usize,
    pub seed: u64,
    pub volatility: f64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            start_price: dec!(30000),
            slippage_bps: dec!(2),
            tick_interval_ms: 5_000,
            ticks: 200_000,
            seed: 42,
            volatility: 0.0015,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub output: String,
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "pretty".to_string(),
            file_path: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.strategy.validate()?;
        Ok(config)
    }

    /// Load from environment variable or default path
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_FILE")
            .unwrap_or_else(|_| "config/default.toml".to_string());
        Self::from_file(path)
    }
}
