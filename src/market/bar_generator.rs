use crate::data::{Bar, Tick};
use crate::error::ConfigError;
use chrono::{DateTime, DurationRound, Timelike, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, trace};

const MINUTES_PER_DAY: u32 = 24 * 60;
const ONE_MINUTE: Duration = Duration::from_secs(60);

/// Bar generator
///
/// Folds ticks into one-minute bars and one-minute bars into window bars of
/// `window` minutes. Windows are aligned to UTC midnight, so a 5 minute
/// window closes with the bars starting at :04, :09, :14 ...
///
/// Each update returns the window bars it completed, oldest first. This is
/// usually zero or one; a window left open by missing minute bars is closed
/// when the first bar of a later window arrives, which can yield two.
pub struct BarGenerator {
    /// Minutes per window bar
    window: u32,

    /// Minute bar being built from ticks
    bar: Option<Bar>,

    /// Window bar being built from minute bars
    window_bar: Option<Bar>,

    last_tick_time: Option<DateTime<Utc>>,
}

impl BarGenerator {
    /// Create a generator for `window` minute bars. The window must divide a day.
    pub fn new(window: u32) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::ZeroWindow { name: "bar_window" });
        }
        if MINUTES_PER_DAY % window != 0 {
            return Err(ConfigError::UnalignedBarWindow(window));
        }

        Ok(Self {
            window,
            bar: None,
            window_bar: None,
            last_tick_time: None,
        })
    }

    pub fn window_minutes(&self) -> u32 {
        self.window
    }

    /// Feed a tick. Returns the window bars completed by the minute this tick closes.
    pub fn update_tick(&mut self, tick: &Tick) -> Vec<Bar> {
        if tick.price <= Decimal::ZERO {
            trace!("Dropping tick with non-positive price {}", tick.price);
            return Vec::new();
        }

        if let Some(last) = self.last_tick_time {
            if tick.timestamp < last {
                debug!("Dropping stale tick at {} (last {})", tick.timestamp, last);
                return Vec::new();
            }
        }
        self.last_tick_time = Some(tick.timestamp);

        let minute = floor_minute(tick.timestamp);

        if let Some(bar) = self.bar.as_mut() {
            if bar.timestamp == minute {
                bar.high = bar.high.max(tick.price);
                bar.low = bar.low.min(tick.price);
                bar.close = tick.price;
                bar.volume += tick.volume;
                return Vec::new();
            }
        }

        // Tick opened a new minute: close the previous minute bar first
        let finished = match self.bar.take() {
            Some(bar) => self.update_bar(&bar),
            None => Vec::new(),
        };

        self.bar = Some(Bar {
            symbol: tick.symbol.clone(),
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.volume,
            timestamp: minute,
            duration: ONE_MINUTE,
        });

        finished
    }

    /// Feed a completed one-minute bar. Returns the window bars it completes.
    pub fn update_bar(&mut self, bar: &Bar) -> Vec<Bar> {
        let mut finished = Vec::new();
        let start = self.window_start(bar.timestamp);

        // Closing minute never arrived
        if self.window_bar.as_ref().is_some_and(|w| w.timestamp != start) {
            if let Some(open) = self.window_bar.take() {
                debug!("Window bar at {} closed early by bar at {}", open.timestamp, bar.timestamp);
                finished.push(open);
            }
        }

        match self.window_bar.as_mut() {
            Some(window_bar) => {
                window_bar.high = window_bar.high.max(bar.high);
                window_bar.low = window_bar.low.min(bar.low);
                window_bar.close = bar.close;
                window_bar.volume += bar.volume;
            }
            None => {
                self.window_bar = Some(Bar {
                    symbol: bar.symbol.clone(),
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                    timestamp: start,
                    duration: Duration::from_secs(u64::from(self.window) * 60),
                });
            }
        }

        if (last_minute_of_day(bar) + 1) % self.window == 0 {
            if let Some(b) = self.window_bar.take() {
                debug!("Window bar closed at {} | close {}", b.timestamp, b.close);
                finished.push(b);
            }
        }

        finished
    }

    /// Close the minute bar under construction, e.g. when the feed ends
    pub fn flush(&mut self) -> Vec<Bar> {
        match self.bar.take() {
            Some(bar) => self.update_bar(&bar),
            None => Vec::new(),
        }
    }

    fn window_start(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let minute = floor_minute(time);
        let into_window = minute_of_day(minute) % self.window;
        minute - chrono::Duration::minutes(i64::from(into_window))
    }
}

fn floor_minute(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(chrono::Duration::minutes(1)).unwrap_or(time)
}

fn minute_of_day(time: DateTime<Utc>) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Minute-of-day of the last minute a bar covers
fn last_minute_of_day(bar: &Bar) -> u32 {
    if bar.duration <= ONE_MINUTE {
        return minute_of_day(bar.timestamp);
    }
    minute_of_day(bar.end_time() - chrono::Duration::minutes(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(hms: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2024-01-01T{}Z", hms))
            .unwrap()
            .with_timezone(&Utc)
    }

    fn tick(hms: &str, price: Decimal, volume: Decimal) -> Tick {
        Tick {
            symbol: "BTCUSDT".into(),
            price,
            volume,
            timestamp: at(hms),
        }
    }

    fn minute_bar(hms: &str, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar {
            symbol: "BTCUSDT".into(),
            open,
            high,
            low,
            close,
            volume: dec!(1),
            timestamp: at(hms),
            duration: ONE_MINUTE,
        }
    }

    fn single(mut bars: Vec<Bar>) -> Bar {
        assert_eq!(bars.len(), 1, "expected exactly one window bar");
        bars.remove(0)
    }

    #[test]
    fn test_rejects_unaligned_window() {
        assert!(BarGenerator::new(0).is_err());
        assert!(BarGenerator::new(7).is_err());
        assert!(BarGenerator::new(5).is_ok());
        assert!(BarGenerator::new(60).is_ok());
    }

    #[test]
    fn test_minute_bars_merge_into_window() {
        let mut bg = BarGenerator::new(3).unwrap();

        assert!(bg.update_bar(&minute_bar("00:00:00", dec!(10), dec!(12), dec!(9), dec!(11))).is_empty());
        assert!(bg.update_bar(&minute_bar("00:01:00", dec!(11), dec!(15), dec!(10), dec!(14))).is_empty());
        let bar = single(bg.update_bar(&minute_bar("00:02:00", dec!(14), dec!(14), dec!(8), dec!(13))));

        assert_eq!(bar.open, dec!(10));
        assert_eq!(bar.high, dec!(15));
        assert_eq!(bar.low, dec!(8));
        assert_eq!(bar.close, dec!(13));
        assert_eq!(bar.volume, dec!(3));
        assert_eq!(bar.timestamp, at("00:00:00"));
        assert_eq!(bar.duration, Duration::from_secs(180));
    }

    #[test]
    fn test_window_start_is_aligned() {
        let mut bg = BarGenerator::new(5).unwrap();

        // Feed starts mid-window: the first bar is partial but still aligned
        assert!(bg.update_bar(&minute_bar("00:03:00", dec!(1), dec!(1), dec!(1), dec!(1))).is_empty());
        let bar = single(bg.update_bar(&minute_bar("00:04:00", dec!(2), dec!(2), dec!(2), dec!(2))));
        assert_eq!(bar.timestamp, at("00:00:00"));
        assert_eq!(bar.open, dec!(1));
        assert_eq!(bar.close, dec!(2));
    }

    #[test]
    fn test_ticks_build_window_bars() {
        let mut bg = BarGenerator::new(2).unwrap();

        assert!(bg.update_tick(&tick("00:00:05", dec!(100), dec!(1))).is_empty());
        assert!(bg.update_tick(&tick("00:00:30", dec!(103), dec!(2))).is_empty());
        assert!(bg.update_tick(&tick("00:01:10", dec!(99), dec!(1))).is_empty());
        assert!(bg.update_tick(&tick("00:01:50", dec!(101), dec!(1))).is_empty());

        // First tick of minute 2 closes minute 1, which closes the window
        let bar = single(bg.update_tick(&tick("00:02:00", dec!(102), dec!(1))));
        assert_eq!(bar.open, dec!(100));
        assert_eq!(bar.high, dec!(103));
        assert_eq!(bar.low, dec!(99));
        assert_eq!(bar.close, dec!(101));
        assert_eq!(bar.volume, dec!(5));
    }

    #[test]
    fn test_drops_bad_ticks() {
        let mut bg = BarGenerator::new(1).unwrap();

        assert!(bg.update_tick(&tick("00:00:10", dec!(100), dec!(1))).is_empty());
        assert!(bg.update_tick(&tick("00:00:20", dec!(0), dec!(1))).is_empty());
        assert!(bg.update_tick(&tick("00:00:05", dec!(500), dec!(1))).is_empty());

        let bar = single(bg.flush());
        assert_eq!(bar.high, dec!(100));
        assert_eq!(bar.low, dec!(100));
        assert_eq!(bar.volume, dec!(1));
    }

    #[test]
    fn test_flush_without_data() {
        let mut bg = BarGenerator::new(5).unwrap();
        assert!(bg.flush().is_empty());
    }

    #[test]
    fn test_emits_one_bar_per_window() {
        let mut bg = BarGenerator::new(5).unwrap();
        let start = at("00:00:00");
        let mut emitted = Vec::new();

        for i in 0..30 {
            let b = Bar::from_close("BTCUSDT", Decimal::from(i), start + chrono::Duration::minutes(i), ONE_MINUTE);
            emitted.extend(bg.update_bar(&b));
        }

        assert_eq!(emitted.len(), 6);
        for pair in emitted.windows(2) {
            assert_eq!(pair[0].end_time(), pair[1].timestamp);
        }
    }

    #[test]
    fn test_missing_closing_minute_closes_window() {
        let mut bg = BarGenerator::new(5).unwrap();

        for (hms, close) in [("00:00:00", dec!(1)), ("00:01:00", dec!(2)), ("00:02:00", dec!(3)), ("00:03:00", dec!(4))] {
            assert!(bg.update_bar(&minute_bar(hms, close, close, close, close)).is_empty());
        }

        // 00:04 never arrives; the next window's first bar closes the old one
        let early = single(bg.update_bar(&minute_bar("00:05:00", dec!(10), dec!(10), dec!(10), dec!(10))));
        assert_eq!(early.timestamp, at("00:00:00"));
        assert_eq!(early.close, dec!(4));
        assert_eq!(early.volume, dec!(4));

        for hms in ["00:06:00", "00:07:00", "00:08:00"] {
            assert!(bg.update_bar(&minute_bar(hms, dec!(11), dec!(11), dec!(11), dec!(11))).is_empty());
        }
        let next = single(bg.update_bar(&minute_bar("00:09:00", dec!(12), dec!(12), dec!(12), dec!(12))));
        assert_eq!(next.timestamp, at("00:05:00"));
        assert_eq!(next.open, dec!(10));
        assert_eq!(next.close, dec!(12));
    }

    #[test]
    fn test_gap_can_close_two_windows() {
        let mut bg = BarGenerator::new(5).unwrap();
        assert!(bg.update_bar(&minute_bar("00:01:00", dec!(1), dec!(1), dec!(1), dec!(1))).is_empty());

        // Only the last minute of the following window shows up
        let bars = bg.update_bar(&minute_bar("00:09:00", dec!(2), dec!(2), dec!(2), dec!(2)));
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, at("00:00:00"));
        assert_eq!(bars[0].close, dec!(1));
        assert_eq!(bars[1].timestamp, at("00:05:00"));
        assert_eq!(bars[1].close, dec!(2));
        assert_eq!(bars[0].end_time(), bars[1].timestamp);
    }
}
