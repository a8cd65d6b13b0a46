use crate::data::{Bar, OrderId, OrderKind, OrderRequest, Side, Tick, TradeFill};
use crate::error::ConfigError;
use crate::execution::OrderGateway;
use crate::indicators::{ArrayManager, MaPair};
use crate::market::BarGenerator;
use crate::position::{EntryPrices, PositionState, PositionTracker};
use crate::strategy::signals::{SignalDetector, SignalState, Signals};
use crate::strategy::template::{HistoryProvider, Strategy};
use crate::utils::config::StrategyConfig;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Triple moving-average strategy
///
/// Trades fast/slow crossovers in the direction of the regime given by the
/// filter average:
/// - close above filter: fast crossing above slow opens long, crossing below closes it
/// - close below filter: fast crossing below slow opens short, crossing above closes it
///
/// While a position is held and the regime still agrees with it, each bar
/// re-issues a stop-loss and a take-profit around the recorded entry price.
/// Every closed bar starts by cancelling all working orders, so at most one
/// bracket is live at a time.
pub struct TripleMaStrategy<G: OrderGateway> {
    symbol: String,
    params: StrategyConfig,
    gateway: G,

    bg: BarGenerator,
    am: ArrayManager,
    detector: SignalDetector,
    position: PositionTracker,

    /// Averages as of the last evaluated bar
    signal_state: Option<SignalState>,
    last_signals: Option<Signals>,

    inited: bool,
    trading: bool,
}

/// Telemetry published after every bar and fill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySnapshot {
    pub symbol: String,
    pub fast: Option<MaPair>,
    pub slow: Option<MaPair>,
    pub filter: Option<MaPair>,
    pub position: Decimal,
    pub entry: EntryPrices,
    pub fills: usize,
    pub bars_seen: usize,
    pub inited: bool,
    pub trading: bool,
}

impl<G: OrderGateway> TripleMaStrategy<G> {
    pub fn new(symbol: impl Into<String>, params: StrategyConfig, gateway: G) -> Result<Self, ConfigError> {
        params.validate()?;

        let symbol = symbol.into();
        let bg = BarGenerator::new(params.bar_window)?;
        let mut am = ArrayManager::new(params.history_capacity, params.longest_window())?;
        am.track(params.fast_window)?;
        am.track(params.slow_window)?;
        am.track(params.filter_window)?;

        Ok(Self {
            position: PositionTracker::new(symbol.clone()),
            symbol,
            detector: SignalDetector::new(params.trend_slope_filter),
            params,
            gateway,
            bg,
            am,
            signal_state: None,
            last_signals: None,
            inited: false,
            trading: false,
        })
    }

    /// Process a closed window bar: cancel, update, evaluate, submit.
    pub fn on_window_bar(&mut self, bar: &Bar) {
        self.cancel_all();

        self.am.update_bar(bar);
        if !self.am.is_warmed_up() {
            debug!("Warming up: {}/{} bars", self.am.count(), self.am.warmup());
            return;
        }

        let Some(state) = SignalState::from_buffer(
            &self.am,
            self.params.fast_window,
            self.params.slow_window,
            self.params.filter_window,
        ) else {
            return;
        };

        let signals = self.detector.detect(&state, bar.close);
        self.signal_state = Some(state);
        self.last_signals = Some(signals);

        for request in self.decide(&signals, bar.close) {
            self.submit(&request);
        }

        self.put_event();
    }

    /// Orders for the current position given this bar's signals.
    ///
    /// Pure with respect to strategy state: the same signals, close, position
    /// and entry prices always yield the same requests.
    pub fn decide(&self, signals: &Signals, close: Decimal) -> Vec<OrderRequest> {
        let mut orders = Vec::new();
        let volume = self.position.volume();

        match self.position.state() {
            PositionState::Flat => {
                if close <= Decimal::ZERO {
                    return orders;
                }
                let entry_volume = self.params.trade_money / close;

                if self.detector.long_entry(signals) {
                    orders.push(self.buy(close, entry_volume, false).at_market());
                }
                if self.detector.short_entry(signals) {
                    orders.push(self.short(close, entry_volume, false).at_market());
                }
            }

            PositionState::Long => {
                if !signals.filter_up {
                    warn!(
                        "Regime turned bearish while long {} @ {}: position left without protective orders",
                        volume, close
                    );
                } else if signals.cross_below {
                    orders.push(self.sell(close, volume, false).at_market());
                } else if let Some(entry) = self.position.long_entry_price() {
                    let stop = entry * (Decimal::ONE - self.params.per_lose);
                    let target = entry * (Decimal::ONE + self.params.per_win);
                    orders.push(self.sell(stop, volume, true));
                    orders.push(self.sell(target, volume, false));
                } else {
                    warn!("Long {} without a recorded entry price, skipping bracket", volume);
                }
            }

            PositionState::Short => {
                if !signals.filter_down {
                    warn!(
                        "Regime turned bullish while short {} @ {}: position left without protective orders",
                        volume, close
                    );
                } else if signals.cross_over {
                    orders.push(self.cover(close, volume, false).at_market());
                } else if let Some(entry) = self.position.short_entry_price() {
                    let target = entry * (Decimal::ONE - self.params.per_win);
                    let stop = entry * (Decimal::ONE + self.params.per_lose);
                    orders.push(self.cover(target, volume, false));
                    orders.push(self.cover(stop, volume, true));
                } else {
                    warn!("Short {} without a recorded entry price, skipping bracket", volume);
                }
            }
        }

        orders
    }

    /// Close the partially built bar, e.g. when the feed ends
    pub fn flush(&mut self) {
        for bar in self.bg.flush() {
            self.on_window_bar(&bar);
        }
    }

    pub fn snapshot(&self) -> StrategySnapshot {
        StrategySnapshot {
            symbol: self.symbol.clone(),
            fast: self.signal_state.map(|s| s.fast),
            slow: self.signal_state.map(|s| s.slow),
            filter: self.signal_state.map(|s| s.filter),
            position: self.position.pos(),
            entry: self.position.entry_prices(),
            fills: self.position.fill_count(),
            bars_seen: self.am.count(),
            inited: self.inited,
            trading: self.trading,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn params(&self) -> &StrategyConfig {
        &self.params
    }

    pub fn position(&self) -> &PositionTracker {
        &self.position
    }

    pub fn signal_state(&self) -> Option<&SignalState> {
        self.signal_state.as_ref()
    }

    pub fn last_signals(&self) -> Option<&Signals> {
        self.last_signals.as_ref()
    }

    pub fn array_manager(&self) -> &ArrayManager {
        &self.am
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn is_trading(&self) -> bool {
        self.trading
    }

    /// Open long. `stop` selects a stop order, otherwise a limit at `price`.
    pub fn buy(&self, price: Decimal, volume: Decimal, stop: bool) -> OrderRequest {
        self.order(Side::Buy, price, volume, stop)
    }

    /// Close long
    pub fn sell(&self, price: Decimal, volume: Decimal, stop: bool) -> OrderRequest {
        self.order(Side::Sell, price, volume, stop)
    }

    /// Open short
    pub fn short(&self, price: Decimal, volume: Decimal, stop: bool) -> OrderRequest {
        self.order(Side::Short, price, volume, stop)
    }

    /// Close short
    pub fn cover(&self, price: Decimal, volume: Decimal, stop: bool) -> OrderRequest {
        self.order(Side::Cover, price, volume, stop)
    }

    fn order(&self, side: Side, price: Decimal, volume: Decimal, stop: bool) -> OrderRequest {
        let kind = if stop { OrderKind::Stop } else { OrderKind::Limit };
        OrderRequest::new(self.symbol.clone(), side, kind, price, volume)
    }

    fn cancel_all(&mut self) {
        if !self.trading {
            return;
        }
        if let Err(e) = self.gateway.cancel_all(&self.symbol) {
            warn!("Cancel all failed for {}: {}", self.symbol, e);
        }
    }

    fn submit(&mut self, request: &OrderRequest) -> Option<OrderId> {
        if !self.trading {
            return None;
        }

        match self.gateway.send_order(request) {
            Ok(id) => {
                info!(
                    "Order sent | {:?} {:?} {} @ {} | id {}",
                    request.side, request.kind, request.volume, request.price, id
                );
                Some(id)
            }
            Err(e) => {
                warn!("Order {:?} {:?} not accepted: {}", request.side, request.kind, e);
                None
            }
        }
    }

    fn put_event(&self) {
        match serde_json::to_string(&self.snapshot()) {
            Ok(json) => debug!("Strategy state: {}", json),
            Err(e) => warn!("Failed to serialize strategy state: {}", e),
        }
    }
}

impl<G: OrderGateway> Strategy for TripleMaStrategy<G> {
    fn on_init(&mut self, history: &mut dyn HistoryProvider) -> Result<()> {
        info!("Strategy init: loading {} days of history for {}", self.params.load_days, self.symbol);

        let bars = history.load_bars(&self.symbol, self.params.load_days)?;
        let loaded = bars.len();
        for bar in &bars {
            self.on_bar(bar);
        }

        self.inited = true;
        info!(
            "Strategy inited: {} minute bars replayed, {} decision bars, warmed up: {}",
            loaded,
            self.am.count(),
            self.am.is_warmed_up()
        );
        self.put_event();
        Ok(())
    }

    fn on_start(&mut self) {
        self.trading = true;
        info!("Strategy started for {}", self.symbol);
        self.put_event();
    }

    fn on_stop(&mut self) {
        self.trading = false;
        info!("Strategy stopped for {}", self.symbol);
        self.put_event();
    }

    fn on_tick(&mut self, tick: &Tick) {
        for bar in self.bg.update_tick(tick) {
            self.on_window_bar(&bar);
        }
    }

    fn on_bar(&mut self, bar: &Bar) {
        for window_bar in self.bg.update_bar(bar) {
            self.on_window_bar(&window_bar);
        }
    }

    fn on_trade(&mut self, fill: &TradeFill) {
        if fill.symbol != self.symbol {
            debug!("Ignoring fill for {}", fill.symbol);
            return;
        }
        self.position.apply_fill(fill);
        self.put_event();
    }
}
