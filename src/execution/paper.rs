use crate::data::{OrderId, OrderKind, OrderRequest, Side, Tick, TradeFill};
use crate::error::GatewayError;
use crate::execution::gateway::OrderGateway;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// In-process paper venue.
///
/// Market orders fill immediately at the reference price adjusted for
/// slippage. Limit and stop orders rest until a tick touches them or they are
/// cancelled. Fills go out on a dedicated channel; the owner applies them to
/// the strategy before handing it the next market event.
pub struct PaperGateway {
    fill_tx: mpsc::UnboundedSender<TradeFill>,
    slippage_bps: Decimal,
    resting: Vec<(OrderId, OrderRequest)>,
    next_id: u64,
    clock: Option<DateTime<Utc>>,
}

impl PaperGateway {
    pub fn new(fill_tx: mpsc::UnboundedSender<TradeFill>, slippage_bps: Decimal) -> Self {
        Self {
            fill_tx,
            slippage_bps,
            resting: Vec::new(),
            next_id: 0,
            clock: None,
        }
    }

    pub fn resting_orders(&self) -> &[(OrderId, OrderRequest)] {
        &self.resting
    }

    /// Match resting orders against a new tick. Call before the strategy sees the tick.
    pub fn on_tick(&mut self, tick: &Tick) -> Result<(), GatewayError> {
        self.clock = Some(tick.timestamp);

        let triggered = self
            .resting
            .iter()
            .position(|(_, req)| req.symbol == tick.symbol && Self::is_triggered(req, tick.price));

        let Some(idx) = triggered else {
            return Ok(());
        };

        let (id, req) = self.resting.remove(idx);
        let price = match req.kind {
            OrderKind::Limit => req.price,
            OrderKind::Stop | OrderKind::Market => self.slipped(req.side, tick.price),
        };

        // Both legs of a bracket close the same exposure; once one fills the other is void
        self.resting.retain(|(_, other)| !(other.symbol == req.symbol && other.side == req.side));

        info!("Paper {:?} {:?} triggered at {} (order {})", req.kind, req.side, tick.price, id);
        self.publish_fill(id, &req, price)
    }

    fn is_triggered(req: &OrderRequest, price: Decimal) -> bool {
        let buying = matches!(req.side, Side::Buy | Side::Cover);
        match (req.kind, buying) {
            (OrderKind::Market, _) => true,
            (OrderKind::Limit, true) => price <= req.price,
            (OrderKind::Limit, false) => price >= req.price,
            (OrderKind::Stop, true) => price >= req.price,
            (OrderKind::Stop, false) => price <= req.price,
        }
    }

    /// Adverse slippage: buyers pay more, sellers receive less
    fn slipped(&self, side: Side, price: Decimal) -> Decimal {
        let slippage = price * self.slippage_bps / Decimal::from(10_000);
        match side {
            Side::Buy | Side::Cover => price + slippage,
            Side::Sell | Side::Short => price - slippage,
        }
    }

    fn publish_fill(&self, order_id: OrderId, req: &OrderRequest, price: Decimal) -> Result<(), GatewayError> {
        let fill = TradeFill {
            order_id,
            symbol: req.symbol.clone(),
            direction: req.side.direction(),
            offset: req.side.offset(),
            price,
            volume: req.volume,
            timestamp: self.clock.unwrap_or_else(Utc::now),
        };
        self.fill_tx
            .send(fill)
            .map_err(|_| GatewayError::Disconnected)
    }
}

impl OrderGateway for PaperGateway {
    fn send_order(&mut self, request: &OrderRequest) -> Result<OrderId, GatewayError> {
        if request.volume <= Decimal::ZERO {
            return Err(GatewayError::Rejected(format!("invalid volume {}", request.volume)));
        }

        self.next_id += 1;
        let id = OrderId(format!("paper-{}", self.next_id));

        match request.kind {
            OrderKind::Market => {
                let price = self.slipped(request.side, request.price);
                self.publish_fill(id.clone(), request, price)?;
            }
            OrderKind::Limit | OrderKind::Stop => {
                debug!("Resting {:?} {:?} {} @ {}", request.kind, request.side, request.volume, request.price);
                self.resting.push((id.clone(), request.clone()));
            }
        }

        Ok(id)
    }

    fn cancel_all(&mut self, symbol: &str) -> Result<(), GatewayError> {
        let before = self.resting.len();
        self.resting.retain(|(_, req)| req.symbol != symbol);
        if before != self.resting.len() {
            debug!("Cancelled {} resting orders for {}", before - self.resting.len(), symbol);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Direction, Offset};
    use rust_decimal_macros::dec;

    fn tick(price: Decimal) -> Tick {
        Tick {
            symbol: "BTCUSDT".into(),
            price,
            volume: dec!(1),
            timestamp: Utc::now(),
        }
    }

    fn next_fill(rx: &mut mpsc::UnboundedReceiver<TradeFill>) -> Option<TradeFill> {
        rx.try_recv().ok()
    }

    #[test]
    fn test_market_order_fills_with_slippage() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gw = PaperGateway::new(tx, dec!(10));

        let req = OrderRequest::new("BTCUSDT", Side::Buy, OrderKind::Market, dec!(100), dec!(0.1));
        gw.send_order(&req).unwrap();

        let fill = next_fill(&mut rx).unwrap();
        assert_eq!(fill.direction, Direction::Long);
        assert_eq!(fill.offset, Offset::Open);
        assert_eq!(fill.price, dec!(100.1));
        assert_eq!(fill.volume, dec!(0.1));
    }

    #[test]
    fn test_bracket_one_leg_cancels_other() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gw = PaperGateway::new(tx, Decimal::ZERO);

        gw.send_order(&OrderRequest::new("BTCUSDT", Side::Sell, OrderKind::Stop, dec!(99), dec!(1))).unwrap();
        gw.send_order(&OrderRequest::new("BTCUSDT", Side::Sell, OrderKind::Limit, dec!(107), dec!(1))).unwrap();
        assert_eq!(gw.resting_orders().len(), 2);

        gw.on_tick(&tick(dec!(100))).unwrap();
        assert!(next_fill(&mut rx).is_none());

        gw.on_tick(&tick(dec!(107.5))).unwrap();
        let fill = next_fill(&mut rx).unwrap();
        assert_eq!(fill.price, dec!(107));
        assert_eq!(fill.offset, Offset::Close);
        assert!(gw.resting_orders().is_empty());
    }

    #[test]
    fn test_cancel_all_clears_resting() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut gw = PaperGateway::new(tx, Decimal::ZERO);

        gw.send_order(&OrderRequest::new("BTCUSDT", Side::Cover, OrderKind::Stop, dec!(101), dec!(1))).unwrap();
        gw.cancel_all("BTCUSDT").unwrap();
        assert!(gw.resting_orders().is_empty());
    }

    #[test]
    fn test_short_stop_triggers_on_rise() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut gw = PaperGateway::new(tx, Decimal::ZERO);

        gw.send_order(&OrderRequest::new("BTCUSDT", Side::Cover, OrderKind::Stop, dec!(101), dec!(2))).unwrap();
        gw.on_tick(&tick(dec!(101.2))).unwrap();

        let fill = next_fill(&mut rx).unwrap();
        assert_eq!(fill.direction, Direction::Long);
        assert_eq!(fill.price, dec!(101.2));
    }

    #[test]
    fn test_rejects_zero_volume() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut gw = PaperGateway::new(tx, Decimal::ZERO);
        let req = OrderRequest::new("BTCUSDT", Side::Buy, OrderKind::Market, dec!(100), Decimal::ZERO);
        assert!(matches!(gw.send_order(&req), Err(GatewayError::Rejected(_))));
    }
}
