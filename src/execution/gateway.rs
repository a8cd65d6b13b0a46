use crate::data::{OrderId, OrderRequest};
use crate::error::GatewayError;

/// Order routing seam between the strategy and the execution venue.
///
/// Requests are fire-and-forget: a successful return only means the venue
/// accepted the request. Fills come back later as `TradeFill` notifications.
pub trait OrderGateway {
    fn send_order(&mut self, request: &OrderRequest) -> Result<OrderId, GatewayError>;

    /// Cancel every working order for `symbol`, conditional orders included
    fn cancel_all(&mut self, symbol: &str) -> Result<(), GatewayError>;
}

/// A single interaction with a gateway, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    CancelAll(String),
    Send(OrderRequest),
}

/// Gateway that accepts and records every call without routing it anywhere.
/// Useful for dry runs and for asserting on the strategy's output.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Vec<GatewayCall>,
    next_id: u64,
    /// When set, every `send_order` fails with this error
    reject_with: Option<GatewayError>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that refuses every order, e.g. to model insufficient funds
    pub fn rejecting(error: GatewayError) -> Self {
        Self {
            reject_with: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[GatewayCall] {
        &self.calls
    }

    /// Order requests only, in submission order
    pub fn orders(&self) -> Vec<&OrderRequest> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                GatewayCall::Send(req) => Some(req),
                GatewayCall::CancelAll(_) => None,
            })
            .collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GatewayCall::CancelAll(_)))
            .count()
    }

    /// Drain recorded calls
    pub fn take_calls(&mut self) -> Vec<GatewayCall> {
        std::mem::take(&mut self.calls)
    }
}

impl OrderGateway for RecordingGateway {
    fn send_order(&mut self, request: &OrderRequest) -> Result<OrderId, GatewayError> {
        self.calls.push(GatewayCall::Send(request.clone()));
        if let Some(err) = &self.reject_with {
            return Err(err.clone());
        }
        self.next_id += 1;
        Ok(OrderId(format!("rec-{}", self.next_id)))
    }

    fn cancel_all(&mut self, symbol: &str) -> Result<(), GatewayError> {
        self.calls.push(GatewayCall::CancelAll(symbol.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OrderKind, Side};
    use rust_decimal_macros::dec;

    #[test]
    fn test_records_in_order() {
        let mut gw = RecordingGateway::new();
        let req = OrderRequest::new("BTCUSDT", Side::Buy, OrderKind::Market, dec!(100), dec!(0.1));

        gw.cancel_all("BTCUSDT").unwrap();
        let id = gw.send_order(&req).unwrap();

        assert_eq!(id, OrderId("rec-1".into()));
        assert_eq!(
            gw.calls(),
            &[GatewayCall::CancelAll("BTCUSDT".into()), GatewayCall::Send(req.clone())]
        );
        assert_eq!(gw.orders(), vec![&req]);
        assert_eq!(gw.cancel_count(), 1);
    }

    #[test]
    fn test_rejecting_gateway_still_records() {
        let mut gw = RecordingGateway::rejecting(GatewayError::Rejected("insufficient funds".into()));
        let req = OrderRequest::new("BTCUSDT", Side::Short, OrderKind::Market, dec!(100), dec!(0.1));

        assert!(gw.send_order(&req).is_err());
        assert_eq!(gw.orders().len(), 1);
        assert_eq!(gw.take_calls().len(), 1);
        assert!(gw.calls().is_empty());
    }
}
