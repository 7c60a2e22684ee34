//! Fixed-rate swap venue and the adapter that encodes orders for it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::tokens::TokenBook;
use crate::exchange::{ExchangeAdapter, ExchangeError, TradeCall, TradeRequest};
use crate::math::mul_div_down;
use crate::types::{Address, Amount};

/// Order as carried in a [`TradeCall`] payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
    pub send_asset: Address,
    pub receive_asset: Address,
    pub recipient: Address,
    pub send_quantity: Amount,
    pub min_receive_quantity: Amount,
    pub route: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FixedRateAdapter {
    pub router: Address,
}

impl ExchangeAdapter for FixedRateAdapter {
    fn spender(&self) -> Address {
        self.router
    }

    fn trade_calldata(&self, request: &TradeRequest) -> Result<TradeCall, ExchangeError> {
        if request.send_asset == request.receive_asset {
            return Err(ExchangeError::InvalidTrade("send and receive asset match".into()));
        }
        let order = SwapOrder {
            send_asset: request.send_asset,
            receive_asset: request.receive_asset,
            recipient: request.recipient,
            send_quantity: request.send_quantity,
            min_receive_quantity: request.min_receive_quantity,
            route: request.route.clone(),
        };
        let payload =
            serde_json::to_vec(&order).map_err(|e| ExchangeError::InvalidTrade(e.to_string()))?;

        Ok(TradeCall {
            target: self.router,
            value: 0,
            payload,
        })
    }
}

/// Quotes `receive = send * numerator / denominator` per pair. Does not enforce
/// the order's minimum; the caller measures what arrived.
#[derive(Debug, Clone)]
pub struct FixedRateVenue {
    pub router: Address,
    rates: HashMap<(Address, Address), (u128, u128)>,
}

impl FixedRateVenue {
    pub fn new(router: Address) -> Self {
        Self {
            router,
            rates: HashMap::new(),
        }
    }

    pub fn set_rate(&mut self, send: Address, receive: Address, numerator: u128, denominator: u128) {
        self.rates.insert((send, receive), (numerator, denominator));
    }

    pub fn quote(&self, send: Address, receive: Address, quantity: Amount) -> Result<Amount, ExchangeError> {
        let (numerator, denominator) = self
            .rates
            .get(&(send, receive))
            .copied()
            .ok_or_else(|| ExchangeError::ExecutionFailed(format!("no rate for {send} -> {receive}")))?;
        mul_div_down(quantity, numerator, denominator)
            .map_err(|e| ExchangeError::ExecutionFailed(e.to_string()))
    }

    /// Pulls the send asset from `caller` against the router's allowance and pays
    /// the recipient from the venue's unlimited inventory.
    pub fn swap(&self, tokens: &mut TokenBook, caller: Address, call: &TradeCall) -> Result<Amount, ExchangeError> {
        if call.target != self.router {
            return Err(ExchangeError::ExecutionFailed(format!(
                "unknown call target {}",
                call.target
            )));
        }
        let order: SwapOrder = serde_json::from_slice(&call.payload)
            .map_err(|e| ExchangeError::ExecutionFailed(e.to_string()))?;

        let out = self.quote(order.send_asset, order.receive_asset, order.send_quantity)?;
        tokens
            .transfer_from(order.send_asset, self.router, caller, self.router, order.send_quantity)
            .map_err(|e| ExchangeError::ExecutionFailed(e.to_string()))?;
        tokens.mint(order.receive_asset, order.recipient, out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_payload_reaches_venue() {
        let (usdc, weth, basket, router) = (Address(1), Address(2), Address(10), Address(99));
        let mut tokens = TokenBook::new();
        tokens.mint(usdc, basket, 3_000_000_000);

        let mut venue = FixedRateVenue::new(router);
        venue.set_rate(usdc, weth, 1_000_000_000_000, 3000);

        let adapter = FixedRateAdapter { router };
        let call = adapter
            .trade_calldata(&TradeRequest {
                send_asset: usdc,
                receive_asset: weth,
                recipient: basket,
                send_quantity: 3_000_000_000,
                min_receive_quantity: 0,
                route: Vec::new(),
            })
            .unwrap();

        let err = venue.swap(&mut tokens, basket, &call).unwrap_err();
        assert!(matches!(err, ExchangeError::ExecutionFailed(_)));

        tokens.approve(usdc, basket, adapter.spender(), 3_000_000_000);
        let out = venue.swap(&mut tokens, basket, &call).unwrap();
        assert_eq!(out, 1_000_000_000_000_000_000);
        assert_eq!(tokens.allowance(usdc, basket, router), 0);
        assert_eq!(tokens.balance_of(weth, basket), out);
        assert_eq!(tokens.balance_of(usdc, basket), 0);
    }

    #[test]
    fn missing_pair_fails() {
        let venue = FixedRateVenue::new(Address(99));
        assert!(venue.quote(Address(1), Address(2), 10).is_err());
    }
}
