//! Exchange adapter resolution.
//!
//! Adapters are looked up by name in the controller's integration registry and
//! only produce a [`TradeCall`]; the basket token executes it. The engine treats
//! both steps as black boxes and measures the result through balances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::types::{Address, Amount};

/// Call the basket makes to execute a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCall {
    pub target: Address,
    pub value: Amount,
    pub payload: Vec<u8>,
}

/// Everything an adapter needs to encode one swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub send_asset: Address,
    pub receive_asset: Address,
    pub recipient: Address,
    pub send_quantity: Amount,
    pub min_receive_quantity: Amount,
    pub route: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    #[error("Must be valid adapter: {0}")]
    UnknownAdapter(String),

    #[error("Adapter rejected trade: {0}")]
    InvalidTrade(String),

    #[error("Trade execution failed: {0}")]
    ExecutionFailed(String),
}

pub trait ExchangeAdapter: fmt::Debug + Send + Sync {
    /// Address that pulls the send asset from the basket.
    fn spender(&self) -> Address;

    fn trade_calldata(&self, request: &TradeRequest) -> Result<TradeCall, ExchangeError>;
}

/// Integration registry lookup of exchange adapters for a module.
pub trait ExchangeRegistry {
    fn exchange_adapter(&self, module: Address, name: &str) -> Option<Arc<dyn ExchangeAdapter>>;
}

/// The basket-side invoke of a trade call.
pub trait TradeExecutor {
    fn execute_trade(&mut self, basket: Address, call: &TradeCall) -> Result<(), ExchangeError>;
}

/// A resolved adapter with the name it was registered under.
#[derive(Debug, Clone)]
pub struct ResolvedAdapter {
    pub name: String,
    pub adapter: Arc<dyn ExchangeAdapter>,
}

pub fn resolve_adapter<R: ExchangeRegistry + ?Sized>(
    registry: &R,
    module: Address,
    name: &str,
) -> Result<ResolvedAdapter, ExchangeError> {
    registry
        .exchange_adapter(module, name)
        .map(|adapter| ResolvedAdapter {
            name: name.to_string(),
            adapter,
        })
        .ok_or_else(|| ExchangeError::UnknownAdapter(name.to_string()))
}
