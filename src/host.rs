//! The collaborator bundle every engine operation runs against.

use crate::controller::{Controller, DebtIssuance};
use crate::exchange::{ExchangeRegistry, TradeExecutor};
use crate::lending::LendingMarket;
use crate::position::PositionLedger;

/// All external collaborators of the engine.
///
/// `Clone` is what makes an operation atomic: the engine stages its calls on a
/// copy and only swaps it in once the whole operation has succeeded.
pub trait Host:
    PositionLedger + LendingMarket + ExchangeRegistry + TradeExecutor + Controller + DebtIssuance + Clone
{
}

impl<T> Host for T where
    T: PositionLedger
        + LendingMarket
        + ExchangeRegistry
        + TradeExecutor
        + Controller
        + DebtIssuance
        + Clone
{
}
