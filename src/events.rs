// 11.0: every state change produces an event. used for audit trails and for
// notifying external systems. the EventPayload enum lists all event types.

use serde::{Deserialize, Serialize};

use crate::lending::{MarketId, MarketParams};
use crate::types::{Address, Amount, Timestamp, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Governance events
    ModuleInitialized(ModuleInitializedEvent),
    AllowListUpdated(AllowListUpdatedEvent),
    AnyBasketAllowedUpdated(AnyBasketAllowedUpdatedEvent),
    IssuanceModuleRegistered(IssuanceModuleRegisteredEvent),
    ModuleRemoved(ModuleRemovedEvent),

    // Leverage events
    CollateralEntered(CollateralEnteredEvent),
    LeverageIncreased(LeverageChangedEvent),
    LeverageDecreased(LeverageChangedEvent),
    FullyDelevered(FullyDeleveredEvent),

    // Reconciliation events
    PositionsSynced(PositionsSyncedEvent),

    // Issuance events
    IssueHookBorrowed(HookEvent),
    RedeemHookRepaid(HookEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInitializedEvent {
    pub basket: Address,
    pub market_id: MarketId,
    pub params: MarketParams,
    pub issuance_module: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowListUpdatedEvent {
    pub basket: Address,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnyBasketAllowedUpdatedEvent {
    pub any_basket_allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceModuleRegisteredEvent {
    pub basket: Address,
    pub issuance_module: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRemovedEvent {
    pub basket: Address,
    pub collateral_withdrawn: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralEnteredEvent {
    pub basket: Address,
    pub collateral_asset: Address,
    pub supplied: Amount,
    pub unit: Unit,
}

/// Lever: send = borrowed loan asset, receive = collateral.
/// Delever: send = withdrawn collateral, receive = loan asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageChangedEvent {
    pub basket: Address,
    pub send_asset: Address,
    pub receive_asset: Address,
    pub adapter: String,
    pub total_send: Amount,
    pub total_receive: Amount,
    pub protocol_fee: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullyDeleveredEvent {
    pub basket: Address,
    pub loan_asset: Address,
    pub residual_loan_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsSyncedEvent {
    pub basket: Address,
    pub collateral_unit: Unit,
    pub borrow_unit: Unit,
    pub total_supply: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookEvent {
    pub basket: Address,
    pub component: Address,
    pub basket_quantity: Amount,
    pub notional: Amount,
}
