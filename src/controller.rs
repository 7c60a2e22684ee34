// 5.0 controller.rs: the protocol controller and the debt-issuance orchestrator, as seen
// from this module. both are external; only their interfaces live here.

use crate::position::LedgerError;
use crate::types::{Address, Bps};

/// Protocol controller: module/basket registry, fees, integrations.
pub trait Controller {
    fn is_module_enabled(&self, module: Address) -> bool;

    /// Whether the basket was created through the controller.
    fn is_basket_enabled(&self, basket: Address) -> bool;

    fn module_fee(&self, module: Address, fee_index: usize) -> Bps;

    fn fee_recipient(&self) -> Address;

    /// Integration registry lookup for non-exchange integrations.
    fn integration(&self, module: Address, name: &str) -> Option<Address>;
}

/// Hook registration on a debt-issuance orchestrator.
pub trait DebtIssuance {
    fn register_hook(
        &mut self,
        orchestrator: Address,
        basket: Address,
        hook: Address,
    ) -> Result<(), LedgerError>;

    fn unregister_hook(
        &mut self,
        orchestrator: Address,
        basket: Address,
        hook: Address,
    ) -> Result<(), LedgerError>;
}
