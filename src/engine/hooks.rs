// 8.7 engine/hooks.rs: callbacks from the debt-issuance orchestrator. on issue the
// basket borrows the debt a new token carries, on redeem it repays it. the module
// hooks resync positions around the whole issuance.

use tracing::debug;

use super::core::LeverageModule;
use super::results::{LeverageError, SyncResult};
use crate::events::{EventPayload, HookEvent};
use crate::host::Host;
use crate::math::{checked_add, checked_sub};
use crate::position::{notional_magnitude, notional_magnitude_ceil};
use crate::types::{Address, Amount};

impl LeverageModule {
    /// Runs before issuance or redemption amounts are computed.
    pub fn module_issue_hook<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
    ) -> Result<Option<SyncResult>, LeverageError> {
        self.transact(env, basket, "module_issue_hook", |module, env| {
            module.only_module(env, caller, basket)?;
            let record = module.initialized_record(env, basket)?;
            module.sync_positions(env, basket, &record)
        })
    }

    pub fn module_redeem_hook<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
    ) -> Result<Option<SyncResult>, LeverageError> {
        self.transact(env, basket, "module_redeem_hook", |module, env| {
            module.only_module(env, caller, basket)?;
            let record = module.initialized_record(env, basket)?;
            module.sync_positions(env, basket, &record)
        })
    }

    /// Borrows the loan asset owed by `basket_quantity` new tokens into the basket.
    /// Equity components need nothing from this module. Returns the amount borrowed.
    pub fn component_issue_hook<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
        basket_quantity: Amount,
        component: Address,
        is_equity: bool,
    ) -> Result<Amount, LeverageError> {
        self.transact(env, basket, "component_issue_hook", |module, env| {
            module.only_module(env, caller, basket)?;
            let record = module.initialized_record(env, basket)?;
            if is_equity {
                return Ok(0);
            }

            let loan = record.params.loan_asset;
            if component != loan {
                return Err(LeverageError::DebtComponentMismatch {
                    component,
                    expected: loan,
                });
            }

            let unit = env.external_position_unit(basket, component, module.address)?;
            if !unit.is_negative() {
                return Err(LeverageError::DebtUnitNotNegative(unit));
            }

            let notional = notional_magnitude(unit, basket_quantity)?;
            if notional > 0 {
                env.borrow(&record.params, basket, notional, basket)?;
            }
            if module.config.sync_on_component_hook {
                let minted = checked_add(env.total_supply(basket)?, basket_quantity)?;
                module.sync_debt_for_supply(env, basket, &record, minted)?;
            }

            debug!(%basket, basket_quantity, borrowed = notional, "issue hook");
            module.emit_event(EventPayload::IssueHookBorrowed(HookEvent {
                basket,
                component,
                basket_quantity,
                notional,
            }));
            Ok(notional)
        })
    }

    /// Repays the debt carried by `basket_quantity` redeemed tokens, rounded up and
    /// capped at what is owed. The loan asset must already sit on the basket.
    /// Returns the amount repaid.
    pub fn component_redeem_hook<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
        basket_quantity: Amount,
        component: Address,
        is_equity: bool,
    ) -> Result<Amount, LeverageError> {
        self.transact(env, basket, "component_redeem_hook", |module, env| {
            module.only_module(env, caller, basket)?;
            let record = module.initialized_record(env, basket)?;
            if is_equity {
                return Ok(0);
            }

            let loan = record.params.loan_asset;
            if component != loan {
                return Err(LeverageError::DebtComponentMismatch {
                    component,
                    expected: loan,
                });
            }

            let unit = env.external_position_unit(basket, component, module.address)?;
            if !unit.is_negative() {
                return Err(LeverageError::DebtUnitNotNegative(unit));
            }

            let owed = notional_magnitude_ceil(unit, basket_quantity)?;
            let repaid = module.repay_capped(env, basket, &record, owed)?;
            if module.config.sync_on_component_hook {
                let burned = checked_sub(env.total_supply(basket)?, basket_quantity)?;
                module.sync_debt_for_supply(env, basket, &record, burned)?;
            }

            debug!(%basket, basket_quantity, repaid, "redeem hook");
            module.emit_event(EventPayload::RedeemHookRepaid(HookEvent {
                basket,
                component,
                basket_quantity,
                notional: repaid,
            }));
            Ok(repaid)
        })
    }
}
