//! Initialization, allow-list administration, hook registration and module removal.

use tracing::{info, warn};

use super::core::{BasketRecord, LeverageModule};
use super::results::LeverageError;
use crate::controller::Controller;
use crate::events::{
    AllowListUpdatedEvent, AnyBasketAllowedUpdatedEvent, EventPayload, IssuanceModuleRegisteredEvent,
    ModuleInitializedEvent, ModuleRemovedEvent,
};
use crate::host::Host;
use crate::lending::MarketParams;
use crate::position::{unit_from_notional, write_position, ModuleStatus, PositionKind};
use crate::types::{Address, Amount, Unit};

impl LeverageModule {
    /// Binds `basket` to the lending market described by `params`.
    ///
    /// Checks run in a fixed order: manager and controller, pending status, allow
    /// list, market params, issuance orchestrator, market existence.
    pub fn initialize<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
        params: MarketParams,
    ) -> Result<(), LeverageError> {
        self.transact(env, basket, "initialize", |module, env| {
            module.only_manager(env, caller, basket)?;

            if env.module_status(basket, module.address) != ModuleStatus::Pending {
                return Err(LeverageError::NotPendingInitialization(basket));
            }
            if module.baskets.contains_key(&basket) {
                return Err(LeverageError::AlreadyInitialized(basket));
            }
            if !module.allow_list.permits(basket) {
                return Err(LeverageError::BasketNotAllowed(basket));
            }
            if params.collateral_asset == params.loan_asset {
                return Err(LeverageError::InvalidMarketParams(params.loan_asset));
            }

            let name = module.config.issuance_module_name.clone();
            let orchestrator = env
                .integration(module.address, &name)
                .ok_or(LeverageError::InvalidIssuanceModule(name))?;
            if env.module_status(basket, orchestrator) != ModuleStatus::Initialized {
                return Err(LeverageError::IssuanceNotInitialized(orchestrator));
            }

            let market_id = params.id();
            env.market_state(market_id)?;

            env.initialize_module(basket, module.address)?;
            env.register_hook(orchestrator, basket, module.address)?;

            module.baskets.insert(
                basket,
                BasketRecord {
                    params,
                    market_id,
                    collateral_entered: false,
                    issuance_modules: vec![orchestrator],
                },
            );

            info!(%basket, %market_id, "leverage module initialized");
            module.emit_event(EventPayload::ModuleInitialized(ModuleInitializedEvent {
                basket,
                market_id,
                params,
                issuance_module: orchestrator,
            }));
            Ok(())
        })
    }

    /// Owner-only. A basket can only be listed or delisted if the controller knows
    /// it or it is already on the list.
    pub fn update_allowed_basket<C: Controller>(
        &mut self,
        controller: &C,
        caller: Address,
        basket: Address,
        status: bool,
    ) -> Result<(), LeverageError> {
        if caller != self.owner {
            return Err(LeverageError::NotOwner(caller));
        }
        if !controller.is_basket_enabled(basket) && !self.allow_list.is_listed(basket) {
            return Err(LeverageError::InvalidBasket(basket));
        }

        self.allow_list.set_allowed(basket, status);
        self.emit_event(EventPayload::AllowListUpdated(AllowListUpdatedEvent {
            basket,
            allowed: status,
        }));
        self.flush_events();
        Ok(())
    }

    pub fn update_any_basket_allowed(
        &mut self,
        caller: Address,
        any_basket_allowed: bool,
    ) -> Result<(), LeverageError> {
        if caller != self.owner {
            return Err(LeverageError::NotOwner(caller));
        }

        self.allow_list.set_any_basket_allowed(any_basket_allowed);
        self.emit_event(EventPayload::AnyBasketAllowedUpdated(
            AnyBasketAllowedUpdatedEvent { any_basket_allowed },
        ));
        self.flush_events();
        Ok(())
    }

    /// Registers this module's hooks with another initialized debt-issuance
    /// orchestrator on the basket.
    pub fn register_to_module<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
        orchestrator: Address,
    ) -> Result<(), LeverageError> {
        self.transact(env, basket, "register_to_module", |module, env| {
            module.only_manager(env, caller, basket)?;
            let mut record = module.initialized_record(env, basket)?;

            if env.module_status(basket, orchestrator) != ModuleStatus::Initialized {
                return Err(LeverageError::IssuanceNotInitialized(orchestrator));
            }

            env.register_hook(orchestrator, basket, module.address)?;
            if !record.issuance_modules.contains(&orchestrator) {
                record.issuance_modules.push(orchestrator);
            }
            module.baskets.insert(basket, record);

            module.emit_event(EventPayload::IssuanceModuleRegistered(
                IssuanceModuleRegisteredEvent {
                    basket,
                    issuance_module: orchestrator,
                },
            ));
            Ok(())
        })
    }

    /// Called by the basket itself. Refuses while any debt is outstanding; otherwise
    /// withdraws all collateral back to the basket, restores it as a Default
    /// position and unregisters the hooks. Returns the collateral withdrawn.
    pub fn remove_module<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
    ) -> Result<Amount, LeverageError> {
        self.transact(env, basket, "remove_module", |module, env| {
            if caller != basket {
                return Err(LeverageError::NotBasket { caller, basket });
            }
            let record = module
                .baskets
                .get(&basket)
                .cloned()
                .ok_or(LeverageError::NotInitialized(basket))?;
            let params = record.params;

            env.accrue_interest(&params)?;
            let lending = env.position_of(record.market_id, basket);
            if lending.borrow_shares > 0 {
                return Err(LeverageError::BorrowOutstanding {
                    shares: lending.borrow_shares,
                });
            }

            if lending.collateral > 0 {
                env.withdraw_collateral(&params, basket, lending.collateral, basket)?;
            }

            write_position(
                env,
                basket,
                params.loan_asset,
                PositionKind::External,
                module.address,
                Unit::zero(),
            )?;

            if record.collateral_entered {
                write_position(
                    env,
                    basket,
                    params.collateral_asset,
                    PositionKind::External,
                    module.address,
                    Unit::zero(),
                )?;

                let total_supply = env.total_supply(basket)?;
                if total_supply > 0 {
                    let held = env.component_balance(basket, params.collateral_asset);
                    let unit = unit_from_notional(held, total_supply)?;
                    write_position(
                        env,
                        basket,
                        params.collateral_asset,
                        PositionKind::Default,
                        module.address,
                        unit,
                    )?;
                }
            }

            for orchestrator in &record.issuance_modules {
                if let Err(err) = env.unregister_hook(*orchestrator, basket, module.address) {
                    warn!(%basket, %orchestrator, error = %err, "hook unregistration failed");
                }
            }

            module.baskets.remove(&basket);

            info!(%basket, collateral = lending.collateral, "leverage module removed");
            module.emit_event(EventPayload::ModuleRemoved(ModuleRemovedEvent {
                basket,
                collateral_withdrawn: lending.collateral,
            }));
            Ok(lending.collateral)
        })
    }
}
