// 8.6 engine/leverage.rs: entering the collateral position, lever, delever and
// delever-to-zero. every operation ends by rewriting both external positions
// from market and wallet balances.

use tracing::info;

use super::core::{BasketRecord, LeverageModule};
use super::results::{DeleverResult, LeverResult, LeverageError, SyncResult};
use super::trade::ActionInfo;
use crate::events::{
    CollateralEnteredEvent, EventPayload, FullyDeleveredEvent, LeverageChangedEvent,
};
use crate::host::Host;
use crate::lending::RepayAmount;
use crate::math::{checked_sub, precise_mul};
use crate::position::{
    debt_unit_from_notional, notional_magnitude, unit_from_notional, write_position, PositionKind,
};
use crate::types::{Address, Amount, Unit};

impl LeverageModule {
    /// Moves the basket's Default collateral position into the lending market and
    /// replaces it with an External one.
    pub fn enter_collateral_position<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
    ) -> Result<SyncResult, LeverageError> {
        self.transact(env, basket, "enter_collateral_position", |module, env| {
            module.only_manager(env, caller, basket)?;
            let mut record = module.initialized_record(env, basket)?;
            if record.collateral_entered {
                return Err(LeverageError::CollateralAlreadyEntered(basket));
            }

            let collateral = record.params.collateral_asset;
            let unit = env.default_position_unit(basket, collateral)?;
            if !unit.is_positive() {
                return Err(LeverageError::NoCollateralPosition(basket));
            }

            let total_supply = env.total_supply(basket)?;
            let notional = notional_magnitude(unit, total_supply)?;
            if notional == 0 {
                return Err(LeverageError::ZeroQuantity);
            }

            env.supply_collateral(&record.params, basket, notional)?;
            write_position(
                env,
                basket,
                collateral,
                PositionKind::Default,
                module.address,
                Unit::zero(),
            )?;

            record.collateral_entered = true;
            module.baskets.insert(basket, record.clone());

            let synced = module.write_positions(env, basket, &record, total_supply)?;

            info!(%basket, supplied = notional, "collateral position entered");
            module.emit_event(EventPayload::CollateralEntered(CollateralEnteredEvent {
                basket,
                collateral_asset: collateral,
                supplied: notional,
                unit: synced.collateral_unit,
            }));
            Ok(synced)
        })
    }

    /// Borrows `borrow_units` of the loan asset per basket token, swaps it for
    /// collateral and supplies the proceeds net of the protocol fee.
    #[allow(clippy::too_many_arguments)]
    pub fn lever<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
        borrow_units: Amount,
        min_receive_units: Amount,
        adapter_name: &str,
        route: &[u8],
    ) -> Result<LeverResult, LeverageError> {
        self.transact(env, basket, "lever", |module, env| {
            module.only_manager(env, caller, basket)?;
            let record = module.initialized_record(env, basket)?;
            if !record.collateral_entered {
                return Err(LeverageError::CollateralNotEntered(basket));
            }
            let params = record.params;

            env.accrue_interest(&params)?;
            let action = module.action_info(
                env,
                basket,
                params.loan_asset,
                params.collateral_asset,
                borrow_units,
                min_receive_units,
                adapter_name,
            )?;

            let borrowed = env.borrow(&params, basket, action.notional_send, basket)?;
            let received = module.execute_trade(env, &action, route)?;
            let protocol_fee =
                module.accrue_protocol_fee(env, basket, params.collateral_asset, received)?;
            let net = checked_sub(received, protocol_fee)?;
            if net > 0 {
                env.supply_collateral(&params, basket, net)?;
            }

            let synced = module.write_positions(env, basket, &record, action.total_supply)?;

            info!(
                %basket,
                borrowed = borrowed.assets,
                received,
                protocol_fee,
                "leverage increased"
            );
            module.emit_event(EventPayload::LeverageIncreased(LeverageChangedEvent {
                basket,
                send_asset: params.loan_asset,
                receive_asset: params.collateral_asset,
                adapter: action.adapter.name.clone(),
                total_send: borrowed.assets,
                total_receive: received,
                protocol_fee,
            }));

            Ok(LeverResult {
                borrowed: borrowed.assets,
                received,
                protocol_fee,
                collateral_supplied: net,
                collateral_unit: synced.collateral_unit,
                borrow_unit: synced.borrow_unit,
            })
        })
    }

    /// Withdraws `redeem_units` of collateral per basket token, swaps it for the
    /// loan asset and repays. Proceeds above the debt stay on the basket as a
    /// Default loan-asset position.
    #[allow(clippy::too_many_arguments)]
    pub fn delever<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
        redeem_units: Amount,
        min_repay_units: Amount,
        adapter_name: &str,
        route: &[u8],
    ) -> Result<DeleverResult, LeverageError> {
        self.transact(env, basket, "delever", |module, env| {
            module.only_manager(env, caller, basket)?;
            let record = module.initialized_record(env, basket)?;
            if !record.collateral_entered {
                return Err(LeverageError::CollateralNotEntered(basket));
            }
            let params = record.params;

            env.accrue_interest(&params)?;
            let action = module.action_info(
                env,
                basket,
                params.collateral_asset,
                params.loan_asset,
                redeem_units,
                min_repay_units,
                adapter_name,
            )?;

            env.withdraw_collateral(&params, basket, action.notional_send, basket)?;
            let received = module.execute_trade(env, &action, route)?;
            let protocol_fee =
                module.accrue_protocol_fee(env, basket, params.loan_asset, received)?;
            let net = checked_sub(received, protocol_fee)?;

            let repaid = module.repay_capped(env, basket, &record, net)?;
            module.finish_delever(env, basket, &record, action, received, protocol_fee, repaid)
        })
    }

    /// Withdraws `redeem_units` of collateral per basket token and repays the whole
    /// debt. The swap must return at least the outstanding debt.
    pub fn delever_to_zero_borrow_balance<H: Host>(
        &mut self,
        env: &mut H,
        caller: Address,
        basket: Address,
        redeem_units: Amount,
        adapter_name: &str,
        route: &[u8],
    ) -> Result<DeleverResult, LeverageError> {
        self.transact(env, basket, "delever_to_zero_borrow_balance", |module, env| {
            module.only_manager(env, caller, basket)?;
            let record = module.initialized_record(env, basket)?;
            if !record.collateral_entered {
                return Err(LeverageError::CollateralNotEntered(basket));
            }
            let params = record.params;

            env.accrue_interest(&params)?;
            let balances = module.read_balances(env, basket, &record)?;
            if balances.borrow_shares == 0 {
                return Err(LeverageError::BorrowBalanceZero);
            }

            let total_supply = env.total_supply(basket)?;
            let notional_send = precise_mul(redeem_units, total_supply)?;
            let action = module.action_info_notional(
                env,
                basket,
                params.collateral_asset,
                params.loan_asset,
                notional_send,
                balances.borrow,
                adapter_name,
            )?;

            env.withdraw_collateral(&params, basket, action.notional_send, basket)?;
            let received = module.execute_trade(env, &action, route)?;
            let protocol_fee =
                module.accrue_protocol_fee(env, basket, params.loan_asset, received)?;
            let net = checked_sub(received, protocol_fee)?;
            if net < balances.borrow {
                return Err(LeverageError::SlippageTooHigh {
                    received: net,
                    minimum: balances.borrow,
                });
            }

            let repaid = env
                .repay(&params, basket, RepayAmount::Shares(balances.borrow_shares))?
                .assets;
            module.finish_delever(env, basket, &record, action, received, protocol_fee, repaid)
        })
    }

    // 8.6.1: shared tail of both delever paths

    #[allow(clippy::too_many_arguments)]
    fn finish_delever<H: Host>(
        &mut self,
        env: &mut H,
        basket: Address,
        record: &BasketRecord,
        action: ActionInfo,
        received: Amount,
        protocol_fee: Amount,
        repaid: Amount,
    ) -> Result<DeleverResult, LeverageError> {
        let params = record.params;
        let residual = self.write_loan_residual(env, basket, record, action.total_supply)?;
        let synced = self.write_positions(env, basket, record, action.total_supply)?;
        let fully_delevered = env.position_of(record.market_id, basket).borrow_shares == 0;

        info!(
            %basket,
            withdrawn = action.notional_send,
            received,
            repaid,
            fully_delevered,
            "leverage decreased"
        );
        self.emit_event(EventPayload::LeverageDecreased(LeverageChangedEvent {
            basket,
            send_asset: params.collateral_asset,
            receive_asset: params.loan_asset,
            adapter: action.adapter.name.clone(),
            total_send: action.notional_send,
            total_receive: received,
            protocol_fee,
        }));
        if fully_delevered {
            self.emit_event(EventPayload::FullyDelevered(FullyDeleveredEvent {
                basket,
                loan_asset: params.loan_asset,
                residual_loan_balance: residual,
            }));
        }

        Ok(DeleverResult {
            collateral_withdrawn: action.notional_send,
            received,
            protocol_fee,
            repaid,
            collateral_unit: synced.collateral_unit,
            borrow_unit: synced.borrow_unit,
            fully_delevered,
        })
    }

    /// Repays up to `available` of the loan asset. When `available` covers the whole
    /// debt the repay is by shares, so no dust debt is left behind.
    pub(super) fn repay_capped<H: Host>(
        &self,
        env: &mut H,
        basket: Address,
        record: &BasketRecord,
        available: Amount,
    ) -> Result<Amount, LeverageError> {
        let balances = self.read_balances(env, basket, record)?;
        if balances.borrow_shares == 0 || available == 0 {
            return Ok(0);
        }

        let amount = if available >= balances.borrow {
            RepayAmount::Shares(balances.borrow_shares)
        } else {
            RepayAmount::Assets(available)
        };
        Ok(env.repay(&record.params, basket, amount)?.assets)
    }

    /// Rewrites the External collateral and debt units from balances.
    pub(super) fn write_positions<H: Host>(
        &self,
        env: &mut H,
        basket: Address,
        record: &BasketRecord,
        total_supply: Amount,
    ) -> Result<SyncResult, LeverageError> {
        let params = record.params;
        let balances = self.read_balances(env, basket, record)?;

        let collateral_unit = if record.collateral_entered {
            let unit = unit_from_notional(balances.collateral, total_supply)?;
            write_position(
                env,
                basket,
                params.collateral_asset,
                PositionKind::External,
                self.address,
                unit,
            )?;
            unit
        } else {
            env.default_position_unit(basket, params.collateral_asset)?
        };

        let borrow_unit = debt_unit_from_notional(balances.borrow, total_supply)?;
        write_position(
            env,
            basket,
            params.loan_asset,
            PositionKind::External,
            self.address,
            borrow_unit,
        )?;

        Ok(SyncResult {
            total_supply,
            collateral_unit,
            borrow_unit,
            collateral_notional: balances.collateral,
            borrow_notional: balances.borrow,
        })
    }

    /// Loan asset left on the basket after a repay becomes a Default position.
    fn write_loan_residual<H: Host>(
        &self,
        env: &mut H,
        basket: Address,
        record: &BasketRecord,
        total_supply: Amount,
    ) -> Result<Amount, LeverageError> {
        let loan = record.params.loan_asset;
        let residual = env.component_balance(basket, loan);
        let unit = unit_from_notional(residual, total_supply)?;
        write_position(env, basket, loan, PositionKind::Default, self.address, unit)?;
        Ok(residual)
    }
}
