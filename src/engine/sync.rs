//! Reconciliation of the basket's positions with lending-market balances.

use tracing::debug;

use super::core::{BasketRecord, LeverageModule};
use super::results::{LeverageError, SyncResult};
use crate::events::{EventPayload, PositionsSyncedEvent};
use crate::host::Host;
use crate::position::{debt_unit_from_notional, notional_magnitude, write_position, PositionKind};
use crate::types::{Address, Amount};

impl LeverageModule {
    /// Permissionless. Accrues interest and rewrites the collateral and debt units
    /// so that unit times supply matches what the market holds. Returns `None` for
    /// a basket with no supply, whose units are left untouched.
    pub fn sync<H: Host>(
        &mut self,
        env: &mut H,
        basket: Address,
    ) -> Result<Option<SyncResult>, LeverageError> {
        self.transact(env, basket, "sync", |module, env| {
            let record = module.initialized_record(env, basket)?;
            module.sync_positions(env, basket, &record)
        })
    }

    pub(super) fn sync_positions<H: Host>(
        &mut self,
        env: &mut H,
        basket: Address,
        record: &BasketRecord,
    ) -> Result<Option<SyncResult>, LeverageError> {
        let total_supply = env.total_supply(basket)?;
        if total_supply == 0 {
            debug!(%basket, "sync skipped, basket has no supply");
            return Ok(None);
        }

        env.accrue_interest(&record.params)?;
        let synced = self.write_positions(env, basket, record, total_supply)?;

        debug!(
            %basket,
            collateral_unit = %synced.collateral_unit,
            borrow_unit = %synced.borrow_unit,
            "positions synced"
        );
        self.emit_event(EventPayload::PositionsSynced(PositionsSyncedEvent {
            basket,
            collateral_unit: synced.collateral_unit,
            borrow_unit: synced.borrow_unit,
            total_supply,
        }));
        Ok(Some(synced))
    }

    /// Rewrites the debt unit against `total_supply`, the supply the basket holds
    /// once the orchestrator has minted or burned. The collateral unit is left as
    /// is: equity moves in and out at that unit during issuance.
    pub(super) fn sync_debt_for_supply<H: Host>(
        &mut self,
        env: &mut H,
        basket: Address,
        record: &BasketRecord,
        total_supply: Amount,
    ) -> Result<Option<SyncResult>, LeverageError> {
        if total_supply == 0 {
            debug!(%basket, "debt sync skipped, basket is fully redeemed");
            return Ok(None);
        }

        env.accrue_interest(&record.params)?;
        let balances = self.read_balances(env, basket, record)?;
        let params = record.params;

        let borrow_unit = debt_unit_from_notional(balances.borrow, total_supply)?;
        write_position(
            env,
            basket,
            params.loan_asset,
            PositionKind::External,
            self.address,
            borrow_unit,
        )?;

        let collateral_unit = if record.collateral_entered {
            env.external_position_unit(basket, params.collateral_asset, self.address)?
        } else {
            env.default_position_unit(basket, params.collateral_asset)?
        };
        let synced = SyncResult {
            total_supply,
            collateral_unit,
            borrow_unit,
            collateral_notional: notional_magnitude(collateral_unit, total_supply)?,
            borrow_notional: balances.borrow,
        };

        debug!(%basket, total_supply, borrow_unit = %borrow_unit, "debt synced");
        self.emit_event(EventPayload::PositionsSynced(PositionsSyncedEvent {
            basket,
            collateral_unit,
            borrow_unit,
            total_supply,
        }));
        Ok(Some(synced))
    }
}

#[cfg(test)]
mod tests {
    use crate::sim::Deployment;
    use crate::types::Unit;

    #[test]
    fn sync_is_a_no_op_on_a_fresh_market() {
        let mut deployment = Deployment::entered().unwrap();
        let basket = deployment.basket;
        let before = deployment.chain.positions_of(basket);

        let synced = deployment
            .module
            .sync(&mut deployment.chain, basket)
            .unwrap()
            .unwrap();
        assert_eq!(synced.borrow_unit, Unit::zero());
        assert_eq!(deployment.chain.positions_of(basket), before);
    }

    #[test]
    fn sync_skips_empty_basket() {
        let mut deployment = Deployment::wsteth_usdc().unwrap();
        let basket = deployment.basket;
        deployment.chain.set_total_supply(basket, 0);

        let synced = deployment.module.sync(&mut deployment.chain, basket).unwrap();
        assert!(synced.is_none());
    }
}
