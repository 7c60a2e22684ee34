// 12.2 sim/market.rs: an isolated-market lending pool. share accounting with virtual
// shares, linear interest, oracle-priced health checks and a liquidation entry
// point so tests can move the debt behind the module's back.

use std::collections::HashMap;

use tracing::trace;

use super::tokens::TokenBook;
use crate::lending::{
    LendingError, LendingPosition, MarketId, MarketParams, MarketState, Movement, RepayAmount,
};
use crate::math::{checked_add, checked_sub, mul_div_down, precise_mul};
use crate::shares::{to_assets_down, to_assets_up, to_shares_down, to_shares_up};
use crate::types::{Address, Amount};

/// Oracle prices quote one unit of collateral in loan asset, scaled by 1e36.
pub const ORACLE_PRICE_SCALE: u128 = 1_000_000_000_000_000_000_000_000_000_000_000_000;

#[derive(Debug, Clone)]
struct MarketEntry {
    params: MarketParams,
    state: MarketState,
    positions: HashMap<Address, LendingPosition>,
    /// 1e18 scaled borrow rate per second
    rate_per_second: u128,
}

#[derive(Debug, Clone)]
pub struct SimMarket {
    pub address: Address,
    markets: HashMap<MarketId, MarketEntry>,
    prices: HashMap<Address, u128>,
    now: u64,
}

fn transfer_err(err: crate::position::LedgerError) -> LendingError {
    LendingError::Transfer(err.to_string())
}

impl SimMarket {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            markets: HashMap::new(),
            prices: HashMap::new(),
            now: 0,
        }
    }

    pub fn create_market(&mut self, params: MarketParams, rate_per_second: u128) -> MarketId {
        let id = params.id();
        self.markets.insert(
            id,
            MarketEntry {
                params,
                state: MarketState {
                    last_update: self.now,
                    ..MarketState::default()
                },
                positions: HashMap::new(),
                rate_per_second,
            },
        );
        id
    }

    /// Accrues at the old rate first so the change only applies going forward.
    pub fn set_rate(&mut self, params: &MarketParams, rate_per_second: u128) -> Result<(), LendingError> {
        self.accrue(params)?;
        self.entry_mut(params)?.rate_per_second = rate_per_second;
        Ok(())
    }

    pub fn set_price(&mut self, oracle: Address, price: u128) {
        self.prices.insert(oracle, price);
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn advance(&mut self, seconds: u64) {
        self.now += seconds;
    }

    fn entry_mut(&mut self, params: &MarketParams) -> Result<&mut MarketEntry, LendingError> {
        let id = params.id();
        self.markets.get_mut(&id).ok_or(LendingError::MarketNotCreated(id))
    }

    pub fn accrue(&mut self, params: &MarketParams) -> Result<(), LendingError> {
        let now = self.now;
        let entry = self.entry_mut(params)?;
        let elapsed = now.saturating_sub(entry.state.last_update);
        if elapsed == 0 {
            return Ok(());
        }

        let growth = entry
            .rate_per_second
            .checked_mul(u128::from(elapsed))
            .ok_or(crate::math::MathError::Overflow)?;
        let interest = precise_mul(entry.state.total_borrow_assets, growth)?;
        entry.state.total_borrow_assets = checked_add(entry.state.total_borrow_assets, interest)?;
        entry.state.total_supply_assets = checked_add(entry.state.total_supply_assets, interest)?;
        entry.state.last_update = now;

        trace!(market = %params.id(), interest, elapsed, "interest accrued");
        Ok(())
    }

    /// Lender deposit of the loan asset. Returns supply shares minted.
    pub fn supply(
        &mut self,
        tokens: &mut TokenBook,
        params: &MarketParams,
        lender: Address,
        assets: Amount,
    ) -> Result<Amount, LendingError> {
        if assets == 0 {
            return Err(LendingError::ZeroAmount);
        }
        self.accrue(params)?;
        let market = self.address;
        let entry = self.entry_mut(params)?;
        let shares = to_shares_down(
            assets,
            entry.state.total_supply_assets,
            entry.state.total_supply_shares,
        )?;

        tokens
            .transfer(params.loan_asset, lender, market, assets)
            .map_err(transfer_err)?;
        entry.state.total_supply_assets = checked_add(entry.state.total_supply_assets, assets)?;
        entry.state.total_supply_shares = checked_add(entry.state.total_supply_shares, shares)?;
        let position = entry.positions.entry(lender).or_default();
        position.supply_shares = checked_add(position.supply_shares, shares)?;
        Ok(shares)
    }

    pub fn supply_collateral(
        &mut self,
        tokens: &mut TokenBook,
        params: &MarketParams,
        on_behalf: Address,
        amount: Amount,
    ) -> Result<(), LendingError> {
        if amount == 0 {
            return Err(LendingError::ZeroAmount);
        }
        let market = self.address;
        let entry = self.entry_mut(params)?;
        tokens
            .transfer(params.collateral_asset, on_behalf, market, amount)
            .map_err(transfer_err)?;
        let position = entry.positions.entry(on_behalf).or_default();
        position.collateral = checked_add(position.collateral, amount)?;
        Ok(())
    }

    pub fn withdraw_collateral(
        &mut self,
        tokens: &mut TokenBook,
        params: &MarketParams,
        on_behalf: Address,
        amount: Amount,
        receiver: Address,
    ) -> Result<(), LendingError> {
        if amount == 0 {
            return Err(LendingError::ZeroAmount);
        }
        self.accrue(params)?;
        let market = self.address;
        let price = self.price(params);
        let entry = self.entry_mut(params)?;

        let position = entry.positions.entry(on_behalf).or_default();
        if amount > position.collateral {
            return Err(LendingError::WithdrawExceedsCollateral {
                requested: amount,
                deposited: position.collateral,
            });
        }
        position.collateral -= amount;

        if !Self::is_healthy(entry, on_behalf, price)? {
            return Err(LendingError::InsufficientCollateral);
        }
        tokens
            .transfer(params.collateral_asset, market, receiver, amount)
            .map_err(transfer_err)?;
        Ok(())
    }

    pub fn borrow(
        &mut self,
        tokens: &mut TokenBook,
        params: &MarketParams,
        on_behalf: Address,
        assets: Amount,
        receiver: Address,
    ) -> Result<Movement, LendingError> {
        if assets == 0 {
            return Err(LendingError::ZeroAmount);
        }
        self.accrue(params)?;
        let market = self.address;
        let price = self.price(params);
        let entry = self.entry_mut(params)?;

        let shares = to_shares_up(
            assets,
            entry.state.total_borrow_assets,
            entry.state.total_borrow_shares,
        )?;
        entry.state.total_borrow_assets = checked_add(entry.state.total_borrow_assets, assets)?;
        entry.state.total_borrow_shares = checked_add(entry.state.total_borrow_shares, shares)?;
        let position = entry.positions.entry(on_behalf).or_default();
        position.borrow_shares = checked_add(position.borrow_shares, shares)?;

        if !Self::is_healthy(entry, on_behalf, price)? {
            return Err(LendingError::InsufficientCollateral);
        }
        if entry.state.total_borrow_assets > entry.state.total_supply_assets {
            return Err(LendingError::InsufficientLiquidity {
                requested: assets,
                available: entry
                    .state
                    .total_supply_assets
                    .saturating_sub(entry.state.total_borrow_assets - assets),
            });
        }

        tokens
            .transfer(params.loan_asset, market, receiver, assets)
            .map_err(transfer_err)?;
        Ok(Movement { assets, shares })
    }

    pub fn repay(
        &mut self,
        tokens: &mut TokenBook,
        params: &MarketParams,
        on_behalf: Address,
        amount: RepayAmount,
    ) -> Result<Movement, LendingError> {
        self.accrue(params)?;
        let market = self.address;
        let entry = self.entry_mut(params)?;
        let state = entry.state;

        let (assets, shares) = match amount {
            RepayAmount::Assets(assets) => (
                assets,
                to_shares_down(assets, state.total_borrow_assets, state.total_borrow_shares)?,
            ),
            RepayAmount::Shares(shares) => (
                to_assets_up(shares, state.total_borrow_assets, state.total_borrow_shares)?,
                shares,
            ),
        };
        if assets == 0 {
            return Err(LendingError::ZeroAmount);
        }

        let position = entry.positions.entry(on_behalf).or_default();
        if shares > position.borrow_shares {
            return Err(LendingError::RepayExceedsDebt {
                requested: shares,
                owed: position.borrow_shares,
            });
        }

        tokens
            .transfer(params.loan_asset, on_behalf, market, assets)
            .map_err(transfer_err)?;
        position.borrow_shares -= shares;
        entry.state.total_borrow_shares = checked_sub(state.total_borrow_shares, shares)?;
        entry.state.total_borrow_assets = state.total_borrow_assets.saturating_sub(assets);
        Ok(Movement { assets, shares })
    }

    /// Seizes `seized` collateral from an unhealthy borrower and burns
    /// `repaid_shares` of its debt, paid for by `liquidator`.
    pub fn liquidate(
        &mut self,
        tokens: &mut TokenBook,
        params: &MarketParams,
        borrower: Address,
        seized: Amount,
        repaid_shares: Amount,
        liquidator: Address,
    ) -> Result<Movement, LendingError> {
        self.accrue(params)?;
        let market = self.address;
        let price = self.price(params);
        let entry = self.entry_mut(params)?;

        if Self::is_healthy(entry, borrower, price)? {
            return Err(LendingError::InsufficientCollateral);
        }

        let state = entry.state;
        let assets = to_assets_up(repaid_shares, state.total_borrow_assets, state.total_borrow_shares)?;
        let position = entry.positions.entry(borrower).or_default();
        if repaid_shares > position.borrow_shares {
            return Err(LendingError::RepayExceedsDebt {
                requested: repaid_shares,
                owed: position.borrow_shares,
            });
        }
        if seized > position.collateral {
            return Err(LendingError::WithdrawExceedsCollateral {
                requested: seized,
                deposited: position.collateral,
            });
        }

        tokens
            .transfer(params.loan_asset, liquidator, market, assets)
            .map_err(transfer_err)?;
        tokens
            .transfer(params.collateral_asset, market, liquidator, seized)
            .map_err(transfer_err)?;
        position.borrow_shares -= repaid_shares;
        position.collateral -= seized;
        entry.state.total_borrow_shares = checked_sub(state.total_borrow_shares, repaid_shares)?;
        entry.state.total_borrow_assets = state.total_borrow_assets.saturating_sub(assets);
        Ok(Movement {
            assets,
            shares: repaid_shares,
        })
    }

    pub fn position(&self, id: MarketId, account: Address) -> LendingPosition {
        self.markets
            .get(&id)
            .and_then(|entry| entry.positions.get(&account).copied())
            .unwrap_or_default()
    }

    pub fn state(&self, id: MarketId) -> Result<MarketState, LendingError> {
        self.markets
            .get(&id)
            .map(|entry| entry.state)
            .ok_or(LendingError::MarketNotCreated(id))
    }

    fn price(&self, params: &MarketParams) -> u128 {
        self.prices.get(&params.oracle).copied().unwrap_or(0)
    }

    // max borrow = collateral * price / 1e36 * lltv / 1e18
    fn is_healthy(entry: &MarketEntry, account: Address, price: u128) -> Result<bool, LendingError> {
        let Some(position) = entry.positions.get(&account) else {
            return Ok(true);
        };
        if position.borrow_shares == 0 {
            return Ok(true);
        }

        let debt = to_assets_up(
            position.borrow_shares,
            entry.state.total_borrow_assets,
            entry.state.total_borrow_shares,
        )?;
        let value = mul_div_down(position.collateral, price, ORACLE_PRICE_SCALE)?;
        let max_borrow = precise_mul(value, entry.params.liquidation_threshold)?;
        Ok(max_borrow >= debt)
    }

    /// Supply-side assets of an account, rounded down.
    pub fn supplied_assets(&self, id: MarketId, account: Address) -> Result<Amount, LendingError> {
        let state = self.state(id)?;
        let shares = self.position(id, account).supply_shares;
        Ok(to_assets_down(shares, state.total_supply_assets, state.total_supply_shares)?)
    }
}
