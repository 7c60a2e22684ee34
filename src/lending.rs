//! Lending market interface.
//!
//! The engine borrows the loan asset against collateral it supplies on behalf of
//! the basket. The market's own accounting (interest model, liquidation, health)
//! stays behind the [`LendingMarket`] trait; the engine only needs positions,
//! market totals and the five primitive calls.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::math::MathError;
use crate::shares::to_assets_up;
use crate::types::{Address, Amount};

/// Identifies one lending market. Fixed per basket at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketParams {
    pub loan_asset: Address,
    pub collateral_asset: Address,
    pub oracle: Address,
    pub interest_rate_model: Address,
    /// 1e18 scaled loan-to-value at which the position can be liquidated.
    pub liquidation_threshold: u128,
}

impl MarketParams {
    /// Deterministic id: SHA-256 over the parameter tuple.
    pub fn id(&self) -> MarketId {
        let mut hasher = Sha256::new();
        hasher.update(self.loan_asset.0.to_be_bytes());
        hasher.update(self.collateral_asset.0.to_be_bytes());
        hasher.update(self.oracle.0.to_be_bytes());
        hasher.update(self.interest_rate_model.0.to_be_bytes());
        hasher.update(self.liquidation_threshold.to_be_bytes());
        MarketId(hasher.finalize().into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarketId(pub [u8; 32]);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// One account's position in one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LendingPosition {
    pub supply_shares: Amount,
    pub borrow_shares: Amount,
    pub collateral: Amount,
}

/// Market totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketState {
    pub total_supply_assets: Amount,
    pub total_supply_shares: Amount,
    pub total_borrow_assets: Amount,
    pub total_borrow_shares: Amount,
    /// seconds
    pub last_update: u64,
    /// 1e18 scaled share of interest kept by the market
    pub fee: u128,
}

impl MarketState {
    /// Debt owed for `borrow_shares`, rounded against the borrower.
    pub fn borrow_assets(&self, borrow_shares: Amount) -> Result<Amount, MathError> {
        to_assets_up(borrow_shares, self.total_borrow_assets, self.total_borrow_shares)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepayAmount {
    Assets(Amount),
    /// burn exactly these shares; the market computes the assets owed
    Shares(Amount),
}

/// Assets and shares a borrow or repay actually moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Movement {
    pub assets: Amount,
    pub shares: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LendingError {
    #[error("Market {0} not created")]
    MarketNotCreated(MarketId),

    #[error("Insufficient collateral for borrow position")]
    InsufficientCollateral,

    #[error("Insufficient market liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: Amount, available: Amount },

    #[error("Withdraw exceeds collateral: requested {requested}, deposited {deposited}")]
    WithdrawExceedsCollateral { requested: Amount, deposited: Amount },

    #[error("Repay exceeds borrow shares: requested {requested}, owed {owed}")]
    RepayExceedsDebt { requested: Amount, owed: Amount },

    #[error("Token transfer failed: {0}")]
    Transfer(String),

    #[error("Zero amount")]
    ZeroAmount,

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

/// External lending market.
pub trait LendingMarket {
    /// Brings market totals up to date with accrued interest.
    fn accrue_interest(&mut self, params: &MarketParams) -> Result<(), LendingError>;

    /// Pulls `amount` of collateral from `on_behalf` into the market.
    fn supply_collateral(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        amount: Amount,
    ) -> Result<(), LendingError>;

    fn withdraw_collateral(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        amount: Amount,
        receiver: Address,
    ) -> Result<(), LendingError>;

    fn borrow(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        assets: Amount,
        receiver: Address,
    ) -> Result<Movement, LendingError>;

    /// Pulls the repaid assets from `on_behalf`.
    fn repay(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        amount: RepayAmount,
    ) -> Result<Movement, LendingError>;

    fn position_of(&self, market: MarketId, account: Address) -> LendingPosition;

    fn market_state(&self, market: MarketId) -> Result<MarketState, LendingError>;
}
