// 8.0.2: result types and errors for engine operations.

use serde::{Deserialize, Serialize};

use crate::exchange::ExchangeError;
use crate::lending::LendingError;
use crate::math::MathError;
use crate::position::LedgerError;
use crate::types::{Address, Amount, Unit};

/// Where a basket sits in the leverage lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeverState {
    Uninitialized,
    /// market registered, collateral still a Default position
    Initialized,
    /// collateral supplied, no debt
    Collateralized,
    /// outstanding borrow shares
    Levered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverResult {
    pub borrowed: Amount,
    pub received: Amount,
    pub protocol_fee: Amount,
    pub collateral_supplied: Amount,
    pub collateral_unit: Unit,
    pub borrow_unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleverResult {
    pub collateral_withdrawn: Amount,
    pub received: Amount,
    pub protocol_fee: Amount,
    pub repaid: Amount,
    pub collateral_unit: Unit,
    pub borrow_unit: Unit,
    pub fully_delevered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub total_supply: Amount,
    pub collateral_unit: Unit,
    pub borrow_unit: Unit,
    pub collateral_notional: Amount,
    pub borrow_notional: Amount,
}

/// Ground-truth balances backing a basket's two external positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionBalances {
    /// collateral held by the basket plus collateral in the market
    pub collateral: Amount,
    /// debt, rounded up
    pub borrow: Amount,
    pub borrow_shares: Amount,
}

/// Coarse error categories for callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authorization,
    StatePrecondition,
    Slippage,
    Invariant,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeverageError {
    #[error("Must be the basket manager: caller {caller}, basket {basket}")]
    NotManager { caller: Address, basket: Address },

    #[error("Caller {0} is not the module owner")]
    NotOwner(Address),

    #[error("Only the module can call: {0}")]
    NotInitializedModule(Address),

    #[error("Module must be enabled on controller: {0}")]
    ModuleNotEnabled(Address),

    #[error("Issuance module {caller} is not registered for basket {basket}")]
    UnregisteredIssuanceModule { caller: Address, basket: Address },

    #[error("Caller {caller} is not basket {basket}")]
    NotBasket { caller: Address, basket: Address },

    #[error("Must be controller-enabled basket: {0}")]
    BasketNotEnabled(Address),

    #[error("Must be pending initialization: {0}")]
    NotPendingInitialization(Address),

    #[error("Not allowed basket: {0}")]
    BasketNotAllowed(Address),

    #[error("Invalid basket: {0}")]
    InvalidBasket(Address),

    #[error("Basket {0} is not initialized on this module")]
    NotInitialized(Address),

    #[error("Basket {0} already has a market")]
    AlreadyInitialized(Address),

    #[error("Collateral and loan asset must differ: {0}")]
    InvalidMarketParams(Address),

    #[error("Issuance module not registered: {0}")]
    InvalidIssuanceModule(String),

    #[error("Issuance not initialized: {0}")]
    IssuanceNotInitialized(Address),

    #[error("Collateral position already entered for basket {0}")]
    CollateralAlreadyEntered(Address),

    #[error("Collateral position not entered for basket {0}")]
    CollateralNotEntered(Address),

    #[error("No default collateral position for basket {0}")]
    NoCollateralPosition(Address),

    #[error("Quantity is 0")]
    ZeroQuantity,

    #[error("Protocol fee {fee_bps}bps above cap {cap_bps}bps")]
    ProtocolFeeTooHigh { fee_bps: u32, cap_bps: u32 },

    #[error("Slippage too high: received {received}, minimum {minimum}")]
    SlippageTooHigh { received: Amount, minimum: Amount },

    #[error("Debt component mismatch: got {component}, expected {expected}")]
    DebtComponentMismatch { component: Address, expected: Address },

    #[error("Component must be negative: unit {0}")]
    DebtUnitNotNegative(Unit),

    #[error("Borrow balance is zero")]
    BorrowBalanceZero,

    #[error("Borrow balance must be 0: {shares} shares outstanding")]
    BorrowOutstanding { shares: Amount },

    #[error("Reentrant call on basket {0}")]
    Reentrancy(Address),

    #[error("Lending market error: {0}")]
    Lending(#[from] LendingError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl LeverageError {
    pub fn class(&self) -> ErrorClass {
        use LeverageError::*;
        match self {
            NotManager { .. }
            | NotOwner(_)
            | NotInitializedModule(_)
            | ModuleNotEnabled(_)
            | UnregisteredIssuanceModule { .. }
            | NotBasket { .. } => ErrorClass::Authorization,

            BasketNotEnabled(_)
            | NotPendingInitialization(_)
            | BasketNotAllowed(_)
            | InvalidBasket(_)
            | NotInitialized(_)
            | AlreadyInitialized(_)
            | InvalidMarketParams(_)
            | InvalidIssuanceModule(_)
            | IssuanceNotInitialized(_)
            | CollateralAlreadyEntered(_)
            | CollateralNotEntered(_)
            | NoCollateralPosition(_)
            | ZeroQuantity
            | ProtocolFeeTooHigh { .. } => ErrorClass::StatePrecondition,

            SlippageTooHigh { .. } => ErrorClass::Slippage,

            DebtComponentMismatch { .. }
            | DebtUnitNotNegative(_)
            | BorrowBalanceZero
            | BorrowOutstanding { .. }
            | Reentrancy(_)
            | Math(_) => ErrorClass::Invariant,

            Lending(_) | Exchange(_) | Ledger(_) => ErrorClass::External,
        }
    }

    /// Only a slippage failure can succeed on retry with adjusted parameters.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Slippage
    }
}
