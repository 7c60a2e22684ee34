// 4.0: basket-token position ledger. the ledger itself is external; this file holds
// its interface, the unit <-> notional conversions and the write adapter the engine uses.
// 4.1 conversions, 4.2 write adapter at the bottom.

use serde::{Deserialize, Serialize};

use crate::math::{precise_div, precise_div_ceil, precise_mul, precise_mul_ceil, MathError};
use crate::types::{Address, Amount, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionKind {
    /// held directly by the basket token
    Default,
    /// accounting delegated to a module, may be negative
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub component: Address,
    pub kind: PositionKind,
    pub module: Option<Address>,
    pub unit: Unit,
}

impl Position {
    pub fn default_position(component: Address, unit: Unit) -> Self {
        Self {
            component,
            kind: PositionKind::Default,
            module: None,
            unit,
        }
    }

    pub fn external_position(component: Address, module: Address, unit: Unit) -> Self {
        Self {
            component,
            kind: PositionKind::External,
            module: Some(module),
            unit,
        }
    }

    pub fn is_external_of(&self, module: Address) -> bool {
        self.kind == PositionKind::External && self.module == Some(module)
    }
}

/// Lifecycle of a module on one basket token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleStatus {
    None,
    Pending,
    Initialized,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Basket {0} not found")]
    BasketNotFound(Address),

    #[error("Insufficient {asset} balance on {holder}: requested {requested}, available {available}")]
    InsufficientBalance {
        asset: Address,
        holder: Address,
        requested: Amount,
        available: Amount,
    },

    #[error("Insufficient {asset} allowance from {owner} to {spender}: requested {requested}, allowed {allowed}")]
    InsufficientAllowance {
        asset: Address,
        owner: Address,
        spender: Address,
        requested: Amount,
        allowed: Amount,
    },

    #[error("Default position unit must not be negative: {0}")]
    NegativeDefaultUnit(Unit),

    #[error("Module {0} is not pending on the basket")]
    ModuleNotPending(Address),

    #[error("Issuance module {0} rejected the hook registration")]
    HookRegistration(Address),

    #[error("Ledger call failed: {0}")]
    CallFailed(String),
}

/// Position storage and balances of the basket tokens.
pub trait PositionLedger {
    fn total_supply(&self, basket: Address) -> Result<Amount, LedgerError>;

    fn positions(&self, basket: Address) -> Result<Vec<Position>, LedgerError>;

    fn default_position_unit(&self, basket: Address, component: Address) -> Result<Unit, LedgerError>;

    fn external_position_unit(
        &self,
        basket: Address,
        component: Address,
        module: Address,
    ) -> Result<Unit, LedgerError>;

    fn edit_default_position(
        &mut self,
        basket: Address,
        component: Address,
        unit: Unit,
    ) -> Result<(), LedgerError>;

    /// A zero unit removes the external entry.
    fn edit_external_position(
        &mut self,
        basket: Address,
        component: Address,
        module: Address,
        unit: Unit,
    ) -> Result<(), LedgerError>;

    /// Token balance held directly by the basket.
    fn component_balance(&self, basket: Address, asset: Address) -> Amount;

    /// Basket transfers `amount` of `asset` to `to`.
    fn invoke_transfer(
        &mut self,
        basket: Address,
        asset: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Basket sets `spender`'s allowance on `asset` to `amount`.
    fn invoke_approve(
        &mut self,
        basket: Address,
        asset: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    fn manager(&self, basket: Address) -> Result<Address, LedgerError>;

    fn module_status(&self, basket: Address, module: Address) -> ModuleStatus;

    fn initialize_module(&mut self, basket: Address, module: Address) -> Result<(), LedgerError>;
}

// 4.1: unit <-> notional. exact integer math on the 1e18 scale.

/// Signed notional for `unit` at `total_supply`. magnitude rounds down, so a
/// negative unit truncates toward zero.
pub fn notional_from_unit(unit: Unit, total_supply: Amount) -> Result<i128, MathError> {
    let magnitude = precise_mul(unit.magnitude(), total_supply)?;
    let magnitude = i128::try_from(magnitude).map_err(|_| MathError::Overflow)?;
    Ok(if unit.is_negative() { -magnitude } else { magnitude })
}

/// Absolute notional of `unit`, rounded down.
pub fn notional_magnitude(unit: Unit, total_supply: Amount) -> Result<Amount, MathError> {
    precise_mul(unit.magnitude(), total_supply)
}

/// Absolute notional of `unit`, rounded up.
pub fn notional_magnitude_ceil(unit: Unit, total_supply: Amount) -> Result<Amount, MathError> {
    precise_mul_ceil(unit.magnitude(), total_supply)
}

/// Positive unit for an asset balance, rounded down.
pub fn unit_from_notional(notional: Amount, total_supply: Amount) -> Result<Unit, MathError> {
    Unit::positive(precise_div(notional, total_supply)?)
}

/// Negative unit for a liability, magnitude rounded up.
pub fn debt_unit_from_notional(debt: Amount, total_supply: Amount) -> Result<Unit, MathError> {
    Unit::negative(precise_div_ceil(debt, total_supply)?)
}

// 4.2: write adapter. unchanged units are not rewritten, zero externals are removed.

/// Writes `unit` for `component` under `kind`; returns whether the ledger changed.
pub fn write_position<L: PositionLedger + ?Sized>(
    ledger: &mut L,
    basket: Address,
    component: Address,
    kind: PositionKind,
    module: Address,
    unit: Unit,
) -> Result<bool, LedgerError> {
    match kind {
        PositionKind::Default => {
            if unit.is_negative() {
                return Err(LedgerError::NegativeDefaultUnit(unit));
            }
            if ledger.default_position_unit(basket, component)? == unit {
                return Ok(false);
            }
            ledger.edit_default_position(basket, component, unit)?;
        }
        PositionKind::External => {
            if ledger.external_position_unit(basket, component, module)? == unit {
                return Ok(false);
            }
            ledger.edit_external_position(basket, component, module, unit)?;
        }
    }
    Ok(true)
}
