// 1.0: all the primitives live here. nothing in the engine works without these types.
// addresses, amounts, position units, basis points, timestamps. units are a newtype so
// the compiler keeps per-unit values and notional amounts apart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::math::MathError;

/// Raw token amount in the token's smallest denomination.
pub type Amount = u128;

/// 1e18 fixed-point scale shared by position units and precise math.
pub const PRECISE_UNIT: u128 = 1_000_000_000_000_000_000;

// contracts and accounts share one address space: tokens, baskets, modules, managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    pub const ZERO: Address = Address(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:040x}", self.0)
    }
}

// 1.1: per-basket-unit position value, 1e18 scaled. negative = liability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Unit(i128);

impl Unit {
    pub fn new(value: i128) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    /// Positive unit from an unsigned magnitude.
    pub fn positive(magnitude: u128) -> Result<Self, MathError> {
        i128::try_from(magnitude)
            .map(Self)
            .map_err(|_| MathError::Overflow)
    }

    /// Negative unit (liability) from an unsigned magnitude.
    pub fn negative(magnitude: u128) -> Result<Self, MathError> {
        let value = i128::try_from(magnitude).map_err(|_| MathError::Overflow)?;
        Ok(Self(-value))
    }

    pub fn value(&self) -> i128 {
        self.0
    }

    pub fn magnitude(&self) -> u128 {
        self.0.unsigned_abs()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(&self, other: Unit) -> Result<Self, MathError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(MathError::Overflow)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub const MAX: Bps = Bps(10_000);

    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    /// Share of `amount` this rate represents, rounded down.
    pub fn apply(&self, amount: Amount) -> Result<Amount, MathError> {
        crate::math::mul_div_down(amount, self.0 as u128, Self::MAX.0 as u128)
    }
}

impl fmt::Display for Bps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

// 1.3: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn as_secs(&self) -> i64 {
        self.0 / 1000
    }
}

/// Renders a raw token amount with the token's decimals. Saturates at
/// `Decimal::MAX` when the value does not fit a 96-bit mantissa.
pub fn format_units(amount: Amount, decimals: u32) -> Decimal {
    i128::try_from(amount)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, decimals).ok())
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}
