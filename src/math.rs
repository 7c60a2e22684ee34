//! Fixed-point and mul-div arithmetic.
//!
//! Products are taken in 256 bits so `a * b / d` never loses the high bits of
//! the intermediate; only a final result wider than 128 bits is an error.
//! Every operation names its rounding direction.

use alloy_primitives::U256;

use crate::types::PRECISE_UNIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic underflow")]
    Underflow,
}

fn narrow(value: U256) -> Result<u128, MathError> {
    u128::try_from(value).map_err(|_| MathError::Overflow)
}

/// `a * b / d`, rounded down.
pub fn mul_div_down(a: u128, b: u128, d: u128) -> Result<u128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(MathError::Overflow)?;
    narrow(product / U256::from(d))
}

/// `a * b / d`, rounded up.
pub fn mul_div_up(a: u128, b: u128, d: u128) -> Result<u128, MathError> {
    if d == 0 {
        return Err(MathError::DivisionByZero);
    }
    let divisor = U256::from(d);
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(MathError::Overflow)?;
    let numerator = product
        .checked_add(divisor - U256::from(1u8))
        .ok_or(MathError::Overflow)?;
    narrow(numerator / divisor)
}

pub fn precise_mul(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_down(a, b, PRECISE_UNIT)
}

pub fn precise_mul_ceil(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_up(a, b, PRECISE_UNIT)
}

pub fn precise_div(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_down(a, PRECISE_UNIT, b)
}

pub fn precise_div_ceil(a: u128, b: u128) -> Result<u128, MathError> {
    mul_div_up(a, PRECISE_UNIT, b)
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}
