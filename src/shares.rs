// 2.0 shares.rs: lending-market share <-> asset conversion.
// virtual offsets keep an empty market from pricing shares arbitrarily.
// debt is always converted rounding up, claimable collateral rounding down.

use serde::{Deserialize, Serialize};

use crate::math::{checked_add, mul_div_down, mul_div_up, MathError};
use crate::types::Amount;

pub const VIRTUAL_SHARES: u128 = 1_000_000;
pub const VIRTUAL_ASSETS: u128 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    Down,
    Up,
}

pub fn shares_to_assets(
    shares: Amount,
    total_assets: Amount,
    total_shares: Amount,
    rounding: Rounding,
) -> Result<Amount, MathError> {
    let assets_adjusted = checked_add(total_assets, VIRTUAL_ASSETS)?;
    let shares_adjusted = checked_add(total_shares, VIRTUAL_SHARES)?;
    match rounding {
        Rounding::Down => mul_div_down(shares, assets_adjusted, shares_adjusted),
        Rounding::Up => mul_div_up(shares, assets_adjusted, shares_adjusted),
    }
}

pub fn assets_to_shares(
    assets: Amount,
    total_assets: Amount,
    total_shares: Amount,
    rounding: Rounding,
) -> Result<Amount, MathError> {
    let assets_adjusted = checked_add(total_assets, VIRTUAL_ASSETS)?;
    let shares_adjusted = checked_add(total_shares, VIRTUAL_SHARES)?;
    match rounding {
        Rounding::Down => mul_div_down(assets, shares_adjusted, assets_adjusted),
        Rounding::Up => mul_div_up(assets, shares_adjusted, assets_adjusted),
    }
}

// repay / liability side
pub fn to_assets_up(shares: Amount, total_assets: Amount, total_shares: Amount) -> Result<Amount, MathError> {
    shares_to_assets(shares, total_assets, total_shares, Rounding::Up)
}

// withdraw / claim side
pub fn to_assets_down(shares: Amount, total_assets: Amount, total_shares: Amount) -> Result<Amount, MathError> {
    shares_to_assets(shares, total_assets, total_shares, Rounding::Down)
}

// borrow side
pub fn to_shares_up(assets: Amount, total_assets: Amount, total_shares: Amount) -> Result<Amount, MathError> {
    assets_to_shares(assets, total_assets, total_shares, Rounding::Up)
}

// supply / repay-by-assets side
pub fn to_shares_down(assets: Amount, total_assets: Amount, total_shares: Amount) -> Result<Amount, MathError> {
    assets_to_shares(assets, total_assets, total_shares, Rounding::Down)
}
