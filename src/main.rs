//! Basket Leverage Simulation.
//!
//! Runs a wstETH / USDC basket through the full leverage lifecycle on the
//! in-memory chain: entering the collateral position, levering, interest and
//! sync, delevering, issuance hooks and module removal.

use std::error::Error;

use basket_leverage::sim::{Deployment, SWAP_ADAPTER};
use basket_leverage::*;
use tracing_subscriber::EnvFilter;

type SimResult = Result<(), Box<dyn Error>>;

const USDC: Amount = 1_000_000;
const WSTETH: Amount = PRECISE_UNIT;

fn main() -> SimResult {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ModuleConfig::load_from(".")?;
    println!("Basket Leverage Simulation");
    println!(
        "wstETH collateral, USDC debt, fee cap {}bps, component hook sync: {}\n",
        config.max_protocol_fee_bps, config.sync_on_component_hook
    );

    scenario_1_enter_collateral()?;
    scenario_2_lever()?;
    scenario_3_interest_and_sync()?;
    scenario_4_delever()?;
    scenario_5_delever_to_zero()?;
    scenario_6_issuance_hooks()?;
    scenario_7_remove_module()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn print_positions(deployment: &Deployment) {
    for position in deployment.chain.positions_of(deployment.basket) {
        let decimals = deployment.chain.tokens.decimals(position.component);
        let unit = position.unit.value();
        let magnitude = format_units(position.unit.magnitude(), decimals);
        let sign = if unit < 0 { "-" } else { "" };
        println!(
            "    {:?} {} unit {}{}",
            position.kind, position.component, sign, magnitude
        );
    }
}

/// Default wstETH position moved into the lending market.
fn scenario_1_enter_collateral() -> SimResult {
    println!("Scenario 1: Enter Collateral Position\n");

    let mut deployment = Deployment::wsteth_usdc()?;
    println!("  Before:");
    print_positions(&deployment);

    deployment.enter()?;
    let state = deployment.module.lever_state(&deployment.chain, deployment.basket);
    println!("  After ({state:?}):");
    print_positions(&deployment);
    println!();
    Ok(())
}

/// Borrow 1000 USDC per token and swap it into wstETH.
fn scenario_2_lever() -> SimResult {
    println!("Scenario 2: Lever\n");

    let mut deployment = Deployment::entered()?;
    let result = deployment.lever(1000 * USDC, WSTETH / 4)?;

    println!(
        "  Borrowed {} USDC, received {} wstETH",
        format_units(result.borrowed, 6),
        format_units(result.received, 18)
    );
    println!(
        "  Units: collateral {}, debt {}",
        result.collateral_unit, result.borrow_unit
    );
    print_positions(&deployment);

    println!("\n  Lever with a 0.5 wstETH minimum for 1000 USDC:");
    match deployment.lever(1000 * USDC, WSTETH / 2) {
        Ok(_) => println!("    unexpectedly filled"),
        Err(e) => println!("    rejected: {e} (retryable: {})", e.is_retryable()),
    }
    println!();
    Ok(())
}

/// A year of 10% simple interest, then a permissionless sync.
fn scenario_3_interest_and_sync() -> SimResult {
    println!("Scenario 3: Interest Accrual and Sync\n");

    let mut deployment = Deployment::levered()?;
    // 10% a year, per second, 1e18 scaled
    let rate = 100_000_000_000_000_000 / (365 * 24 * 3600);
    deployment.chain.market.set_rate(&deployment.params, rate)?;
    deployment.chain.market.advance(365 * 24 * 3600);

    let stale = deployment
        .module
        .collateral_and_borrow_balances(&deployment.chain, deployment.basket)?;
    println!("  Debt before accrual: {} USDC", format_units(stale.borrow, 6));

    if let Some(synced) = deployment.module.sync(&mut deployment.chain, deployment.basket)? {
        println!(
            "  Debt after sync: {} USDC, debt unit {}",
            format_units(synced.borrow_notional, 6),
            synced.borrow_unit
        );
    }
    println!();
    Ok(())
}

/// Sell 0.05 wstETH per token to pay down part of the debt.
fn scenario_4_delever() -> SimResult {
    println!("Scenario 4: Partial Delever\n");

    let mut deployment = Deployment::levered()?;
    let result = deployment.delever(WSTETH / 20, 100 * USDC)?;

    println!(
        "  Withdrew {} wstETH, repaid {} USDC",
        format_units(result.collateral_withdrawn, 18),
        format_units(result.repaid, 6)
    );
    print_positions(&deployment);
    println!();
    Ok(())
}

/// Sell enough collateral to clear the debt; the surplus stays as USDC.
fn scenario_5_delever_to_zero() -> SimResult {
    println!("Scenario 5: Delever to Zero Borrow Balance\n");

    let mut deployment = Deployment::levered()?;
    let result = deployment.module.delever_to_zero_borrow_balance(
        &mut deployment.chain,
        deployment.manager,
        deployment.basket,
        WSTETH / 2,
        SWAP_ADAPTER,
        &[],
    )?;

    println!(
        "  Repaid {} USDC, fully delevered: {}",
        format_units(result.repaid, 6),
        result.fully_delevered
    );
    print_positions(&deployment);
    println!();
    Ok(())
}

/// The issuance orchestrator borrows on issue and repays on redeem.
fn scenario_6_issuance_hooks() -> SimResult {
    println!("Scenario 6: Issuance Hooks\n");

    let mut deployment = Deployment::levered()?;
    let (orchestrator, basket, usdc) = (deployment.orchestrator, deployment.basket, deployment.usdc);
    let quantity = WSTETH / 10;

    let borrowed = deployment.module.component_issue_hook(
        &mut deployment.chain,
        orchestrator,
        basket,
        quantity,
        usdc,
        false,
    )?;
    println!(
        "  Issue 0.1 tokens: borrowed {} USDC into the basket",
        format_units(borrowed, 6)
    );

    let repaid = deployment.module.component_redeem_hook(
        &mut deployment.chain,
        orchestrator,
        basket,
        quantity,
        usdc,
        false,
    )?;
    println!("  Redeem 0.1 tokens: repaid {} USDC", format_units(repaid, 6));
    println!();
    Ok(())
}

/// Removal is refused while levered and succeeds once the debt is gone.
fn scenario_7_remove_module() -> SimResult {
    println!("Scenario 7: Module Removal\n");

    let mut deployment = Deployment::levered()?;
    let basket = deployment.basket;
    if let Err(e) = deployment.module.remove_module(&mut deployment.chain, basket, basket) {
        println!("  While levered: {e}");
    }

    deployment.module.delever_to_zero_borrow_balance(
        &mut deployment.chain,
        deployment.manager,
        basket,
        WSTETH / 2,
        SWAP_ADAPTER,
        &[],
    )?;
    let withdrawn = deployment.module.remove_module(&mut deployment.chain, basket, basket)?;
    deployment.chain.detach_module(basket, deployment.module.address())?;

    println!(
        "  After delevering: withdrew {} wstETH back to the basket",
        format_units(withdrawn, 18)
    );
    print_positions(&deployment);
    Ok(())
}
