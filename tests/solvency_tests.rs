//! Position alignment invariants.
//!
//! Whatever sequence of lever, delever, interest and issuance hooks runs, a sync
//! leaves the basket's external units equal to what the lending market holds, and
//! a failed operation leaves no trace.

use basket_leverage::sim::Deployment;
use basket_leverage::*;
use proptest::prelude::*;

const USDC: Amount = 1_000_000;
const CENTI_WSTETH: Amount = PRECISE_UNIT / 100;

#[derive(Debug, Clone)]
enum Op {
    Lever(Amount),
    Delever(Amount),
    Accrue(u64),
    Issue(Amount),
    Redeem(Amount),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u128..800u128).prop_map(|usdc| Op::Lever(usdc * USDC)),
        (1u128..20u128).prop_map(|centi| Op::Delever(centi * CENTI_WSTETH)),
        (1u64..10_000_000u64).prop_map(Op::Accrue),
        (1u128..50u128).prop_map(|centi| Op::Issue(centi * CENTI_WSTETH)),
        (1u128..50u128).prop_map(|centi| Op::Redeem(centi * CENTI_WSTETH)),
    ]
}

fn snapshot(d: &Deployment) -> (Vec<Position>, LendingPosition) {
    (
        d.chain.positions_of(d.basket),
        d.chain.position_of(d.params.id(), d.basket),
    )
}

fn apply(d: &mut Deployment, op: &Op) -> Result<(), LeverageError> {
    let (orchestrator, basket, usdc) = (d.orchestrator, d.basket, d.usdc);
    match *op {
        Op::Lever(amount) => d.lever(amount, 0).map(|_| ()),
        Op::Delever(amount) => d.delever(amount, 0).map(|_| ()),
        Op::Accrue(seconds) => {
            d.chain.market.advance(seconds);
            Ok(())
        }
        Op::Issue(quantity) => d
            .module
            .component_issue_hook(&mut d.chain, orchestrator, basket, quantity, usdc, false)
            .map(|_| ()),
        Op::Redeem(quantity) => {
            // the redeemer pays the debt share in before the hook runs
            d.chain.tokens.mint(usdc, basket, 2000 * USDC);
            d.module
                .component_redeem_hook(&mut d.chain, orchestrator, basket, quantity, usdc, false)
                .map(|_| ())
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence followed by a sync, units match market balances exactly.
    #[test]
    fn positions_align_after_sync(ops in proptest::collection::vec(op_strategy(), 1..12)) {
        let mut d = Deployment::entered().unwrap();
        // ~3% a year
        d.chain.market.set_rate(&d.params, 1_000_000_000).unwrap();

        for op in &ops {
            let before = snapshot(&d);
            if apply(&mut d, op).is_err() {
                prop_assert_eq!(snapshot(&d), before, "failed {:?} left state behind", op);
            }
        }

        d.module.sync(&mut d.chain, d.basket).unwrap();

        let supply = d.chain.total_supply(d.basket).unwrap();
        let balances = d.module.collateral_and_borrow_balances(&d.chain, d.basket).unwrap();
        let module = d.module.address();

        let collateral_unit = d.chain.external_position_unit(d.basket, d.wsteth, module).unwrap();
        prop_assert_eq!(notional_magnitude(collateral_unit, supply).unwrap(), balances.collateral);

        let debt_unit = d.chain.external_position_unit(d.basket, d.usdc, module).unwrap();
        prop_assert_eq!(notional_magnitude(debt_unit, supply).unwrap(), balances.borrow);
        prop_assert!(!debt_unit.is_positive());
    }

    /// The basket never ends a lever or delever with a debt unit that understates the debt.
    #[test]
    fn debt_never_understated(levers in proptest::collection::vec(1u128..600u128, 1..6)) {
        let mut d = Deployment::entered().unwrap();
        for usdc in levers {
            if d.lever(usdc * USDC, 0).is_err() {
                continue;
            }
            let supply = d.chain.total_supply(d.basket).unwrap();
            let balances = d.module.collateral_and_borrow_balances(&d.chain, d.basket).unwrap();
            let debt_unit = d
                .chain
                .external_position_unit(d.basket, d.usdc, d.module.address())
                .unwrap();
            prop_assert!(notional_magnitude_ceil(debt_unit, supply).unwrap() >= balances.borrow);
        }
    }
}
