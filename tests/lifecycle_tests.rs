//! Lifecycle tests for the leverage module.
//!
//! Every scenario runs on the in-memory wstETH / USDC deployment: one basket token
//! of supply 1e18 holding one wstETH, priced at 3000 USDC.

use std::sync::Arc;

use basket_leverage::sim::{Deployment, FixedRateAdapter, SWAP_ADAPTER};
use basket_leverage::*;

const USDC: Amount = 1_000_000;
const WSTETH: Amount = PRECISE_UNIT;

/// 1e18 + 1000 USDC of wstETH at 3000
const LEVERED_COLLATERAL_UNIT: i128 = 1_333_333_333_333_333_333;

fn external_unit(d: &Deployment, component: Address) -> Unit {
    d.chain
        .external_position_unit(d.basket, component, d.module.address())
        .unwrap()
}

fn default_unit(d: &Deployment, component: Address) -> Unit {
    d.chain.default_position_unit(d.basket, component).unwrap()
}

/// Both external units equal the market balances at the current supply.
fn assert_aligned(d: &Deployment) {
    let supply = d.chain.total_supply(d.basket).unwrap();
    let balances = d
        .module
        .collateral_and_borrow_balances(&d.chain, d.basket)
        .unwrap();

    let collateral_unit = external_unit(d, d.wsteth);
    assert_eq!(collateral_unit, unit_from_notional(balances.collateral, supply).unwrap());
    assert_eq!(
        notional_magnitude(collateral_unit, supply).unwrap(),
        balances.collateral
    );

    let debt_unit = external_unit(d, d.usdc);
    assert_eq!(debt_unit, debt_unit_from_notional(balances.borrow, supply).unwrap());
    if balances.borrow > 0 {
        assert_eq!(notional_magnitude(debt_unit, supply).unwrap(), balances.borrow);
    }
}

/// A second orchestrator, enabled and initialized on the basket but not yet
/// registered with the leverage module.
fn add_unregistered_module(d: &mut Deployment) -> Address {
    let mock = Address(0x777);
    d.chain.controller.add_module(mock);
    d.chain.add_module(d.basket, mock).unwrap();
    d.chain.initialize_module(d.basket, mock).unwrap();
    mock
}

fn add_mock_module(d: &mut Deployment) -> Address {
    let mock = add_unregistered_module(d);
    let (manager, basket) = (d.manager, d.basket);
    d.module
        .register_to_module(&mut d.chain, manager, basket, mock)
        .unwrap();
    mock
}

// ---------- initialize ----------

#[test]
fn initialize_binds_market_and_registers_hook() {
    let d = Deployment::wsteth_usdc().unwrap();

    assert_eq!(d.module.market_params(d.basket), Some(d.params));
    assert_eq!(
        d.chain.module_status(d.basket, d.module.address()),
        ModuleStatus::Initialized
    );
    assert_eq!(
        d.chain.registered_hooks(d.orchestrator, d.basket),
        vec![d.module.address()]
    );
    assert_eq!(d.module.lever_state(&d.chain, d.basket), LeverState::Initialized);
    assert!(matches!(
        d.module.events().last().unwrap().payload,
        EventPayload::ModuleInitialized(_)
    ));
}

#[test]
fn initialize_rejects_non_manager() {
    let mut d = Deployment::uninitialized().unwrap();
    let stranger = Address(0xbad);
    let err = d
        .module
        .initialize(&mut d.chain, stranger, d.basket, d.params)
        .unwrap_err();
    assert_eq!(err, LeverageError::NotManager { caller: stranger, basket: d.basket });
    assert_eq!(err.class(), ErrorClass::Authorization);
}

#[test]
fn initialize_rejects_unknown_basket() {
    let mut d = Deployment::uninitialized().unwrap();
    let unknown = Address(0x999);
    let err = d
        .module
        .initialize(&mut d.chain, d.manager, unknown, d.params)
        .unwrap_err();
    assert_eq!(err, LeverageError::BasketNotEnabled(unknown));
}

#[test]
fn initialize_twice_is_rejected() {
    let mut d = Deployment::wsteth_usdc().unwrap();
    let err = d
        .module
        .initialize(&mut d.chain, d.manager, d.basket, d.params)
        .unwrap_err();
    assert_eq!(err, LeverageError::NotPendingInitialization(d.basket));
}

#[test]
fn initialize_respects_allow_list() {
    let mut d = Deployment::uninitialized().unwrap();
    let owner = d.owner;
    d.module
        .update_allowed_basket(&d.chain, owner, d.basket, false)
        .unwrap();

    let err = d
        .module
        .initialize(&mut d.chain, d.manager, d.basket, d.params)
        .unwrap_err();
    assert_eq!(err, LeverageError::BasketNotAllowed(d.basket));

    d.module.update_any_basket_allowed(owner, true).unwrap();
    d.module
        .initialize(&mut d.chain, d.manager, d.basket, d.params)
        .unwrap();
}

#[test]
fn initialize_rejects_matching_assets() {
    let mut d = Deployment::uninitialized().unwrap();
    let params = MarketParams {
        collateral_asset: d.usdc,
        ..d.params
    };
    let err = d
        .module
        .initialize(&mut d.chain, d.manager, d.basket, params)
        .unwrap_err();
    assert_eq!(err, LeverageError::InvalidMarketParams(d.usdc));
}

#[test]
fn initialize_requires_registered_issuance_module() {
    let config = ModuleConfig {
        issuance_module_name: "UnknownIssuance".to_string(),
        ..ModuleConfig::default()
    };
    let mut d = Deployment::with_config(config).unwrap();
    let err = d
        .module
        .initialize(&mut d.chain, d.manager, d.basket, d.params)
        .unwrap_err();
    assert_eq!(
        err,
        LeverageError::InvalidIssuanceModule("UnknownIssuance".to_string())
    );
}

#[test]
fn initialize_requires_existing_market() {
    let mut d = Deployment::uninitialized().unwrap();
    let params = MarketParams {
        liquidation_threshold: 1,
        ..d.params
    };
    let err = d
        .module
        .initialize(&mut d.chain, d.manager, d.basket, params)
        .unwrap_err();
    assert_eq!(
        err,
        LeverageError::Lending(LendingError::MarketNotCreated(params.id()))
    );
    assert_eq!(
        d.chain.module_status(d.basket, d.module.address()),
        ModuleStatus::Pending
    );
}

// ---------- collateral ----------

#[test]
fn enter_moves_collateral_into_market() {
    let d = Deployment::entered().unwrap();
    let market = d.params.id();

    let positions = d.chain.positions_of(d.basket);
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].component, d.wsteth);
    assert_eq!(positions[0].kind, PositionKind::External);
    assert_eq!(positions[0].unit, Unit::new(PRECISE_UNIT as i128));

    assert_eq!(d.chain.position_of(market, d.basket).collateral, WSTETH);
    assert_eq!(d.chain.component_balance(d.basket, d.wsteth), 0);
    assert_eq!(d.module.lever_state(&d.chain, d.basket), LeverState::Collateralized);
    assert_aligned(&d);
}

#[test]
fn enter_twice_is_rejected() {
    let mut d = Deployment::entered().unwrap();
    let err = d.enter().unwrap_err();
    assert_eq!(err, LeverageError::CollateralAlreadyEntered(d.basket));
}

#[test]
fn lever_requires_entered_collateral() {
    let mut d = Deployment::wsteth_usdc().unwrap();
    let err = d.lever(1000 * USDC, 0).unwrap_err();
    assert_eq!(err, LeverageError::CollateralNotEntered(d.basket));
}

// ---------- lever ----------

#[test]
fn lever_borrows_swaps_and_supplies() {
    let mut d = Deployment::entered().unwrap();
    let result = d.lever(1000 * USDC, WSTETH / 4).unwrap();

    assert_eq!(result.borrowed, 1000 * USDC);
    assert_eq!(result.received, 333_333_333_333_333_333);
    assert_eq!(result.protocol_fee, 0);
    assert_eq!(result.collateral_unit, Unit::new(LEVERED_COLLATERAL_UNIT));
    assert_eq!(result.borrow_unit, Unit::new(-1_000_000_000));

    let positions = d.chain.positions_of(d.basket);
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].component, d.wsteth);
    assert_eq!(positions[1].component, d.usdc);
    assert_eq!(positions[1].kind, PositionKind::External);
    assert!(positions[1].unit.is_negative());

    assert_eq!(d.module.lever_state(&d.chain, d.basket), LeverState::Levered);
    assert_aligned(&d);
}

#[test]
fn lever_zero_quantity_is_rejected() {
    let mut d = Deployment::entered().unwrap();
    assert_eq!(d.lever(0, 0).unwrap_err(), LeverageError::ZeroQuantity);
}

#[test]
fn lever_with_unknown_adapter_fails() {
    let mut d = Deployment::entered().unwrap();
    let err = d
        .module
        .lever(&mut d.chain, d.manager, d.basket, 1000 * USDC, 0, "NoSuchDex", &[])
        .unwrap_err();
    assert_eq!(
        err,
        LeverageError::Exchange(ExchangeError::UnknownAdapter("NoSuchDex".to_string()))
    );
}

/// Encodes trades for the router but names someone else as the spender.
#[derive(Debug)]
struct MisroutedAdapter(FixedRateAdapter);

impl ExchangeAdapter for MisroutedAdapter {
    fn spender(&self) -> Address {
        Address(0xbad)
    }

    fn trade_calldata(&self, request: &TradeRequest) -> Result<TradeCall, ExchangeError> {
        self.0.trade_calldata(request)
    }
}

#[test]
fn lever_approves_exactly_the_send_quantity() {
    let mut d = Deployment::entered().unwrap();
    let router = d.chain.venue.router;
    d.lever(1000 * USDC, 0).unwrap();
    assert_eq!(d.chain.tokens.allowance(d.usdc, d.basket, router), 0);
}

#[test]
fn lever_reverts_when_adapter_spender_cannot_pull() {
    let mut d = Deployment::entered().unwrap();
    let router = d.chain.venue.router;
    d.chain.controller.set_exchange_adapter(
        d.module.address(),
        "Misrouted",
        Arc::new(MisroutedAdapter(FixedRateAdapter { router })),
    );
    let before = d.chain.positions_of(d.basket);

    let err = d
        .module
        .lever(&mut d.chain, d.manager, d.basket, 1000 * USDC, 0, "Misrouted", &[])
        .unwrap_err();
    assert!(matches!(err, LeverageError::Exchange(ExchangeError::ExecutionFailed(_))));
    assert_eq!(d.chain.positions_of(d.basket), before);
    assert_eq!(d.chain.tokens.allowance(d.usdc, d.basket, Address(0xbad)), 0);
}

#[test]
fn lever_by_non_manager_is_rejected() {
    let mut d = Deployment::entered().unwrap();
    let err = d
        .module
        .lever(&mut d.chain, d.owner, d.basket, 1000 * USDC, 0, SWAP_ADAPTER, &[])
        .unwrap_err();
    assert!(matches!(err, LeverageError::NotManager { .. }));
}

#[test]
fn slippage_failure_rolls_back_everything() {
    let mut d = Deployment::entered().unwrap();
    let positions_before = d.chain.positions_of(d.basket);
    let events_before = d.module.events().len();
    let market = d.params.id();

    let err = d.lever(1000 * USDC, WSTETH / 2).unwrap_err();
    assert!(matches!(err, LeverageError::SlippageTooHigh { .. }));
    assert!(err.is_retryable());

    assert_eq!(d.chain.positions_of(d.basket), positions_before);
    assert_eq!(d.chain.position_of(market, d.basket).borrow_shares, 0);
    assert_eq!(d.chain.component_balance(d.basket, d.usdc), 0);
    assert_eq!(d.module.events().len(), events_before);
}

#[test]
fn protocol_fee_goes_to_fee_recipient() {
    let mut d = Deployment::entered().unwrap();
    let module = d.module.address();
    d.chain.controller.set_fee(module, 0, Bps::new(100));
    let recipient = d.chain.controller.fee_recipient();

    let result = d.lever(1000 * USDC, 0).unwrap();
    assert_eq!(result.protocol_fee, 3_333_333_333_333_333);
    assert_eq!(result.collateral_supplied, result.received - result.protocol_fee);
    assert_eq!(
        d.chain.component_balance(recipient, d.wsteth),
        result.protocol_fee
    );
    assert_aligned(&d);
}

#[test]
fn protocol_fee_above_cap_is_rejected() {
    let mut d = Deployment::entered().unwrap();
    let module = d.module.address();
    d.chain.controller.set_fee(module, 0, Bps::new(600));

    let err = d.lever(1000 * USDC, 0).unwrap_err();
    assert_eq!(
        err,
        LeverageError::ProtocolFeeTooHigh { fee_bps: 600, cap_bps: 500 }
    );
}

// ---------- delever ----------

#[test]
fn partial_delever_repays_proceeds() {
    let mut d = Deployment::levered().unwrap();
    let result = d.delever(WSTETH / 20, 100 * USDC).unwrap();

    assert_eq!(result.collateral_withdrawn, WSTETH / 20);
    assert_eq!(result.received, 150 * USDC);
    assert_eq!(result.repaid, 150 * USDC);
    assert!(!result.fully_delevered);
    assert_eq!(result.borrow_unit, Unit::new(-850_000_000));
    assert_eq!(
        result.collateral_unit,
        Unit::new(LEVERED_COLLATERAL_UNIT - 50_000_000_000_000_000)
    );
    assert_aligned(&d);
}

#[test]
fn delever_below_minimum_is_rejected() {
    let mut d = Deployment::levered().unwrap();
    let err = d.delever(WSTETH / 20, 200 * USDC).unwrap_err();
    assert_eq!(
        err,
        LeverageError::SlippageTooHigh { received: 150 * USDC, minimum: 200 * USDC }
    );
}

#[test]
fn delever_past_the_debt_leaves_residual_loan_asset() {
    let mut d = Deployment::levered().unwrap();
    let result = d.delever(WSTETH / 2, 0).unwrap();

    assert_eq!(result.received, 1500 * USDC);
    assert_eq!(result.repaid, 1000 * USDC);
    assert!(result.fully_delevered);
    assert_eq!(result.borrow_unit, Unit::zero());
    assert_eq!(default_unit(&d, d.usdc), Unit::new(500_000_000));
    assert_eq!(d.module.lever_state(&d.chain, d.basket), LeverState::Collateralized);
}

#[test]
fn delever_to_zero_clears_debt() {
    let mut d = Deployment::levered().unwrap();
    let result = d
        .module
        .delever_to_zero_borrow_balance(
            &mut d.chain,
            d.manager,
            d.basket,
            WSTETH / 2,
            SWAP_ADAPTER,
            &[],
        )
        .unwrap();

    assert!(result.fully_delevered);
    assert_eq!(result.repaid, 1000 * USDC);
    assert_eq!(d.chain.position_of(d.params.id(), d.basket).borrow_shares, 0);

    let positions = d.chain.positions_of(d.basket);
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].component, d.wsteth);
    assert_eq!(positions[0].kind, PositionKind::External);
    assert_eq!(
        positions[0].unit,
        Unit::new(LEVERED_COLLATERAL_UNIT - 500_000_000_000_000_000)
    );
    assert_eq!(positions[1].component, d.usdc);
    assert_eq!(positions[1].kind, PositionKind::Default);
    assert_eq!(positions[1].unit, Unit::new(500_000_000));

    let fully = d
        .module
        .events()
        .iter()
        .any(|e| matches!(e.payload, EventPayload::FullyDelevered(_)));
    assert!(fully);
}

#[test]
fn delever_to_zero_without_debt_is_rejected() {
    let mut d = Deployment::entered().unwrap();
    let err = d
        .module
        .delever_to_zero_borrow_balance(&mut d.chain, d.manager, d.basket, WSTETH / 2, SWAP_ADAPTER, &[])
        .unwrap_err();
    assert_eq!(err, LeverageError::BorrowBalanceZero);
}

#[test]
fn delever_to_zero_needs_enough_proceeds() {
    let mut d = Deployment::levered().unwrap();
    let err = d
        .module
        .delever_to_zero_borrow_balance(
            &mut d.chain,
            d.manager,
            d.basket,
            WSTETH * 3 / 10,
            SWAP_ADAPTER,
            &[],
        )
        .unwrap_err();
    assert_eq!(
        err,
        LeverageError::SlippageTooHigh { received: 900 * USDC, minimum: 1000 * USDC }
    );
}

// ---------- issuance hooks ----------

#[test]
fn issue_hook_borrows_into_basket() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_mock_module(&mut d);
    assert_eq!(d.chain.component_balance(d.basket, d.usdc), 0);

    let borrowed = d
        .module
        .component_issue_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap();
    assert_eq!(borrowed, 100 * USDC);
    assert_eq!(d.chain.component_balance(d.basket, d.usdc), 100 * USDC);

    d.module.sync(&mut d.chain, d.basket).unwrap();
    assert_aligned(&d);
}

#[test]
fn issue_hook_ignores_equity() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_mock_module(&mut d);
    let borrowed = d
        .module
        .component_issue_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, true)
        .unwrap();
    assert_eq!(borrowed, 0);
    assert_eq!(d.chain.component_balance(d.basket, d.usdc), 0);
}

#[test]
fn issue_hook_rejects_collateral_component() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_mock_module(&mut d);
    let err = d
        .module
        .component_issue_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.wsteth, false)
        .unwrap_err();
    assert_eq!(
        err,
        LeverageError::DebtComponentMismatch { component: d.wsteth, expected: d.usdc }
    );
}

#[test]
fn issue_hook_requires_negative_debt_unit() {
    let mut d = Deployment::entered().unwrap();
    let mock = add_mock_module(&mut d);
    let err = d
        .module
        .component_issue_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap_err();
    assert_eq!(err, LeverageError::DebtUnitNotNegative(Unit::zero()));
}

#[test]
fn hooks_reject_non_module_caller() {
    let mut d = Deployment::levered().unwrap();
    let owner = d.owner;
    let err = d
        .module
        .component_issue_hook(&mut d.chain, owner, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap_err();
    assert_eq!(err, LeverageError::NotInitializedModule(owner));

    let err = d.module.module_issue_hook(&mut d.chain, owner, d.basket).unwrap_err();
    assert_eq!(err, LeverageError::NotInitializedModule(owner));
}

#[test]
fn hooks_reject_unregistered_module() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_unregistered_module(&mut d);

    let err = d
        .module
        .component_issue_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap_err();
    assert_eq!(
        err,
        LeverageError::UnregisteredIssuanceModule { caller: mock, basket: d.basket }
    );
    assert_eq!(err.class(), ErrorClass::Authorization);

    let err = d.module.module_redeem_hook(&mut d.chain, mock, d.basket).unwrap_err();
    assert!(matches!(err, LeverageError::UnregisteredIssuanceModule { .. }));
    assert_eq!(d.chain.component_balance(d.basket, d.usdc), 0);
}

#[test]
fn hooks_reject_disabled_module() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_mock_module(&mut d);
    d.chain.controller.remove_module(mock);

    let err = d
        .module
        .component_redeem_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap_err();
    assert_eq!(err, LeverageError::ModuleNotEnabled(mock));
}

#[test]
fn redeem_hook_repays_from_basket_balance() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_mock_module(&mut d);
    d.chain.tokens.mint(d.usdc, d.basket, 1000 * USDC);

    let repaid = d
        .module
        .component_redeem_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap();
    assert_eq!(repaid, 100 * USDC);
    assert_eq!(d.chain.component_balance(d.basket, d.usdc), 900 * USDC);

    d.module.sync(&mut d.chain, d.basket).unwrap();
    assert_aligned(&d);
}

#[test]
fn redeem_hook_is_capped_at_outstanding_debt() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_mock_module(&mut d);
    d.chain.tokens.mint(d.usdc, d.basket, 5000 * USDC);

    let repaid = d
        .module
        .component_redeem_hook(&mut d.chain, mock, d.basket, 2 * WSTETH, d.usdc, false)
        .unwrap();
    assert_eq!(repaid, 1000 * USDC);
    assert_eq!(d.chain.position_of(d.params.id(), d.basket).borrow_shares, 0);
}

#[test]
fn issue_then_redeem_nets_out() {
    let mut d = Deployment::levered().unwrap();
    let mock = add_mock_module(&mut d);
    let before = d
        .module
        .collateral_and_borrow_balances(&d.chain, d.basket)
        .unwrap();

    let borrowed = d
        .module
        .component_issue_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap();
    let repaid = d
        .module
        .component_redeem_hook(&mut d.chain, mock, d.basket, WSTETH / 10, d.usdc, false)
        .unwrap();

    assert_eq!(borrowed, repaid);
    let after = d
        .module
        .collateral_and_borrow_balances(&d.chain, d.basket)
        .unwrap();
    assert_eq!(after.borrow, before.borrow);
}

fn production_levered() -> Deployment {
    let mut d = Deployment::with_config(ModuleConfig::production()).unwrap();
    d.initialize().unwrap();
    d.enter().unwrap();
    d.lever(1000 * USDC, 0).unwrap();
    d
}

/// Debt unit equals the market debt at the basket's current supply.
fn assert_debt_aligned(d: &Deployment) {
    let supply = d.chain.total_supply(d.basket).unwrap();
    let balances = d
        .module
        .collateral_and_borrow_balances(&d.chain, d.basket)
        .unwrap();
    let debt_unit = external_unit(d, d.usdc);
    assert_eq!(debt_unit, debt_unit_from_notional(balances.borrow, supply).unwrap());
    assert_eq!(notional_magnitude(debt_unit, supply).unwrap(), balances.borrow);
}

#[test]
fn component_issue_hook_syncs_against_minted_supply() {
    let mut d = production_levered();
    let mock = add_mock_module(&mut d);
    let quantity = WSTETH / 10;

    let borrowed = d
        .module
        .component_issue_hook(&mut d.chain, mock, d.basket, quantity, d.usdc, false)
        .unwrap();
    assert_eq!(borrowed, 100 * USDC);
    assert_eq!(external_unit(&d, d.usdc), Unit::new(-1_000_000_000));
    assert_eq!(
        external_unit(&d, d.wsteth),
        Unit::new(LEVERED_COLLATERAL_UNIT)
    );

    // orchestrator: hand the borrowed USDC to the issuer, take equity in, mint
    let issuer = Address(0x999);
    d.chain.tokens.transfer(d.usdc, d.basket, issuer, borrowed).unwrap();
    let equity = notional_magnitude(Unit::new(LEVERED_COLLATERAL_UNIT), quantity).unwrap();
    d.chain.tokens.mint(d.wsteth, d.basket, equity);
    d.chain.set_total_supply(d.basket, WSTETH + quantity);

    assert_debt_aligned(&d);
    let balances = d
        .module
        .collateral_and_borrow_balances(&d.chain, d.basket)
        .unwrap();
    let collateral = notional_magnitude(external_unit(&d, d.wsteth), WSTETH + quantity).unwrap();
    assert_eq!(collateral, balances.collateral);
}

#[test]
fn component_redeem_hook_syncs_against_burned_supply() {
    let mut d = production_levered();
    let mock = add_mock_module(&mut d);
    let quantity = WSTETH / 2;
    // the redeemer pays its debt share in first
    d.chain.tokens.mint(d.usdc, d.basket, 500 * USDC);

    let repaid = d
        .module
        .component_redeem_hook(&mut d.chain, mock, d.basket, quantity, d.usdc, false)
        .unwrap();
    assert_eq!(repaid, 500 * USDC);
    assert_eq!(external_unit(&d, d.usdc), Unit::new(-1_000_000_000));

    d.chain.set_total_supply(d.basket, WSTETH - quantity);
    assert_debt_aligned(&d);
}

#[test]
fn component_redeem_hook_of_whole_supply_skips_sync() {
    let mut d = production_levered();
    let mock = add_mock_module(&mut d);
    d.chain.tokens.mint(d.usdc, d.basket, 1000 * USDC);
    let before = external_unit(&d, d.usdc);

    let repaid = d
        .module
        .component_redeem_hook(&mut d.chain, mock, d.basket, WSTETH, d.usdc, false)
        .unwrap();
    assert_eq!(repaid, 1000 * USDC);
    assert_eq!(external_unit(&d, d.usdc), before);
}

#[test]
fn module_hooks_sync_positions() {
    let mut d = Deployment::levered().unwrap();
    let orchestrator = d.orchestrator;
    let synced = d
        .module
        .module_issue_hook(&mut d.chain, orchestrator, d.basket)
        .unwrap()
        .unwrap();
    assert_eq!(synced.borrow_unit, Unit::new(-1_000_000_000));

    let synced = d
        .module
        .module_redeem_hook(&mut d.chain, orchestrator, d.basket)
        .unwrap();
    assert!(synced.is_some());
}

// ---------- sync ----------

#[test]
fn sync_tracks_accrued_interest() {
    let mut d = Deployment::levered().unwrap();
    // 1e-9 per second over 1e6 seconds is 0.1%
    d.chain.market.set_rate(&d.params, 1_000_000_000).unwrap();
    d.chain.market.advance(1_000_000);

    let synced = d.module.sync(&mut d.chain, d.basket).unwrap().unwrap();
    assert_eq!(synced.borrow_notional, 1001 * USDC);
    assert_eq!(synced.borrow_unit, Unit::new(-1_001_000_000));
    assert_aligned(&d);
}

#[test]
fn sync_after_liquidation() {
    let mut d = Deployment::levered().unwrap();
    let liquidator = Address(0x888);
    d.chain.tokens.mint(d.usdc, liquidator, 1000 * USDC);
    // 800 USDC per wstETH
    d.chain
        .market
        .set_price(d.params.oracle, 800_000_000_000_000_000_000_000_000);

    let params = d.params;
    d.chain
        .market
        .liquidate(
            &mut d.chain.tokens,
            &params,
            d.basket,
            WSTETH / 2,
            400_000_000_000_000,
            liquidator,
        )
        .unwrap();

    let synced = d.module.sync(&mut d.chain, d.basket).unwrap().unwrap();
    assert_eq!(synced.borrow_unit, Unit::new(-600_000_000));
    assert_eq!(
        synced.collateral_unit,
        Unit::new(LEVERED_COLLATERAL_UNIT - 500_000_000_000_000_000)
    );
    assert_aligned(&d);
}

#[test]
fn sync_requires_initialized_basket() {
    let mut d = Deployment::uninitialized().unwrap();
    let err = d.module.sync(&mut d.chain, d.basket).unwrap_err();
    assert_eq!(err, LeverageError::NotInitialized(d.basket));
}

// ---------- governance ----------

#[test]
fn register_to_second_issuance_module() {
    let mut d = Deployment::wsteth_usdc().unwrap();
    let second = Address(0x202);
    d.chain.controller.add_module(second);
    d.chain.add_module(d.basket, second).unwrap();

    let err = d
        .module
        .register_to_module(&mut d.chain, d.manager, d.basket, second)
        .unwrap_err();
    assert_eq!(err, LeverageError::IssuanceNotInitialized(second));

    d.chain.initialize_module(d.basket, second).unwrap();
    d.module
        .register_to_module(&mut d.chain, d.manager, d.basket, second)
        .unwrap();
    assert_eq!(
        d.chain.registered_hooks(second, d.basket),
        vec![d.module.address()]
    );
    assert_eq!(
        d.module.record(d.basket).unwrap().issuance_modules,
        vec![d.orchestrator, second]
    );
}

#[test]
fn removal_refused_while_levered() {
    let mut d = Deployment::levered().unwrap();
    let basket = d.basket;
    let err = d.module.remove_module(&mut d.chain, basket, basket).unwrap_err();
    assert!(matches!(err, LeverageError::BorrowOutstanding { .. }));
    assert!(d.module.record(basket).is_some());
}

#[test]
fn removal_must_come_from_basket() {
    let mut d = Deployment::entered().unwrap();
    let err = d
        .module
        .remove_module(&mut d.chain, d.manager, d.basket)
        .unwrap_err();
    assert_eq!(err, LeverageError::NotBasket { caller: d.manager, basket: d.basket });
}

#[test]
fn removal_restores_default_collateral() {
    let mut d = Deployment::entered().unwrap();
    let basket = d.basket;
    let withdrawn = d.module.remove_module(&mut d.chain, basket, basket).unwrap();
    assert_eq!(withdrawn, WSTETH);

    let positions = d.chain.positions_of(basket);
    assert_eq!(positions, vec![Position::default_position(d.wsteth, Unit::new(PRECISE_UNIT as i128))]);
    assert_eq!(d.chain.component_balance(basket, d.wsteth), WSTETH);
    assert!(d.chain.registered_hooks(d.orchestrator, basket).is_empty());
    assert_eq!(d.module.lever_state(&d.chain, basket), LeverState::Uninitialized);
}

#[test]
fn allow_list_is_owner_only() {
    let mut d = Deployment::uninitialized().unwrap();
    let err = d.module.update_any_basket_allowed(d.manager, true).unwrap_err();
    assert_eq!(err, LeverageError::NotOwner(d.manager));
    assert!(!d.module.allow_list().any_basket_allowed());
}
