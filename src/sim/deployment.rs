// 12.1 sim/deployment.rs: a wstETH / USDC deployment. one basket token of 1e18 supply
// holding one wstETH per token, a market with 86% liquidation threshold priced at
// 3000 USDC per wstETH, and a swap venue quoting the same price both ways.

use std::sync::Arc;

use super::dex::FixedRateAdapter;
use super::SimChain;
use crate::config::{ModuleConfig, DEFAULT_ISSUANCE_MODULE_NAME};
use crate::engine::{LeverageError, LeverageModule};
use crate::lending::MarketParams;
use crate::position::{LedgerError, PositionLedger};
use crate::types::{Address, Amount, Unit, PRECISE_UNIT};

/// Name the swap adapter is registered under for the module.
pub const SWAP_ADAPTER: &str = "FixedRateSwap";

pub const USDC: Address = Address(0x1);
pub const WSTETH: Address = Address(0x2);
pub const ORACLE: Address = Address(0x3);
pub const RATE_MODEL: Address = Address(0x4);
pub const MARKET: Address = Address(0x100);
pub const ROUTER: Address = Address(0x101);
pub const FEE_RECIPIENT: Address = Address(0x102);
pub const MODULE: Address = Address(0x200);
pub const ORCHESTRATOR: Address = Address(0x201);
pub const OWNER: Address = Address(0x300);
pub const MANAGER: Address = Address(0x301);
pub const LENDER: Address = Address(0x302);
pub const BASKET: Address = Address(0x400);

const USDC_UNIT: Amount = 1_000_000;
/// 3000 USDC per wstETH, in loan-asset base units per collateral base unit, 1e36 scaled.
pub const WSTETH_PRICE: u128 = 3_000_000_000_000_000_000_000_000_000;
pub const LIQUIDATION_THRESHOLD: u128 = 860_000_000_000_000_000;
pub const LENDER_LIQUIDITY: Amount = 1_000_000 * USDC_UNIT;

#[derive(Debug, Clone)]
pub struct Deployment {
    pub chain: SimChain,
    pub module: LeverageModule,
    pub basket: Address,
    pub manager: Address,
    pub owner: Address,
    pub orchestrator: Address,
    pub params: MarketParams,
    pub wsteth: Address,
    pub usdc: Address,
}

impl Deployment {
    /// Everything wired up and allow-listed; the module is still pending on the basket.
    pub fn uninitialized() -> Result<Self, LeverageError> {
        Self::with_config(ModuleConfig::default())
    }

    pub fn with_config(config: ModuleConfig) -> Result<Self, LeverageError> {
        let mut chain = SimChain::new(MARKET, ROUTER, FEE_RECIPIENT);
        chain.tokens.register(USDC, 6);
        chain.tokens.register(WSTETH, 18);

        let params = MarketParams {
            loan_asset: USDC,
            collateral_asset: WSTETH,
            oracle: ORACLE,
            interest_rate_model: RATE_MODEL,
            liquidation_threshold: LIQUIDATION_THRESHOLD,
        };
        chain.market.create_market(params, 0);
        chain.market.set_price(ORACLE, WSTETH_PRICE);
        chain.tokens.mint(USDC, LENDER, LENDER_LIQUIDITY);
        chain
            .market
            .supply(&mut chain.tokens, &params, LENDER, LENDER_LIQUIDITY)?;

        // 1 wstETH = 3000 USDC, scaled across 18 vs 6 decimals
        chain.venue.set_rate(USDC, WSTETH, 1_000_000_000_000, 3000);
        chain.venue.set_rate(WSTETH, USDC, 3000, 1_000_000_000_000);

        chain.controller.add_module(MODULE);
        chain.controller.add_module(ORCHESTRATOR);
        chain
            .controller
            .set_integration(MODULE, DEFAULT_ISSUANCE_MODULE_NAME, ORCHESTRATOR);
        chain.controller.set_exchange_adapter(
            MODULE,
            SWAP_ADAPTER,
            Arc::new(FixedRateAdapter { router: ROUTER }),
        );

        let one = i128::try_from(PRECISE_UNIT).map_err(|_| LedgerError::CallFailed("unit".into()))?;
        chain.create_basket(BASKET, MANAGER, PRECISE_UNIT, &[(WSTETH, Unit::new(one))])?;
        chain.add_module(BASKET, ORCHESTRATOR)?;
        chain.initialize_module(BASKET, ORCHESTRATOR)?;
        chain.add_module(BASKET, MODULE)?;

        let mut module = LeverageModule::new(MODULE, OWNER, config);
        module.update_allowed_basket(&chain, OWNER, BASKET, true)?;

        Ok(Self {
            chain,
            module,
            basket: BASKET,
            manager: MANAGER,
            owner: OWNER,
            orchestrator: ORCHESTRATOR,
            params,
            wsteth: WSTETH,
            usdc: USDC,
        })
    }

    /// Module initialized on the basket; collateral still a Default position.
    pub fn wsteth_usdc() -> Result<Self, LeverageError> {
        let mut deployment = Self::uninitialized()?;
        deployment.initialize()?;
        Ok(deployment)
    }

    /// Collateral supplied to the market.
    pub fn entered() -> Result<Self, LeverageError> {
        let mut deployment = Self::wsteth_usdc()?;
        deployment.enter()?;
        Ok(deployment)
    }

    /// Levered by 1000 USDC per token.
    pub fn levered() -> Result<Self, LeverageError> {
        let mut deployment = Self::entered()?;
        deployment.lever(1000 * USDC_UNIT, 0)?;
        Ok(deployment)
    }

    pub fn initialize(&mut self) -> Result<(), LeverageError> {
        self.module
            .initialize(&mut self.chain, self.manager, self.basket, self.params)
    }

    pub fn enter(&mut self) -> Result<(), LeverageError> {
        self.module
            .enter_collateral_position(&mut self.chain, self.manager, self.basket)
            .map(|_| ())
    }

    pub fn lever(
        &mut self,
        borrow_units: Amount,
        min_receive_units: Amount,
    ) -> Result<crate::engine::LeverResult, LeverageError> {
        self.module.lever(
            &mut self.chain,
            self.manager,
            self.basket,
            borrow_units,
            min_receive_units,
            SWAP_ADAPTER,
            &[],
        )
    }

    pub fn delever(
        &mut self,
        redeem_units: Amount,
        min_repay_units: Amount,
    ) -> Result<crate::engine::DeleverResult, LeverageError> {
        self.module.delever(
            &mut self.chain,
            self.manager,
            self.basket,
            redeem_units,
            min_repay_units,
            SWAP_ADAPTER,
            &[],
        )
    }
}
