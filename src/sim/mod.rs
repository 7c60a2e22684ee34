// 12.0: in-memory chain for the simulator and the tests. one struct implements every
// Host trait over simple models of the tokens, baskets, lending market, swap venue
// and controller. cloning it is a full snapshot.

mod basket;
mod controller;
mod deployment;
mod dex;
mod market;
mod tokens;

use std::collections::HashMap;
use std::sync::Arc;

pub use basket::BasketToken;
pub use controller::SimController;
pub use deployment::{Deployment, SWAP_ADAPTER};
pub use dex::{FixedRateAdapter, FixedRateVenue, SwapOrder};
pub use market::{SimMarket, ORACLE_PRICE_SCALE};
pub use tokens::TokenBook;

use crate::controller::{Controller, DebtIssuance};
use crate::exchange::{ExchangeAdapter, ExchangeError, ExchangeRegistry, TradeCall, TradeExecutor};
use crate::lending::{
    LendingError, LendingMarket, LendingPosition, MarketId, MarketParams, MarketState, Movement,
    RepayAmount,
};
use crate::position::{LedgerError, ModuleStatus, Position, PositionLedger};
use crate::types::{Address, Amount, Bps, Unit};

#[derive(Debug, Clone)]
pub struct SimChain {
    pub tokens: TokenBook,
    pub market: SimMarket,
    pub controller: SimController,
    pub venue: FixedRateVenue,
    baskets: HashMap<Address, BasketToken>,
    hooks: HashMap<(Address, Address), Vec<Address>>,
}

impl SimChain {
    pub fn new(market: Address, router: Address, fee_recipient: Address) -> Self {
        Self {
            tokens: TokenBook::new(),
            market: SimMarket::new(market),
            controller: SimController::new(fee_recipient),
            venue: FixedRateVenue::new(router),
            baskets: HashMap::new(),
            hooks: HashMap::new(),
        }
    }

    /// Creates a controller-enabled basket holding `supply` tokens, funded with the
    /// notional of each Default component.
    pub fn create_basket(
        &mut self,
        address: Address,
        manager: Address,
        supply: Amount,
        components: &[(Address, Unit)],
    ) -> Result<(), LedgerError> {
        let mut basket = BasketToken::new(address, manager, supply);
        for (component, unit) in components {
            if unit.is_negative() {
                return Err(LedgerError::NegativeDefaultUnit(*unit));
            }
            let notional = crate::position::notional_magnitude_ceil(*unit, supply)
                .map_err(|e| LedgerError::CallFailed(e.to_string()))?;
            self.tokens.mint(*component, address, notional);
            basket.set_default(*component, *unit);
        }
        self.baskets.insert(address, basket);
        self.controller.add_basket(address);
        Ok(())
    }

    /// Basket-side `addModule`: the module becomes pending.
    pub fn add_module(&mut self, basket: Address, module: Address) -> Result<(), LedgerError> {
        self.basket_mut(basket)?
            .set_module_status(module, ModuleStatus::Pending);
        Ok(())
    }

    /// Basket-side `removeModule` bookkeeping once the module has cleaned up.
    pub fn detach_module(&mut self, basket: Address, module: Address) -> Result<(), LedgerError> {
        self.basket_mut(basket)?
            .set_module_status(module, ModuleStatus::None);
        Ok(())
    }

    pub fn set_total_supply(&mut self, basket: Address, supply: Amount) {
        if let Some(basket) = self.baskets.get_mut(&basket) {
            basket.total_supply = supply;
        }
    }

    pub fn positions_of(&self, basket: Address) -> Vec<Position> {
        self.baskets
            .get(&basket)
            .map(BasketToken::positions)
            .unwrap_or_default()
    }

    pub fn registered_hooks(&self, orchestrator: Address, basket: Address) -> Vec<Address> {
        self.hooks
            .get(&(orchestrator, basket))
            .cloned()
            .unwrap_or_default()
    }

    fn basket(&self, basket: Address) -> Result<&BasketToken, LedgerError> {
        self.baskets.get(&basket).ok_or(LedgerError::BasketNotFound(basket))
    }

    fn basket_mut(&mut self, basket: Address) -> Result<&mut BasketToken, LedgerError> {
        self.baskets
            .get_mut(&basket)
            .ok_or(LedgerError::BasketNotFound(basket))
    }
}

impl PositionLedger for SimChain {
    fn total_supply(&self, basket: Address) -> Result<Amount, LedgerError> {
        Ok(self.basket(basket)?.total_supply)
    }

    fn positions(&self, basket: Address) -> Result<Vec<Position>, LedgerError> {
        Ok(self.basket(basket)?.positions())
    }

    fn default_position_unit(&self, basket: Address, component: Address) -> Result<Unit, LedgerError> {
        Ok(self.basket(basket)?.default_unit(component))
    }

    fn external_position_unit(
        &self,
        basket: Address,
        component: Address,
        module: Address,
    ) -> Result<Unit, LedgerError> {
        Ok(self.basket(basket)?.external_unit(component, module))
    }

    fn edit_default_position(
        &mut self,
        basket: Address,
        component: Address,
        unit: Unit,
    ) -> Result<(), LedgerError> {
        if unit.is_negative() {
            return Err(LedgerError::NegativeDefaultUnit(unit));
        }
        self.basket_mut(basket)?.set_default(component, unit);
        Ok(())
    }

    fn edit_external_position(
        &mut self,
        basket: Address,
        component: Address,
        module: Address,
        unit: Unit,
    ) -> Result<(), LedgerError> {
        self.basket_mut(basket)?.set_external(component, module, unit);
        Ok(())
    }

    fn component_balance(&self, basket: Address, asset: Address) -> Amount {
        self.tokens.balance_of(asset, basket)
    }

    fn invoke_transfer(
        &mut self,
        basket: Address,
        asset: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.basket(basket)?;
        self.tokens.transfer(asset, basket, to, amount)
    }

    fn invoke_approve(
        &mut self,
        basket: Address,
        asset: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.basket(basket)?;
        self.tokens.approve(asset, basket, spender, amount);
        Ok(())
    }

    fn manager(&self, basket: Address) -> Result<Address, LedgerError> {
        Ok(self.basket(basket)?.manager)
    }

    fn module_status(&self, basket: Address, module: Address) -> ModuleStatus {
        self.baskets
            .get(&basket)
            .map(|b| b.module_status(module))
            .unwrap_or(ModuleStatus::None)
    }

    fn initialize_module(&mut self, basket: Address, module: Address) -> Result<(), LedgerError> {
        let token = self.basket_mut(basket)?;
        if token.module_status(module) != ModuleStatus::Pending {
            return Err(LedgerError::ModuleNotPending(module));
        }
        token.set_module_status(module, ModuleStatus::Initialized);
        Ok(())
    }
}

impl LendingMarket for SimChain {
    fn accrue_interest(&mut self, params: &MarketParams) -> Result<(), LendingError> {
        self.market.accrue(params)
    }

    fn supply_collateral(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        amount: Amount,
    ) -> Result<(), LendingError> {
        self.market
            .supply_collateral(&mut self.tokens, params, on_behalf, amount)
    }

    fn withdraw_collateral(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        amount: Amount,
        receiver: Address,
    ) -> Result<(), LendingError> {
        self.market
            .withdraw_collateral(&mut self.tokens, params, on_behalf, amount, receiver)
    }

    fn borrow(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        assets: Amount,
        receiver: Address,
    ) -> Result<Movement, LendingError> {
        self.market
            .borrow(&mut self.tokens, params, on_behalf, assets, receiver)
    }

    fn repay(
        &mut self,
        params: &MarketParams,
        on_behalf: Address,
        amount: RepayAmount,
    ) -> Result<Movement, LendingError> {
        self.market.repay(&mut self.tokens, params, on_behalf, amount)
    }

    fn position_of(&self, market: MarketId, account: Address) -> LendingPosition {
        self.market.position(market, account)
    }

    fn market_state(&self, market: MarketId) -> Result<MarketState, LendingError> {
        self.market.state(market)
    }
}

impl ExchangeRegistry for SimChain {
    fn exchange_adapter(&self, module: Address, name: &str) -> Option<Arc<dyn ExchangeAdapter>> {
        self.controller.exchange_adapter(module, name)
    }
}

impl TradeExecutor for SimChain {
    fn execute_trade(&mut self, basket: Address, call: &TradeCall) -> Result<(), ExchangeError> {
        if !self.baskets.contains_key(&basket) {
            return Err(ExchangeError::ExecutionFailed(format!("unknown basket {basket}")));
        }
        self.venue.swap(&mut self.tokens, basket, call)?;
        Ok(())
    }
}

impl Controller for SimChain {
    fn is_module_enabled(&self, module: Address) -> bool {
        self.controller.module_enabled(module)
    }

    fn is_basket_enabled(&self, basket: Address) -> bool {
        self.controller.basket_enabled(basket)
    }

    fn module_fee(&self, module: Address, fee_index: usize) -> Bps {
        self.controller.fee(module, fee_index)
    }

    fn fee_recipient(&self) -> Address {
        self.controller.fee_recipient()
    }

    fn integration(&self, module: Address, name: &str) -> Option<Address> {
        self.controller.integration(module, name)
    }
}

impl DebtIssuance for SimChain {
    fn register_hook(
        &mut self,
        orchestrator: Address,
        basket: Address,
        hook: Address,
    ) -> Result<(), LedgerError> {
        if self.module_status(basket, orchestrator) != ModuleStatus::Initialized {
            return Err(LedgerError::HookRegistration(orchestrator));
        }
        let hooks = self.hooks.entry((orchestrator, basket)).or_default();
        if !hooks.contains(&hook) {
            hooks.push(hook);
        }
        Ok(())
    }

    fn unregister_hook(
        &mut self,
        orchestrator: Address,
        basket: Address,
        hook: Address,
    ) -> Result<(), LedgerError> {
        let hooks = self
            .hooks
            .get_mut(&(orchestrator, basket))
            .ok_or(LedgerError::HookRegistration(orchestrator))?;
        let before = hooks.len();
        hooks.retain(|registered| *registered != hook);
        if hooks.len() == before {
            return Err(LedgerError::HookRegistration(orchestrator));
        }
        Ok(())
    }
}
