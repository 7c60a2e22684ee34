// 8.0 engine/core.rs: the leverage module. per-basket market records, the allow list,
// the event log, and the transaction wrapper every mutating operation runs inside.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::results::{LeverState, LeverageError, PositionBalances};
use crate::allow_list::AllowList;
use crate::config::ModuleConfig;
use crate::events::{Event, EventId, EventPayload};
use crate::host::Host;
use crate::lending::{MarketId, MarketParams};
use crate::math::checked_add;
use crate::position::ModuleStatus;
use crate::types::{Address, Timestamp};

/// What the module remembers about one initialized basket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasketRecord {
    pub params: MarketParams,
    pub market_id: MarketId,
    /// collateral moved from a Default position into the market
    pub collateral_entered: bool,
    /// debt-issuance orchestrators this module registered its hooks with
    pub issuance_modules: Vec<Address>,
}

/** 8.1: module state. positions themselves live on the ledger, not here */
#[derive(Debug, Clone)]
pub struct LeverageModule {
    pub(super) address: Address,
    pub(super) owner: Address,
    pub(super) config: ModuleConfig,
    pub(super) baskets: HashMap<Address, BasketRecord>,
    pub(super) allow_list: AllowList,
    pub(super) entered: HashSet<Address>,
    pub(super) events: Vec<Event>,
    pub(super) pending_events: Vec<EventPayload>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl LeverageModule {
    pub fn new(address: Address, owner: Address, config: ModuleConfig) -> Self {
        Self {
            address,
            owner,
            config,
            baskets: HashMap::new(),
            allow_list: AllowList::new(),
            entered: HashSet::new(),
            events: Vec::new(),
            pending_events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn record(&self, basket: Address) -> Option<&BasketRecord> {
        self.baskets.get(&basket)
    }

    /// Market parameters stored for `basket` at initialization.
    pub fn market_params(&self, basket: Address) -> Option<MarketParams> {
        self.baskets.get(&basket).map(|record| record.params)
    }

    pub fn lever_state<H: Host>(&self, env: &H, basket: Address) -> LeverState {
        let Some(record) = self.baskets.get(&basket) else {
            return LeverState::Uninitialized;
        };
        if !record.collateral_entered {
            return LeverState::Initialized;
        }
        if env.position_of(record.market_id, basket).borrow_shares > 0 {
            LeverState::Levered
        } else {
            LeverState::Collateralized
        }
    }

    /// Collateral and debt backing the basket, without accruing interest first.
    pub fn collateral_and_borrow_balances<H: Host>(
        &self,
        env: &H,
        basket: Address,
    ) -> Result<PositionBalances, LeverageError> {
        let record = self
            .baskets
            .get(&basket)
            .ok_or(LeverageError::NotInitialized(basket))?;
        self.read_balances(env, basket, record)
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // 8.2: balances straight from the market and the basket's wallet

    pub(super) fn read_balances<H: Host>(
        &self,
        env: &H,
        basket: Address,
        record: &BasketRecord,
    ) -> Result<PositionBalances, LeverageError> {
        let lending = env.position_of(record.market_id, basket);
        let state = env.market_state(record.market_id)?;
        let borrow = state.borrow_assets(lending.borrow_shares)?;
        let held = env.component_balance(basket, record.params.collateral_asset);
        let collateral = checked_add(held, lending.collateral)?;

        Ok(PositionBalances {
            collateral,
            borrow,
            borrow_shares: lending.borrow_shares,
        })
    }

    // 8.3: caller validation

    /// Basket created through the controller and `caller` is its manager.
    pub(super) fn only_manager<H: Host>(
        &self,
        env: &H,
        caller: Address,
        basket: Address,
    ) -> Result<(), LeverageError> {
        if !env.is_basket_enabled(basket) {
            return Err(LeverageError::BasketNotEnabled(basket));
        }
        if env.manager(basket)? != caller {
            return Err(LeverageError::NotManager { caller, basket });
        }
        Ok(())
    }

    /// The module is initialized on `basket` and holds a market record for it.
    pub(super) fn initialized_record<H: Host>(
        &self,
        env: &H,
        basket: Address,
    ) -> Result<BasketRecord, LeverageError> {
        if env.module_status(basket, self.address) != ModuleStatus::Initialized {
            return Err(LeverageError::NotInitialized(basket));
        }
        self.baskets
            .get(&basket)
            .cloned()
            .ok_or(LeverageError::NotInitialized(basket))
    }

    /// Hooks may only be called by a module that is initialized on the basket,
    /// enabled on the controller and registered with this module for the basket.
    pub(super) fn only_module<H: Host>(
        &self,
        env: &H,
        caller: Address,
        basket: Address,
    ) -> Result<(), LeverageError> {
        if env.module_status(basket, caller) != ModuleStatus::Initialized {
            return Err(LeverageError::NotInitializedModule(caller));
        }
        if !env.is_module_enabled(caller) {
            return Err(LeverageError::ModuleNotEnabled(caller));
        }
        if let Some(record) = self.baskets.get(&basket) {
            if !record.issuance_modules.contains(&caller) {
                return Err(LeverageError::UnregisteredIssuanceModule { caller, basket });
            }
        }
        Ok(())
    }

    // 8.4: atomicity. the operation runs against a staged copy of the host; the copy
    // replaces the original only on success. records and events roll back with it.

    pub(super) fn transact<H, T, F>(
        &mut self,
        env: &mut H,
        basket: Address,
        operation: &'static str,
        op: F,
    ) -> Result<T, LeverageError>
    where
        H: Host,
        F: FnOnce(&mut Self, &mut H) -> Result<T, LeverageError>,
    {
        if !self.entered.insert(basket) {
            return Err(LeverageError::Reentrancy(basket));
        }

        let records = self.baskets.clone();
        let mut staged = env.clone();
        let result = op(self, &mut staged);

        match &result {
            Ok(_) => {
                *env = staged;
                self.flush_events();
            }
            Err(err) => {
                warn!(%basket, operation, error = %err, "operation reverted");
                self.baskets = records;
                self.pending_events.clear();
            }
        }

        self.entered.remove(&basket);
        result
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        self.pending_events.push(payload);
    }

    pub(super) fn flush_events(&mut self) {
        let pending = std::mem::take(&mut self.pending_events);
        for payload in pending {
            let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
            self.next_event_id += 1;
            debug!(id = event.id.0, payload = ?event.payload, "event");
            self.events.push(event);
        }

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
