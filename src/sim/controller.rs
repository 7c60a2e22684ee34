//! Simulated protocol controller and integration registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::exchange::ExchangeAdapter;
use crate::types::{Address, Bps};

#[derive(Debug, Clone)]
pub struct SimController {
    modules: HashSet<Address>,
    baskets: HashSet<Address>,
    fees: HashMap<(Address, usize), Bps>,
    fee_recipient: Address,
    integrations: HashMap<(Address, String), Address>,
    adapters: HashMap<(Address, String), Arc<dyn ExchangeAdapter>>,
}

impl SimController {
    pub fn new(fee_recipient: Address) -> Self {
        Self {
            modules: HashSet::new(),
            baskets: HashSet::new(),
            fees: HashMap::new(),
            fee_recipient,
            integrations: HashMap::new(),
            adapters: HashMap::new(),
        }
    }

    pub fn add_module(&mut self, module: Address) {
        self.modules.insert(module);
    }

    pub fn remove_module(&mut self, module: Address) {
        self.modules.remove(&module);
    }

    pub fn add_basket(&mut self, basket: Address) {
        self.baskets.insert(basket);
    }

    pub fn set_fee(&mut self, module: Address, index: usize, fee: Bps) {
        self.fees.insert((module, index), fee);
    }

    pub fn set_integration(&mut self, module: Address, name: &str, target: Address) {
        self.integrations.insert((module, name.to_string()), target);
    }

    pub fn set_exchange_adapter(&mut self, module: Address, name: &str, adapter: Arc<dyn ExchangeAdapter>) {
        self.adapters.insert((module, name.to_string()), adapter);
    }

    pub fn module_enabled(&self, module: Address) -> bool {
        self.modules.contains(&module)
    }

    pub fn basket_enabled(&self, basket: Address) -> bool {
        self.baskets.contains(&basket)
    }

    pub fn fee(&self, module: Address, index: usize) -> Bps {
        self.fees.get(&(module, index)).copied().unwrap_or_else(Bps::zero)
    }

    pub fn fee_recipient(&self) -> Address {
        self.fee_recipient
    }

    pub fn integration(&self, module: Address, name: &str) -> Option<Address> {
        self.integrations.get(&(module, name.to_string())).copied()
    }

    pub fn exchange_adapter(&self, module: Address, name: &str) -> Option<Arc<dyn ExchangeAdapter>> {
        self.adapters.get(&(module, name.to_string())).cloned()
    }
}
