// 6.0 allow_list.rs: which baskets may initialize the module. read once, at initialize.
// every mutation bumps the version so callers can tell the table changed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Address;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowList {
    allowed: HashMap<Address, bool>,
    any_basket_allowed: bool,
    version: u64,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_allowed(&mut self, basket: Address, status: bool) {
        self.allowed.insert(basket, status);
        self.version += 1;
    }

    pub fn set_any_basket_allowed(&mut self, any: bool) {
        self.any_basket_allowed = any;
        self.version += 1;
    }

    pub fn is_listed(&self, basket: Address) -> bool {
        self.allowed.get(&basket).copied().unwrap_or(false)
    }

    pub fn any_basket_allowed(&self) -> bool {
        self.any_basket_allowed
    }

    /// Listed, or the global override is on.
    pub fn permits(&self, basket: Address) -> bool {
        self.any_basket_allowed || self.is_listed(basket)
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
