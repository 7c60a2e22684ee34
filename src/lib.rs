// basket-leverage: leveraged positions for basket tokens on an isolated lending market.
// the module supplies basket collateral, borrows against it, swaps through exchange
// adapters and keeps the basket's per-token positions equal to market balances.
// all computation is deterministic; collaborators sit behind the Host traits.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, Amount, Unit, Bps, Timestamp
//   2.x  math.rs: 256-bit mul-div, precise (1e18) math
//   3.x  shares.rs: virtual-share asset <-> share conversion
//   4.x  position.rs: position ledger interface, unit <-> notional, write adapter
//        lending.rs: lending market interface, market params and id
//        exchange.rs: adapter registry and trade calls
//   5.x  controller.rs: protocol controller and debt-issuance interfaces
//        host.rs: the collaborator bundle
//   6.x  allow_list.rs: which baskets may initialize
//   7.x  config.rs: module settings, env presets, file/env loading
//   8.x  engine/: governance, lever/delever, sync, issuance hooks
//   11.x events.rs: state transition events for audit
//   12.x sim/: in-memory chain for the simulator and tests

// primitives and math
pub mod math;
pub mod shares;
pub mod types;

// collaborator interfaces
pub mod controller;
pub mod exchange;
pub mod host;
pub mod lending;
pub mod position;

// the module
pub mod allow_list;
pub mod config;
pub mod engine;
pub mod events;

// simulated chain
pub mod sim;

// re exports for convenience
pub use engine::*;
pub use events::*;
pub use lending::*;
pub use position::*;
pub use types::*;
pub use allow_list::AllowList;
pub use crate::config::{ConfigError, Environment, ModuleConfig, DEFAULT_ISSUANCE_MODULE_NAME};
pub use controller::{Controller, DebtIssuance};
pub use exchange::{
    resolve_adapter, ExchangeAdapter, ExchangeError, ExchangeRegistry, ResolvedAdapter, TradeCall,
    TradeExecutor, TradeRequest,
};
pub use host::Host;
pub use math::MathError;
pub use shares::Rounding;
