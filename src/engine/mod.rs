// 8.0: leverage engine. binds baskets to a lending market, levers and delevers
// through exchange adapters, keeps the basket's external positions in line with
// market balances and answers the issuance hooks.
// deterministic; all external state sits behind the Host traits.

mod core;
mod governance;
mod hooks;
mod leverage;
mod results;
mod sync;
mod trade;

pub use self::core::{BasketRecord, LeverageModule};
pub use results::{
    DeleverResult, ErrorClass, LeverResult, LeverState, LeverageError, PositionBalances,
    SyncResult,
};
