// 8.5 engine/trade.rs: action sizing, trade execution through an adapter, protocol fee.
// received amounts are always measured as a balance diff on the basket.

use tracing::debug;

use super::core::LeverageModule;
use super::results::LeverageError;
use crate::exchange::{resolve_adapter, ResolvedAdapter, TradeRequest};
use crate::host::Host;
use crate::math::{precise_mul, precise_mul_ceil};
use crate::types::{Address, Amount};

/// One lever or delever, sized in notional terms.
#[derive(Debug, Clone)]
pub(super) struct ActionInfo {
    pub basket: Address,
    pub adapter: ResolvedAdapter,
    pub send_asset: Address,
    pub receive_asset: Address,
    pub total_supply: Amount,
    pub notional_send: Amount,
    pub min_notional_receive: Amount,
    pub pre_trade_receive_balance: Amount,
}

impl LeverageModule {
    /// Scales per-token quantities by the basket's supply. The send side rounds
    /// down and the minimum receive rounds up.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn action_info<H: Host>(
        &self,
        env: &H,
        basket: Address,
        send_asset: Address,
        receive_asset: Address,
        send_units: Amount,
        min_receive_units: Amount,
        adapter_name: &str,
    ) -> Result<ActionInfo, LeverageError> {
        let total_supply = env.total_supply(basket)?;
        let notional_send = precise_mul(send_units, total_supply)?;
        let min_notional_receive = precise_mul_ceil(min_receive_units, total_supply)?;

        self.action_info_notional(
            env,
            basket,
            send_asset,
            receive_asset,
            notional_send,
            min_notional_receive,
            adapter_name,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn action_info_notional<H: Host>(
        &self,
        env: &H,
        basket: Address,
        send_asset: Address,
        receive_asset: Address,
        notional_send: Amount,
        min_notional_receive: Amount,
        adapter_name: &str,
    ) -> Result<ActionInfo, LeverageError> {
        if notional_send == 0 {
            return Err(LeverageError::ZeroQuantity);
        }

        let adapter = resolve_adapter(env, self.address, adapter_name)?;
        let total_supply = env.total_supply(basket)?;

        Ok(ActionInfo {
            basket,
            adapter,
            send_asset,
            receive_asset,
            total_supply,
            notional_send,
            min_notional_receive,
            pre_trade_receive_balance: env.component_balance(basket, receive_asset),
        })
    }

    /// Runs the swap and returns what actually arrived on the basket.
    pub(super) fn execute_trade<H: Host>(
        &self,
        env: &mut H,
        action: &ActionInfo,
        route: &[u8],
    ) -> Result<Amount, LeverageError> {
        let request = TradeRequest {
            send_asset: action.send_asset,
            receive_asset: action.receive_asset,
            recipient: action.basket,
            send_quantity: action.notional_send,
            min_receive_quantity: action.min_notional_receive,
            route: route.to_vec(),
        };

        let spender = action.adapter.adapter.spender();
        env.invoke_approve(action.basket, action.send_asset, spender, action.notional_send)?;
        let call = action.adapter.adapter.trade_calldata(&request)?;
        env.execute_trade(action.basket, &call)?;

        let post_trade = env.component_balance(action.basket, action.receive_asset);
        let received = post_trade
            .checked_sub(action.pre_trade_receive_balance)
            .unwrap_or(0);

        if received < action.min_notional_receive {
            return Err(LeverageError::SlippageTooHigh {
                received,
                minimum: action.min_notional_receive,
            });
        }

        debug!(
            basket = %action.basket,
            adapter = %action.adapter.name,
            sent = action.notional_send,
            received,
            "trade executed"
        );
        Ok(received)
    }

    /// Sends the controller's cut of `amount` to the fee recipient and returns it.
    pub(super) fn accrue_protocol_fee<H: Host>(
        &self,
        env: &mut H,
        basket: Address,
        asset: Address,
        amount: Amount,
    ) -> Result<Amount, LeverageError> {
        let rate = env.module_fee(self.address, self.config.protocol_fee_index);
        if rate.value() > self.config.max_protocol_fee_bps {
            return Err(LeverageError::ProtocolFeeTooHigh {
                fee_bps: rate.value(),
                cap_bps: self.config.max_protocol_fee_bps,
            });
        }

        let fee = rate.apply(amount)?;
        if fee > 0 {
            let recipient = env.fee_recipient();
            env.invoke_transfer(basket, asset, recipient, fee)?;
        }
        Ok(fee)
    }
}
