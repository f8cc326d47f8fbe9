use async_trait::async_trait;
use ethers::{
    abi::Token,
    providers::{Http, Middleware, Provider},
    types::{Address, Bytes, U256},
};
use std::sync::Arc;

use crate::{
    config::Config,
    constants::{DEFAULT_SWAP_DEADLINE_SECS, SINGLE_HOP_GAS_ESTIMATE, WRAPPED_NATIVE_SYMBOL},
    error::{AppError, Result},
    models::{SwapInstruction, SwapRoute, TokenDescriptor},
    services::{onchain::encode_call, token_registry::TokenRegistry},
    utils::{format_token_amount, parse_address},
};

ethers::contract::abigen!(
    UniswapQuoter,
    r#"[
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint24 fee, uint256 amountIn, uint160 sqrtPriceLimitX96) returns (uint256 amountOut)
    ]"#
);

// ==================== DEX TRAIT ====================

#[async_trait]
pub trait DexRouter: Send + Sync {
    fn router_address(&self) -> Address;

    /// Raw output amount for a single-pool exact-input swap.
    async fn quote(
        &self,
        token_in: &TokenDescriptor,
        token_out: &TokenDescriptor,
        amount_in: U256,
    ) -> Result<U256>;

    /// Quote plus router calldata for one instruction.
    async fn route(&self, instruction: &SwapInstruction) -> Result<SwapRoute>;
}

// ==================== UNISWAP V3 ====================

pub struct UniswapV3Router {
    provider: Arc<Provider<Http>>,
    router: Address,
    quoter: Address,
    fee: u32,
    slippage_bps: u32,
    wrapped_native: Option<TokenDescriptor>,
    usd_token: Option<TokenDescriptor>,
}

impl UniswapV3Router {
    pub fn new(provider: Arc<Provider<Http>>, config: &Config, registry: &TokenRegistry) -> Result<Self> {
        Ok(Self {
            provider,
            router: parse_address(&config.swap_router_address, "swap router")?,
            quoter: parse_address(&config.quoter_address, "quoter")?,
            fee: config.pool_fee,
            slippage_bps: config.slippage_bps,
            wrapped_native: registry.get(WRAPPED_NATIVE_SYMBOL).cloned(),
            usd_token: registry.get(&config.base_token_symbol).cloned(),
        })
    }

    /// Converts a native gas cost into `token`, or zero when no pool answers.
    async fn gas_cost_in(&self, gas_cost_wei: U256, token: &TokenDescriptor) -> U256 {
        let Some(native) = &self.wrapped_native else {
            return U256::zero();
        };
        if native.address == token.address {
            return gas_cost_wei;
        }
        if gas_cost_wei.is_zero() {
            return U256::zero();
        }
        match self.quote(native, token, gas_cost_wei).await {
            Ok(amount) => amount,
            Err(err) => {
                tracing::warn!(
                    "Gas cost conversion {} -> {} failed: {}",
                    native.symbol,
                    token.symbol,
                    err
                );
                U256::zero()
            }
        }
    }
}

#[async_trait]
impl DexRouter for UniswapV3Router {
    fn router_address(&self) -> Address {
        self.router
    }

    async fn quote(
        &self,
        token_in: &TokenDescriptor,
        token_out: &TokenDescriptor,
        amount_in: U256,
    ) -> Result<U256> {
        UniswapQuoter::new(self.quoter, self.provider.clone())
            .quote_exact_input_single(
                token_in.address,
                token_out.address,
                self.fee,
                amount_in,
                U256::zero(),
            )
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    }

    async fn route(&self, instruction: &SwapInstruction) -> Result<SwapRoute> {
        let token_out = &instruction.token_out;
        let quote_raw = self
            .quote(&instruction.token_in, token_out, instruction.amount_in_raw)
            .await?;
        if quote_raw.is_zero() {
            return Err(AppError::NoRoute(format!(
                "{} -> {}",
                instruction.token_in.symbol, token_out.symbol
            )));
        }

        let gas_price_wei = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        let gas_used = U256::from(SINGLE_HOP_GAS_ESTIMATE);
        let gas_cost_wei = gas_used.saturating_mul(gas_price_wei);

        let gas_cost_quote = self.gas_cost_in(gas_cost_wei, token_out).await;
        let (gas_cost_usd, usd_decimals) = match &self.usd_token {
            Some(usd) if usd.address == token_out.address => (gas_cost_quote, usd.decimals),
            Some(usd) => (self.gas_cost_in(gas_cost_wei, usd).await, usd.decimals),
            None => (U256::zero(), 6),
        };

        let amount_out_minimum = apply_slippage(quote_raw, self.slippage_bps);
        let deadline = chrono::Utc::now().timestamp() + DEFAULT_SWAP_DEADLINE_SECS;
        let swap = encode_exact_input_single(
            instruction,
            self.fee,
            amount_out_minimum,
        );
        let calldata = encode_deadline_multicall(U256::from(deadline.max(0) as u64), &[swap]);

        Ok(SwapRoute {
            router: self.router,
            quote: format_token_amount(quote_raw, token_out.decimals),
            quote_gas_adjusted: format_token_amount(
                quote_raw.saturating_sub(gas_cost_quote),
                token_out.decimals,
            ),
            gas_used,
            gas_price_wei,
            gas_cost_quote_token: format_token_amount(gas_cost_quote, token_out.decimals),
            gas_cost_usd: format_token_amount(gas_cost_usd, usd_decimals),
            calldata,
            value: U256::zero(),
        })
    }
}

// ==================== CALLDATA ====================

pub fn apply_slippage(amount: U256, slippage_bps: u32) -> U256 {
    let keep = 10_000u32.saturating_sub(slippage_bps);
    amount * U256::from(keep) / U256::from(10_000u32)
}

/// SwapRouter02 `exactInputSingle` for one instruction, recipient = the wallet.
pub fn encode_exact_input_single(
    instruction: &SwapInstruction,
    fee: u32,
    amount_out_minimum: U256,
) -> Bytes {
    encode_call(
        "exactInputSingle((address,address,uint24,address,uint256,uint256,uint160))",
        &[Token::Tuple(vec![
            Token::Address(instruction.token_in.address),
            Token::Address(instruction.token_out.address),
            Token::Uint(U256::from(fee)),
            Token::Address(instruction.wallet),
            Token::Uint(instruction.amount_in_raw),
            Token::Uint(amount_out_minimum),
            Token::Uint(U256::zero()),
        ])],
    )
}

pub fn encode_deadline_multicall(deadline: U256, calls: &[Bytes]) -> Bytes {
    encode_call(
        "multicall(uint256,bytes[])",
        &[Token::Uint(deadline), bytes_array(calls)],
    )
}

/// Router-level `multicall(bytes[])` bundling several routes.
pub fn encode_multicall(calls: &[Bytes]) -> Bytes {
    encode_call("multicall(bytes[])", &[bytes_array(calls)])
}

fn bytes_array(calls: &[Bytes]) -> Token {
    Token::Array(calls.iter().map(|c| Token::Bytes(c.to_vec())).collect())
}
