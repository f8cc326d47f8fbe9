use ethers::types::{Address, H256, U256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    constants::{
        APPROVAL_RECEIPT_TIMEOUT_SECS, DEFAULT_RECEIPT_TIMEOUT_SECS,
        MULTICALL_RECEIPT_TIMEOUT_SECS,
    },
    error::{AppError, Result},
    models::{LegQuote, QuoteSummary, SwapInstruction, SwapOutcome, TokenDescriptor},
    services::{
        dex::{encode_multicall, DexRouter},
        onchain::{encode_approve, ChainClient},
        token_registry::TokenRegistry,
    },
    utils::{format_address, format_token_amount, is_blank, parse_address, to_base_units},
};

pub type WalletBalances = BTreeMap<String, BTreeMap<String, String>>;

/// Rejects incomplete swap legs and legs swapping a token for itself.
pub fn validate_swap(
    amount: Option<&str>,
    token_in: Option<&str>,
    token_out: Option<&str>,
) -> Result<()> {
    if let (Some(a), Some(b)) = (token_in, token_out) {
        if a.trim() == b.trim() && !a.trim().is_empty() {
            return Err(AppError::SameToken);
        }
    }
    if is_blank(amount) || is_blank(token_in) || is_blank(token_out) {
        return Err(AppError::BadRequest(
            "Please fill out all fields correctly".to_string(),
        ));
    }
    Ok(())
}

/// Sums approval amounts per distinct input token, in first-seen order.
pub fn aggregate_approvals(instructions: &[SwapInstruction]) -> Vec<(TokenDescriptor, U256)> {
    let mut approvals: Vec<(TokenDescriptor, U256)> = Vec::new();
    for instruction in instructions {
        match approvals
            .iter_mut()
            .find(|(token, _)| token.address == instruction.token_in.address)
        {
            Some((_, total)) => *total = total.saturating_add(instruction.amount_in_raw),
            None => approvals.push((instruction.token_in.clone(), instruction.amount_in_raw)),
        }
    }
    approvals
}

pub struct SwapExecutor {
    chain: Arc<dyn ChainClient>,
    dex: Arc<dyn DexRouter>,
    registry: Arc<TokenRegistry>,
}

impl SwapExecutor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        dex: Arc<dyn DexRouter>,
        registry: Arc<TokenRegistry>,
    ) -> Self {
        Self {
            chain,
            dex,
            registry,
        }
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Validates and resolves one leg against the registry.
    pub fn instruction(
        &self,
        wallet: &str,
        token_in: Option<&str>,
        token_out: Option<&str>,
        amount: Option<&str>,
    ) -> Result<SwapInstruction> {
        validate_swap(amount, token_in, token_out)?;
        let token_in = self.registry.resolve(token_in.unwrap_or_default())?;
        let token_out = self.registry.resolve(token_out.unwrap_or_default())?;
        let amount = amount.unwrap_or_default().trim().to_string();
        let amount_in_raw = to_base_units(&amount, token_in.decimals)?;

        Ok(SwapInstruction {
            wallet: parse_address(wallet, "wallet")?,
            token_in,
            token_out,
            amount_in: amount,
            amount_in_raw,
        })
    }

    pub async fn balance(&self, token: &TokenDescriptor, owner: Address) -> Result<String> {
        let raw = self.chain.balance_of(token.address, owner).await?;
        Ok(format_token_amount(raw, token.decimals))
    }

    pub async fn balances(
        &self,
        owner: Address,
        tokens: &[&TokenDescriptor],
    ) -> Result<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for token in tokens {
            out.insert(token.symbol.clone(), self.balance(token, owner).await?);
        }
        Ok(out)
    }

    pub async fn quote(&self, instruction: &SwapInstruction) -> Result<QuoteSummary> {
        let balance_in = self.balance(&instruction.token_in, instruction.wallet).await?;
        let balance_out = self.balance(&instruction.token_out, instruction.wallet).await?;

        let route = self.dex.route(instruction).await.map_err(|err| {
            tracing::error!("Error in quote retrieval: {}", err);
            AppError::QuoteFailed(format!(
                "Consider that the user has {} {} and {} {}",
                balance_in, instruction.token_in.symbol, balance_out, instruction.token_out.symbol
            ))
        })?;

        tracing::info!(
            "Quote {} {} -> {} {} (gas adjusted {})",
            instruction.amount_in,
            instruction.token_in.symbol,
            route.quote,
            instruction.token_out.symbol,
            route.quote_gas_adjusted
        );

        Ok(QuoteSummary {
            estimated_output: route.quote,
            gas_adjusted_quote: route.quote_gas_adjusted,
            gas_used_quote_token: route.gas_cost_quote_token,
            gas_used_usd: route.gas_cost_usd,
            gas_used: route.gas_used.to_string(),
            gas_price_wei: route.gas_price_wei.to_string(),
            balance_token_in: balance_in,
            balance_token_out: balance_out,
            token_in: instruction.token_in.symbol.clone(),
            token_out: instruction.token_out.symbol.clone(),
        })
    }

    pub async fn multi_quote(&self, instructions: &[SwapInstruction]) -> Result<Vec<LegQuote>> {
        let mut results = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            let balance_in = self.balance(&instruction.token_in, instruction.wallet).await?;
            let balance_out = self.balance(&instruction.token_out, instruction.wallet).await?;
            let quoted = self
                .dex
                .quote(&instruction.token_in, &instruction.token_out, instruction.amount_in_raw)
                .await?;
            results.push(LegQuote {
                balance_token_in: balance_in,
                balance_token_out: balance_out,
                token_in_symbol: instruction.token_in.symbol.clone(),
                token_out_symbol: instruction.token_out.symbol.clone(),
                estimated_quote: format_token_amount(quoted, instruction.token_out.decimals),
            });
        }
        Ok(results)
    }

    /// Value of `amount` of `token_in` expressed in `token_out`, at full token precision.
    pub async fn price(&self, token_in: &str, token_out: &str, amount: &str) -> Result<String> {
        let token_in = self.registry.resolve(token_in)?;
        let token_out = self.registry.resolve(token_out)?;
        let amount_raw = to_base_units(amount, token_in.decimals)?;
        let quoted = self.dex.quote(&token_in, &token_out, amount_raw).await?;
        Ok(format_token_amount(quoted, token_out.decimals))
    }

    async fn approve(&self, account: Address, token: &TokenDescriptor, amount: U256) -> Result<H256> {
        tracing::info!(
            "Approving {} {} for router",
            format_token_amount(amount, token.decimals),
            token.symbol
        );
        let tx_hash = self
            .chain
            .execute(
                account,
                token.address,
                U256::zero(),
                encode_approve(self.dex.router_address(), amount),
            )
            .await?;
        self.chain
            .wait_for_receipt(
                tx_hash,
                Duration::from_secs(APPROVAL_RECEIPT_TIMEOUT_SECS),
                "Approval",
            )
            .await?;
        Ok(tx_hash)
    }

    /// Quote, approve and swap one instruction through its token-bound account.
    pub async fn execute_single(&self, instruction: &SwapInstruction) -> Result<SwapOutcome> {
        let account = instruction.wallet;
        let tokens = [&instruction.token_in, &instruction.token_out];
        let before = self.balances(account, &tokens).await?;
        tracing::info!("Wallet {} balances before swap: {:?}", format_address(account), before);

        let route = self.dex.route(instruction).await?;
        tracing::info!(
            "Route found: {} {} (gas adjusted {})",
            route.quote,
            instruction.token_out.symbol,
            route.quote_gas_adjusted
        );

        self.approve(account, &instruction.token_in, instruction.amount_in_raw)
            .await?;

        let tx_hash = self
            .chain
            .execute(account, route.router, route.value, route.calldata.clone())
            .await?;
        self.chain
            .wait_for_receipt(
                tx_hash,
                Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
                "Swap transaction",
            )
            .await?;

        let new_balances = self.balances(account, &tokens).await?;
        tracing::info!("Swap completed: {:?} new balances {:?}", tx_hash, new_balances);

        Ok(SwapOutcome {
            message: "Swap completed successfully!".to_string(),
            tx_hash: format!("{:?}", tx_hash),
            new_balances,
        })
    }

    /// Approves each input token once, then sends every route in one router multicall.
    pub async fn execute_multi(
        &self,
        account: Address,
        instructions: &[SwapInstruction],
    ) -> Result<(H256, WalletBalances)> {
        if instructions.is_empty() {
            return Err(AppError::BadRequest("No swaps provided".to_string()));
        }

        for (token, amount) in aggregate_approvals(instructions) {
            self.approve(account, &token, amount).await?;
        }

        let mut calls = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            let route = self.dex.route(instruction).await?;
            tracing::info!(
                "Leg {} {} -> {} {}",
                instruction.amount_in,
                instruction.token_in.symbol,
                route.quote,
                instruction.token_out.symbol
            );
            calls.push(route.calldata);
        }

        tracing::info!("Executing multicall with {} swaps", calls.len());
        let tx_hash = self
            .chain
            .execute(
                account,
                self.dex.router_address(),
                U256::zero(),
                encode_multicall(&calls),
            )
            .await?;
        self.chain
            .wait_for_receipt(
                tx_hash,
                Duration::from_secs(MULTICALL_RECEIPT_TIMEOUT_SECS),
                "Multicall transaction",
            )
            .await?;

        let mut updated: WalletBalances = BTreeMap::new();
        for instruction in instructions {
            let entry = updated
                .entry(format_address(instruction.wallet))
                .or_default();
            for token in [&instruction.token_in, &instruction.token_out] {
                let balance = self.balance(token, instruction.wallet).await?;
                entry.insert(token.symbol.clone(), balance);
            }
        }

        Ok((tx_hash, updated))
    }
}
