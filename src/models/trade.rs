use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

// ==================== TOKENS ====================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

// ==================== SWAPS ====================
/// One swap leg, resolved against the token registry.
#[derive(Debug, Clone)]
pub struct SwapInstruction {
    pub wallet: Address,
    pub token_in: TokenDescriptor,
    pub token_out: TokenDescriptor,
    pub amount_in: String,
    pub amount_in_raw: U256,
}

/// Router output for one instruction. Consumed once by the executor.
#[derive(Debug, Clone)]
pub struct SwapRoute {
    pub router: Address,
    pub quote: String,
    pub quote_gas_adjusted: String,
    pub gas_used: U256,
    pub gas_price_wei: U256,
    pub gas_cost_quote_token: String,
    pub gas_cost_usd: String,
    pub calldata: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub estimated_output: String,
    pub gas_adjusted_quote: String,
    pub gas_used_quote_token: String,
    #[serde(rename = "gasUsedUSD")]
    pub gas_used_usd: String,
    pub gas_used: String,
    pub gas_price_wei: String,
    pub balance_token_in: String,
    pub balance_token_out: String,
    pub token_in: String,
    pub token_out: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegQuote {
    pub balance_token_in: String,
    pub balance_token_out: String,
    pub token_in_symbol: String,
    pub token_out_symbol: String,
    pub estimated_quote: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOutcome {
    pub message: String,
    pub tx_hash: String,
    pub new_balances: std::collections::BTreeMap<String, String>,
}

// ==================== PRICES ====================
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry<V = String> {
    pub token_in_symbol: String,
    pub usd_value: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<V> PriceEntry<V> {
    pub fn priced(symbol: &str, usd_value: V) -> Self {
        Self {
            token_in_symbol: symbol.to_string(),
            usd_value: Some(usd_value),
            error: None,
        }
    }

    pub fn failed(symbol: &str) -> Self {
        Self {
            token_in_symbol: symbol.to_string(),
            usd_value: None,
            error: Some(format!("Error fetching price for {}", symbol)),
        }
    }
}
