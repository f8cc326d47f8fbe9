use super::{AppState, Json};
use crate::{
    constants::DEFAULT_RECEIPT_TIMEOUT_SECS,
    error::{AppError, Result},
    models::PriceEntry,
    services::onchain::encode_transfer,
    utils::{parse_address, smart_round, to_base_units},
};
use axum::extract::State;
use ethers::types::U256;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRequest {
    pub wallet_address: String,
    pub token_in: String,
    pub token_out: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListBalanceRequest {
    pub wallet_address: String,
    pub tokens: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub account_address: String,
    pub token: String,
    pub amount: Value,
    pub recipient: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub success: bool,
    pub result: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTokenDetail {
    pub token_in_symbol: String,
    pub token_out_symbol: Option<String>,
    pub token_in_balance: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPriceRequest {
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub token_details: Vec<PriceTokenDetail>,
}

// Internal helper that parses or transforms values for `amount_text`.
fn amount_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// POST /balance
pub async fn get_balance(
    State(state): State<AppState>,
    Json(req): Json<BalanceRequest>,
) -> Result<Json<BTreeMap<String, String>>> {
    let registry = state.executor.registry();
    let token_in = registry.resolve(&req.token_in)?;
    let token_out = registry.resolve(&req.token_out)?;
    let wallet = parse_address(&req.wallet_address, "wallet")?;

    let balances = state
        .executor
        .balances(wallet, &[&token_in, &token_out])
        .await?;
    Ok(Json(balances))
}

/// POST /tokenListBalance
///
/// Plain text, one `SYMBOL: balance tokens` line per token. Every registry
/// token is listed when `tokens` is omitted.
pub async fn get_token_list_balance(
    State(state): State<AppState>,
    Json(req): Json<TokenListBalanceRequest>,
) -> Result<String> {
    let registry = state.executor.registry();
    let wallet = parse_address(&req.wallet_address, "wallet")?;
    let tokens = match &req.tokens {
        Some(symbols) => symbols
            .iter()
            .map(|symbol| registry.resolve(symbol))
            .collect::<Result<Vec<_>>>()?,
        None => registry.tokens().to_vec(),
    };

    let mut lines = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let balance = state.executor.balance(token, wallet).await?;
        lines.push(format!("{}: {} tokens", token.symbol, balance));
    }
    Ok(lines.join("\n"))
}

/// POST /transferERC20
pub async fn transfer_erc20(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TransferResponse>> {
    let token = state.executor.registry().resolve(&req.token)?;
    let account = parse_address(&req.account_address, "account")?;
    let recipient = parse_address(&req.recipient, "recipient")?;
    let amount = to_base_units(&amount_text(&req.amount), token.decimals)?;

    tracing::info!(
        "Sending {} {} from {} to {}",
        amount_text(&req.amount),
        token.symbol,
        req.account_address,
        req.recipient
    );
    let tx_hash = state
        .chain
        .execute(
            account,
            token.address,
            U256::zero(),
            encode_transfer(recipient, amount),
        )
        .await?;
    state
        .chain
        .wait_for_receipt(
            tx_hash,
            Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
            "ERC-20 transfer",
        )
        .await?;

    Ok(Json(TransferResponse {
        success: true,
        result: format!("{:?}", tx_hash),
    }))
}

/// POST /getPrice
pub async fn get_price(
    State(state): State<AppState>,
    Json(req): Json<GetPriceRequest>,
) -> Result<Json<Vec<PriceEntry<f64>>>> {
    tracing::debug!(
        "Pricing {} tokens for {}",
        req.token_details.len(),
        req.wallet_address.as_deref().unwrap_or("unknown wallet")
    );
    let base = state.config.base_token_symbol.as_str();
    let quotes = req.token_details.iter().map(|detail| {
        let executor = state.executor.clone();
        async move {
            let token_out = detail.token_out_symbol.as_deref().unwrap_or(base);
            let amount = amount_text(&detail.token_in_balance);
            let priced = executor
                .price(&detail.token_in_symbol, token_out, &amount)
                .await
                .and_then(|value| {
                    value.parse::<f64>().map(smart_round).map_err(|_| {
                        AppError::Internal(format!("Unparsable quote {}", value))
                    })
                });
            match priced {
                Ok(value) => PriceEntry::priced(&detail.token_in_symbol, value),
                Err(e) => {
                    tracing::error!("Error fetching price for {}: {}", detail.token_in_symbol, e);
                    PriceEntry::failed(&detail.token_in_symbol)
                }
            }
        }
    });
    Ok(Json(join_all(quotes).await))
}
