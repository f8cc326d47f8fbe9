use super::{reclaim_if_owner, AppState, Json};
use crate::{
    error::{AppError, Result},
    models::{LegQuote, QuoteSummary, SwapInstruction, SwapOutcome},
    services::swap_executor::WalletBalances,
    utils::format_address,
};
use axum::extract::State;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub wallet_address: String,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    #[serde(default, alias = "amountIn", deserialize_with = "flexible_amount")]
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapLeg {
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    #[serde(default, alias = "amountIn", deserialize_with = "flexible_amount")]
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiQuoteRequest {
    pub wallet_address: String,
    #[serde(default)]
    pub swaps: Vec<SwapLeg>,
}

#[derive(Debug, Serialize)]
pub struct MultiQuoteResponse {
    pub results: Vec<LegQuote>,
}

/// `walletAddress` is the token-bound account; `ownerAddress` the wallet
/// controlling it, when the caller wants the custody step to run.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub wallet_address: String,
    pub owner_address: Option<String>,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    #[serde(default, alias = "amountIn", deserialize_with = "flexible_amount")]
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSwapRequest {
    pub wallet_address: String,
    pub owner_address: Option<String>,
    #[serde(default)]
    pub swaps: Vec<SwapLeg>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSwapResponse {
    pub message: String,
    pub tx_hash: String,
    pub updated_balances: WalletBalances,
}

/// Accepts amounts sent either as JSON strings or numbers.
fn flexible_amount<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn legs(state: &AppState, wallet: &str, swaps: &[SwapLeg]) -> Result<Vec<SwapInstruction>> {
    if swaps.is_empty() {
        return Err(AppError::BadRequest("No swaps provided".to_string()));
    }
    swaps
        .iter()
        .map(|leg| {
            state.executor.instruction(
                wallet,
                leg.token_in.as_deref(),
                leg.token_out.as_deref(),
                leg.amount.as_deref(),
            )
        })
        .collect()
}

/// POST /quote
pub async fn get_quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteSummary>> {
    let instruction = state.executor.instruction(
        &req.wallet_address,
        req.token_in.as_deref(),
        req.token_out.as_deref(),
        req.amount.as_deref(),
    )?;
    let summary = state.executor.quote(&instruction).await?;
    Ok(Json(summary))
}

/// POST /multiQuote
pub async fn get_multi_quote(
    State(state): State<AppState>,
    Json(req): Json<MultiQuoteRequest>,
) -> Result<Json<MultiQuoteResponse>> {
    let instructions = legs(&state, &req.wallet_address, &req.swaps)?;
    let results = state.executor.multi_quote(&instructions).await?;
    Ok(Json(MultiQuoteResponse { results }))
}

/// POST /swap
pub async fn execute_swap(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> Result<Json<SwapOutcome>> {
    let instruction = state.executor.instruction(
        &req.wallet_address,
        req.token_in.as_deref(),
        req.token_out.as_deref(),
        req.amount.as_deref(),
    )?;

    if let Some(outcome) =
        reclaim_if_owner(&state, instruction.wallet, req.owner_address.as_deref()).await?
    {
        tracing::info!("Custody step for {}: {:?}", req.wallet_address, outcome);
    }

    let outcome = state.executor.execute_single(&instruction).await?;
    Ok(Json(outcome))
}

/// POST /multiSwap
pub async fn execute_multi_swap(
    State(state): State<AppState>,
    Json(req): Json<MultiSwapRequest>,
) -> Result<Json<MultiSwapResponse>> {
    let instructions = legs(&state, &req.wallet_address, &req.swaps)?;
    let account = instructions[0].wallet;

    if let Some(outcome) = reclaim_if_owner(&state, account, req.owner_address.as_deref()).await? {
        tracing::info!("Custody step for {}: {:?}", format_address(account), outcome);
    }

    let (tx_hash, updated_balances) = state.executor.execute_multi(account, &instructions).await?;
    tracing::info!("Multiswap completed: {:?}", tx_hash);

    Ok(Json(MultiSwapResponse {
        message: "Multiswap completed successfully!".to_string(),
        tx_hash: format!("{:?}", tx_hash),
        updated_balances,
    }))
}
