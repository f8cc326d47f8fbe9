use super::{AppState, Json};
use crate::{
    error::{AppError, Result},
    models::AccountRecord,
    utils::format_address,
};
use axum::extract::State;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub account: String,
    pub tx_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAccountsRequest {
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
pub struct FetchAccountsResponse {
    pub accounts: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRequest {
    pub tokenbound_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipResponse {
    pub tx_hash: String,
    pub future_owner_address: String,
}

/// POST /createAccount
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<CreateAccountResponse>> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Account name is required".to_string()));
    }
    let created = state
        .accounts
        .create_account(&req.address, req.name.trim(), req.description.trim())
        .await?;
    tracing::info!("Account {:?} created for {}", created.account, req.address);

    Ok(Json(CreateAccountResponse {
        account: format_address(created.account),
        tx_hash: format!("{:?}", created.tx_hash),
    }))
}

/// POST /fetchAccounts
pub async fn fetch_accounts(
    State(state): State<AppState>,
    Json(req): Json<FetchAccountsRequest>,
) -> Result<Json<FetchAccountsResponse>> {
    let accounts = state.accounts.fetch_accounts(&req.wallet_address).await?;
    Ok(Json(FetchAccountsResponse { accounts }))
}

/// POST /getOwnership
pub async fn get_ownership(
    State(state): State<AppState>,
    Json(req): Json<OwnershipRequest>,
) -> Result<Json<OwnershipResponse>> {
    let transfer = state
        .accounts
        .transfer_ownership(&req.tokenbound_address)
        .await?;
    Ok(Json(OwnershipResponse {
        tx_hash: format!("{:?}", transfer.tx_hash),
        future_owner_address: format_address(transfer.future_owner),
    }))
}
