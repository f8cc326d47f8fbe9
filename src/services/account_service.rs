use ethers::types::{Address, H256, U256};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    constants::{DEFAULT_RECEIPT_TIMEOUT_SECS, LEGACY_ACCOUNT_TOKEN_ID_CUTOFF},
    error::{AppError, Result},
    integrations::alchemy::NftIndexer,
    models::{AccountMetadata, AccountRecord, IndexedNft},
    services::onchain::{encode_transfer_from, ChainClient},
    utils::{format_address, parse_address},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAccount {
    pub account: Address,
    pub tx_hash: H256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTransfer {
    pub tx_hash: H256,
    pub future_owner: Address,
}

/// Account NFTs and the token-bound accounts derived from them.
pub struct AccountService {
    chain: Arc<dyn ChainClient>,
    indexer: Arc<dyn NftIndexer>,
    nft_contract: Address,
}

impl AccountService {
    pub fn new(chain: Arc<dyn ChainClient>, indexer: Arc<dyn NftIndexer>, nft_contract: Address) -> Self {
        Self {
            chain,
            indexer,
            nft_contract,
        }
    }

    /// Mints the next account NFT to `wallet` and deploys its token-bound account.
    ///
    /// The account address is derived before minting so it can be written into
    /// the token URI; the minted id must match the predicted one.
    pub async fn create_account(
        &self,
        wallet: &str,
        name: &str,
        description: &str,
    ) -> Result<CreatedAccount> {
        let owner = parse_address(wallet, "wallet")?;
        let token_id = self.chain.nft_total_supply(self.nft_contract).await?;
        let account = self.chain.account_address(self.nft_contract, token_id).await?;
        tracing::info!("Next account token id {} -> {:?}", token_id, account);

        let metadata = AccountMetadata::new(
            &format_address(owner),
            &format_address(account),
            name,
            description,
        );
        let minted = self
            .chain
            .mint_account_nft(self.nft_contract, owner, &metadata.to_token_uri()?)
            .await?;
        if minted.token_id != token_id {
            return Err(AppError::Internal(format!(
                "Minted token id {} does not match predicted id {}",
                minted.token_id, token_id
            )));
        }
        tracing::info!("Minted account NFT {} in {:?}", token_id, minted.tx_hash);

        let tx_hash = self.chain.create_account(self.nft_contract, token_id).await?;
        self.chain
            .wait_for_receipt(
                tx_hash,
                Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
                "Account creation",
            )
            .await?;

        Ok(CreatedAccount { account, tx_hash })
    }

    /// Accounts whose metadata names `wallet` as owner.
    pub async fn fetch_accounts(&self, wallet: &str) -> Result<Vec<AccountRecord>> {
        let nfts = self.indexer.nfts_for_contract(self.nft_contract).await?;
        let wallet = wallet.trim();

        let accounts: Vec<AccountRecord> = nfts
            .iter()
            .filter(|nft| {
                nft.token_id_number()
                    .map(|id| id > LEGACY_ACCOUNT_TOKEN_ID_CUTOFF)
                    .unwrap_or(false)
            })
            .filter_map(read_metadata)
            .filter(|meta| meta.wallet_address.eq_ignore_ascii_case(wallet))
            .map(AccountRecord::from)
            .collect();

        tracing::debug!("Found {} accounts for {}", accounts.len(), wallet);
        Ok(accounts)
    }

    /// Sends the NFT behind `tokenbound` from the service wallet to the owner
    /// recorded in its metadata.
    pub async fn transfer_ownership(&self, tokenbound: &str) -> Result<OwnershipTransfer> {
        let account = parse_address(tokenbound, "token-bound account")?;
        let bound = self.chain.bound_nft(account).await?;

        let nfts = self.indexer.nfts_for_contract(bound.token_contract).await?;
        let nft = nfts
            .iter()
            .find(|nft| U256::from_dec_str(nft.token_id.trim()).ok() == Some(bound.token_id))
            .ok_or_else(|| AppError::NotFound("NFT not found".to_string()))?;
        let metadata = read_metadata(nft).ok_or_else(|| {
            AppError::ExternalAPI(format!("NFT {} has no readable metadata", bound.token_id))
        })?;
        let future_owner = parse_address(&metadata.wallet_address, "owner")?;

        let tx_hash = self
            .chain
            .send_call(
                bound.token_contract,
                U256::zero(),
                encode_transfer_from(self.chain.service_address(), future_owner, bound.token_id),
            )
            .await?;
        self.chain
            .wait_for_receipt(
                tx_hash,
                Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
                "Ownership transfer",
            )
            .await?;

        tracing::info!(
            "Account NFT {} handed to {:?} in {:?}",
            bound.token_id,
            future_owner,
            tx_hash
        );
        Ok(OwnershipTransfer {
            tx_hash,
            future_owner,
        })
    }
}

fn read_metadata(nft: &IndexedNft) -> Option<AccountMetadata> {
    let uri = nft.token_uri.as_deref()?;
    match AccountMetadata::from_token_uri(uri) {
        Ok(meta) => Some(meta),
        Err(err) => {
            tracing::warn!("Skipping NFT {}: unreadable metadata ({})", nft.token_id, err);
            None
        }
    }
}
