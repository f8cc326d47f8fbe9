// src/api/mod.rs

pub mod health;
pub mod nft;
pub mod process;
pub mod swap;
pub mod upload;
pub mod wallet;

use axum::{
    extract::FromRequest,
    response::{IntoResponse, Response},
};
use ethers::types::Address;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    config::Config,
    error::{AppError, Result},
    integrations::irys::BlobStore,
    services::{
        onchain::ChainClient, AccountService, CustodyGuard, CustodyOutcome, ProcessBridge,
        SwapExecutor,
    },
    utils::{is_blank, parse_address},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chain: Arc<dyn ChainClient>,
    pub executor: Arc<SwapExecutor>,
    pub custody: Arc<CustodyGuard>,
    pub accounts: Arc<AccountService>,
    pub processes: Arc<ProcessBridge>,
    pub blobs: Arc<dyn BlobStore>,
}

/// JSON body extractor whose rejections render as `{ error }` with status 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Runs the custody step when the request names the account's owner wallet.
pub async fn reclaim_if_owner(
    state: &AppState,
    account: Address,
    owner: Option<&str>,
) -> Result<Option<CustodyOutcome>> {
    if is_blank(owner) {
        return Ok(None);
    }
    let owner = parse_address(owner.unwrap_or_default(), "owner")?;
    let outcome = state.custody.reclaim(account, owner).await?;
    Ok(Some(outcome))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::mocks::{test_registry, MockBlobStore, MockBus, MockChain, MockDex, MockIndexer};

    pub struct Harness {
        pub state: AppState,
        pub chain: Arc<MockChain>,
        pub bus: Arc<MockBus>,
        pub blobs: Arc<MockBlobStore>,
    }

    pub fn harness() -> Harness {
        harness_with(MockChain::default(), MockDex::default(), MockIndexer::default())
    }

    pub fn harness_with(chain: MockChain, dex: MockDex, indexer: MockIndexer) -> Harness {
        let config = Arc::new(Config::for_tests());
        let chain = Arc::new(chain);
        let bus = Arc::new(MockBus::default());
        let blobs = Arc::new(MockBlobStore::default());
        let executor = Arc::new(SwapExecutor::new(
            chain.clone(),
            Arc::new(dex),
            Arc::new(test_registry()),
        ));

        let state = AppState {
            config: config.clone(),
            chain: chain.clone(),
            executor,
            custody: Arc::new(CustodyGuard::new(chain.clone(), Address::repeat_byte(0xcc))),
            accounts: Arc::new(AccountService::new(
                chain.clone(),
                Arc::new(indexer),
                MockChain::NFT_CONTRACT,
            )),
            processes: Arc::new(ProcessBridge::new(bus.clone(), &config)),
            blobs: blobs.clone(),
        };

        Harness {
            state,
            chain,
            bus,
            blobs,
        }
    }
}
