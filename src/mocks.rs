//! Mock clients for tests.
//!
//! Each mock records what it was asked to do so tests can assert on the
//! calls a service made without touching a network.

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H160, H256, U256};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::{
    error::{AppError, Result},
    integrations::{alchemy::NftIndexer, ao::ProcessBus, irys::BlobStore},
    models::{IndexedNft, SwapInstruction, SwapRoute, Tag, TokenDescriptor},
    services::{
        dex::{encode_deadline_multicall, encode_exact_input_single, DexRouter},
        onchain::{BoundNft, ChainClient, MintedNft},
        token_registry::TokenRegistry,
    },
    utils::format_token_amount,
};

pub fn test_registry() -> TokenRegistry {
    let token = |symbol: &str, address: &str, decimals: u8| TokenDescriptor {
        symbol: symbol.to_string(),
        address: Address::from_str(address).expect("token address"),
        decimals,
    };
    TokenRegistry::new(vec![
        token("USDT", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F", 6),
        token("WETH", "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", 18),
        token("WMATIC", "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", 18),
        token("UNI", "0xb33EaAd8d922B1083446DC23f610c2567fB5180f", 18),
    ])
    .expect("test registry")
}

// ==================== CHAIN ====================

#[derive(Debug, Clone, PartialEq)]
pub struct SentCall {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCall {
    pub account: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

pub struct MockChain {
    balances: HashMap<Address, U256>,
    valid_signer: bool,
    revert_label: Option<String>,
    total_supply: U256,
    minted_token_id: Option<U256>,
    tx_counter: AtomicU64,
    sent: Mutex<Vec<SentCall>>,
    executed: Mutex<Vec<ExecutedCall>>,
    waited: Mutex<Vec<String>>,
    minted: Mutex<Vec<(Address, String)>>,
    created: Mutex<Vec<(Address, U256)>>,
}

impl Default for MockChain {
    fn default() -> Self {
        // 100 whole tokens of everything in the test registry
        let balances = test_registry()
            .tokens()
            .iter()
            .map(|t| (t.address, U256::from(100u64) * U256::exp10(t.decimals as usize)))
            .collect();
        Self {
            balances,
            valid_signer: true,
            revert_label: None,
            total_supply: U256::from(25u64),
            minted_token_id: None,
            tx_counter: AtomicU64::new(1),
            sent: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            waited: Mutex::new(Vec::new()),
            minted: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }
}

impl MockChain {
    pub const SERVICE_WALLET: Address = H160([0x5e; 20]);
    pub const NFT_CONTRACT: Address = H160([0x6e; 20]);
    pub const BOUND_TOKEN_ID: u64 = 21;

    pub fn with_valid_signer(mut self, valid: bool) -> Self {
        self.valid_signer = valid;
        self
    }

    /// Receipts waited on under `label` report a revert.
    pub fn reverting(mut self, label: &str) -> Self {
        self.revert_label = Some(label.to_string());
        self
    }

    pub fn with_total_supply(mut self, supply: u64) -> Self {
        self.total_supply = U256::from(supply);
        self
    }

    pub fn minting_token_id(mut self, token_id: u64) -> Self {
        self.minted_token_id = Some(U256::from(token_id));
        self
    }

    pub fn account_for(token_id: U256) -> Address {
        Address::from_low_u64_be(0x6551_0000 + token_id.low_u64())
    }

    pub fn sent_calls(&self) -> Vec<SentCall> {
        self.sent.lock().expect("lock").clone()
    }

    pub fn executed_calls(&self) -> Vec<ExecutedCall> {
        self.executed.lock().expect("lock").clone()
    }

    pub fn waited_labels(&self) -> Vec<String> {
        self.waited.lock().expect("lock").clone()
    }

    pub fn minted(&self) -> Vec<(Address, String)> {
        self.minted.lock().expect("lock").clone()
    }

    pub fn created_accounts(&self) -> Vec<(Address, U256)> {
        self.created.lock().expect("lock").clone()
    }

    fn next_hash(&self) -> H256 {
        H256::from_low_u64_be(self.tx_counter.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn service_address(&self) -> Address {
        Self::SERVICE_WALLET
    }

    async fn balance_of(&self, token: Address, _owner: Address) -> Result<U256> {
        Ok(self.balances.get(&token).copied().unwrap_or_default())
    }

    async fn send_call(&self, to: Address, value: U256, data: Bytes) -> Result<H256> {
        self.sent.lock().expect("lock").push(SentCall { to, value, data });
        Ok(self.next_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: H256, _timeout: Duration, label: &str) -> Result<()> {
        self.waited.lock().expect("lock").push(label.to_string());
        if self.revert_label.as_deref() == Some(label) {
            return Err(AppError::TransactionReverted(format!(
                "{} failed ({:?})",
                label, tx_hash
            )));
        }
        Ok(())
    }

    async fn is_valid_signer(&self, _account: Address, _signer: Address) -> Result<bool> {
        Ok(self.valid_signer)
    }

    async fn bound_nft(&self, _account: Address) -> Result<BoundNft> {
        Ok(BoundNft {
            chain_id: U256::from(137u64),
            token_contract: Self::NFT_CONTRACT,
            token_id: U256::from(Self::BOUND_TOKEN_ID),
        })
    }

    async fn account_address(&self, _token_contract: Address, token_id: U256) -> Result<Address> {
        Ok(Self::account_for(token_id))
    }

    async fn create_account(&self, token_contract: Address, token_id: U256) -> Result<H256> {
        self.created
            .lock()
            .expect("lock")
            .push((token_contract, token_id));
        Ok(self.next_hash())
    }

    async fn nft_total_supply(&self, _contract: Address) -> Result<U256> {
        Ok(self.total_supply)
    }

    async fn mint_account_nft(
        &self,
        _contract: Address,
        to: Address,
        token_uri: &str,
    ) -> Result<MintedNft> {
        self.minted
            .lock()
            .expect("lock")
            .push((to, token_uri.to_string()));
        Ok(MintedNft {
            tx_hash: self.next_hash(),
            token_id: self.minted_token_id.unwrap_or(self.total_supply),
        })
    }

    async fn execute(&self, account: Address, to: Address, value: U256, data: Bytes) -> Result<H256> {
        self.executed.lock().expect("lock").push(ExecutedCall {
            account,
            to,
            value,
            data,
        });
        Ok(self.next_hash())
    }
}

// ==================== DEX ====================

/// Quotes twice the raw input amount.
#[derive(Default)]
pub struct MockDex {
    failing_symbol: Option<String>,
    routes: AtomicU64,
}

impl MockDex {
    pub const ROUTER: Address = H160([0x68; 20]);

    pub fn failing_for(mut self, symbol: &str) -> Self {
        self.failing_symbol = Some(symbol.to_string());
        self
    }

    pub fn route_count(&self) -> u64 {
        self.routes.load(Ordering::SeqCst)
    }

    fn check(&self, token_out: &TokenDescriptor) -> Result<()> {
        if self.failing_symbol.as_deref() == Some(token_out.symbol.as_str()) {
            return Err(AppError::NoRoute(format!("no pool for {}", token_out.symbol)));
        }
        Ok(())
    }
}

#[async_trait]
impl DexRouter for MockDex {
    fn router_address(&self) -> Address {
        Self::ROUTER
    }

    async fn quote(
        &self,
        _token_in: &TokenDescriptor,
        token_out: &TokenDescriptor,
        amount_in: U256,
    ) -> Result<U256> {
        self.check(token_out)?;
        Ok(amount_in * U256::from(2u64))
    }

    async fn route(&self, instruction: &SwapInstruction) -> Result<SwapRoute> {
        self.routes.fetch_add(1, Ordering::SeqCst);
        self.check(&instruction.token_out)?;
        let quote_raw = instruction.amount_in_raw * U256::from(2u64);
        let decimals = instruction.token_out.decimals;
        let swap = encode_exact_input_single(instruction, 3000, quote_raw);
        Ok(SwapRoute {
            router: Self::ROUTER,
            quote: format_token_amount(quote_raw, decimals),
            quote_gas_adjusted: format_token_amount(quote_raw, decimals),
            gas_used: U256::from(160_000u64),
            gas_price_wei: U256::from(30_000_000_000u64),
            gas_cost_quote_token: "0.0".to_string(),
            gas_cost_usd: "0.0".to_string(),
            calldata: encode_deadline_multicall(U256::from(1_800u64), &[swap]),
            value: U256::zero(),
        })
    }
}

// ==================== AO ====================

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub process_id: String,
    pub tags: Vec<Tag>,
    pub data: String,
}

#[derive(Default)]
pub struct MockBus {
    outputs: Mutex<HashMap<String, String>>,
    counter: AtomicU64,
    messages: Mutex<Vec<SentMessage>>,
    dryruns: Mutex<Vec<SentMessage>>,
    spawned: Mutex<Vec<Vec<Tag>>>,
}

impl MockBus {
    pub const SPAWNED_PROCESS: &'static str = "spawned-process-id";

    pub fn with_output(self, process_id: &str, output: &str) -> Self {
        self.set_output(process_id, output);
        self
    }

    /// Sets what dry-runs against `process_id` return from now on.
    pub fn set_output(&self, process_id: &str, output: &str) {
        self.outputs
            .lock()
            .expect("lock")
            .insert(process_id.to_string(), output.to_string());
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().expect("lock").clone()
    }

    pub fn dryruns(&self) -> Vec<SentMessage> {
        self.dryruns.lock().expect("lock").clone()
    }

    pub fn spawned(&self) -> Vec<Vec<Tag>> {
        self.spawned.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ProcessBus for MockBus {
    async fn spawn(&self, tags: Vec<Tag>) -> Result<String> {
        self.spawned.lock().expect("lock").push(tags);
        Ok(Self::SPAWNED_PROCESS.to_string())
    }

    async fn message(&self, process_id: &str, tags: Vec<Tag>, data: String) -> Result<String> {
        self.messages.lock().expect("lock").push(SentMessage {
            process_id: process_id.to_string(),
            tags,
            data,
        });
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("message-{}", n))
    }

    async fn dryrun(&self, process_id: &str, tags: Vec<Tag>, data: String) -> Result<String> {
        self.dryruns.lock().expect("lock").push(SentMessage {
            process_id: process_id.to_string(),
            tags,
            data,
        });
        self.outputs
            .lock()
            .expect("lock")
            .get(process_id)
            .cloned()
            .ok_or_else(|| AppError::ExternalAPI(format!("no output for {}", process_id)))
    }

    async fn result(&self, _process_id: &str, message_id: &str) -> Result<Value> {
        Ok(json!({ "Messages": [], "Output": { "data": message_id } }))
    }
}

// ==================== STORAGE / INDEXER ====================

#[derive(Default)]
pub struct MockBlobStore {
    uploads: Mutex<Vec<(Vec<u8>, Vec<Tag>)>>,
}

impl MockBlobStore {
    pub fn uploads(&self) -> Vec<(Vec<u8>, Vec<Tag>)> {
        self.uploads.lock().expect("lock").clone()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<String> {
        self.uploads.lock().expect("lock").push((data, tags));
        Ok("blob-id".to_string())
    }
}

#[derive(Default)]
pub struct MockIndexer {
    nfts: Vec<IndexedNft>,
}

impl MockIndexer {
    pub fn with_nfts(nfts: Vec<IndexedNft>) -> Self {
        Self { nfts }
    }
}

#[async_trait]
impl NftIndexer for MockIndexer {
    async fn nfts_for_contract(&self, _contract: Address) -> Result<Vec<IndexedNft>> {
        Ok(self.nfts.clone())
    }
}
