use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::constants::{
    DEFAULT_ALCHEMY_NETWORK, DEFAULT_AO_CU_URL, DEFAULT_AO_DRYRUN_OWNER, DEFAULT_AO_INBOX_PROCESS,
    DEFAULT_AO_MODULE, DEFAULT_AO_MU_URL, DEFAULT_AO_PRICE_PROCESS, DEFAULT_AO_REGISTRY_PROCESS,
    DEFAULT_AO_SCHEDULER, DEFAULT_BASE_TOKEN_SYMBOL, DEFAULT_CHAIN_ID, DEFAULT_CUSTODY_ADDRESS,
    DEFAULT_ACCOUNT_NFT_CONTRACT, DEFAULT_IRYS_TOKEN, DEFAULT_IRYS_URL, DEFAULT_POOL_FEE,
    DEFAULT_PRICE_TOKENS, DEFAULT_SLIPPAGE_BPS, INBOX_POLL_INTERVAL_SECS,
    PRICE_POLL_INTERVAL_SECS, TOKENBOUND_ACCOUNT_IMPLEMENTATION, TOKENBOUND_ACCOUNT_PROXY,
    TOKENBOUND_REGISTRY, UNISWAP_QUOTER_V1, UNISWAP_SWAP_ROUTER_02,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Chain
    pub rpc_url: String,
    pub chain_id: u64,
    pub private_key: String,

    // Static data
    pub token_list_path: String,

    // Uniswap
    pub swap_router_address: String,
    pub quoter_address: String,
    pub pool_fee: u32,
    pub slippage_bps: u32,

    // Token-bound accounts
    pub account_nft_address: String,
    pub custody_address: String,
    pub tokenbound_registry: String,
    pub tokenbound_proxy: String,
    pub tokenbound_implementation: String,

    // NFT indexer
    pub alchemy_api_key: Option<String>,
    pub alchemy_network: String,

    // AO
    pub ao_wallet_key: String,
    pub ao_mu_url: String,
    pub ao_cu_url: String,
    pub ao_module: String,
    pub ao_scheduler: String,
    pub ao_registry_process: String,
    pub ao_inbox_process: String,
    pub ao_price_process: String,
    pub ao_chat_process: Option<String>,
    pub ao_dryrun_owner: String,

    // Irys
    pub irys_url: String,
    pub irys_token: String,

    // Pollers
    pub base_token_symbol: String,
    pub price_tokens: Vec<String>,
    pub inbox_poll_secs: u64,
    pub price_poll_secs: u64,
    pub enable_inbox_poller: bool,
    pub enable_price_poller: bool,

    // CORS
    pub cors_allowed_origins: String,
}

#[derive(Debug, Deserialize)]
struct WalletKeyFile {
    #[serde(alias = "private_key", alias = "privateKey", alias = "key")]
    private_key: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let private_key = env::var("PRIVATE_KEY")?;
        let wallet_path = env::var("WALLET_KEY_PATH").unwrap_or_else(|_| "wallet.json".to_string());
        let ao_wallet_key = load_wallet_key(&wallet_path)?.unwrap_or_else(|| {
            tracing::warn!(
                "Wallet key file {} not found; signing data items with PRIVATE_KEY",
                wallet_path
            );
            private_key.clone()
        });

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3002".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            rpc_url: env::var("API_URL").or_else(|_| env::var("RPC_URL"))?,
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| DEFAULT_CHAIN_ID.to_string())
                .parse()?,
            private_key,

            token_list_path: env::var("TOKEN_LIST_PATH")
                .unwrap_or_else(|_| "data/valid_tokens.json".to_string()),

            swap_router_address: env::var("SWAP_ROUTER_ADDRESS")
                .unwrap_or_else(|_| UNISWAP_SWAP_ROUTER_02.to_string()),
            quoter_address: env::var("QUOTER_ADDRESS")
                .unwrap_or_else(|_| UNISWAP_QUOTER_V1.to_string()),
            pool_fee: env::var("POOL_FEE")
                .unwrap_or_else(|_| DEFAULT_POOL_FEE.to_string())
                .parse()?,
            slippage_bps: env::var("SLIPPAGE_BPS")
                .unwrap_or_else(|_| DEFAULT_SLIPPAGE_BPS.to_string())
                .parse()?,

            account_nft_address: env::var("USER_CONTRACT_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_ACCOUNT_NFT_CONTRACT.to_string()),
            custody_address: env::var("CUSTODY_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_CUSTODY_ADDRESS.to_string()),
            tokenbound_registry: env::var("TOKENBOUND_REGISTRY")
                .unwrap_or_else(|_| TOKENBOUND_REGISTRY.to_string()),
            tokenbound_proxy: env::var("TOKENBOUND_ACCOUNT_PROXY")
                .unwrap_or_else(|_| TOKENBOUND_ACCOUNT_PROXY.to_string()),
            tokenbound_implementation: env::var("TOKENBOUND_ACCOUNT_IMPLEMENTATION")
                .unwrap_or_else(|_| TOKENBOUND_ACCOUNT_IMPLEMENTATION.to_string()),

            alchemy_api_key: env::var("ALCHEMY_API_KEY").ok(),
            alchemy_network: env::var("ALCHEMY_NETWORK")
                .unwrap_or_else(|_| DEFAULT_ALCHEMY_NETWORK.to_string()),

            ao_wallet_key,
            ao_mu_url: env::var("AO_MU_URL").unwrap_or_else(|_| DEFAULT_AO_MU_URL.to_string()),
            ao_cu_url: env::var("AO_CU_URL").unwrap_or_else(|_| DEFAULT_AO_CU_URL.to_string()),
            ao_module: env::var("AO_MODULE").unwrap_or_else(|_| DEFAULT_AO_MODULE.to_string()),
            ao_scheduler: env::var("AO_SCHEDULER")
                .unwrap_or_else(|_| DEFAULT_AO_SCHEDULER.to_string()),
            ao_registry_process: env::var("AO_REGISTRY_PROCESS")
                .unwrap_or_else(|_| DEFAULT_AO_REGISTRY_PROCESS.to_string()),
            ao_inbox_process: env::var("AO_INBOX_PROCESS")
                .unwrap_or_else(|_| DEFAULT_AO_INBOX_PROCESS.to_string()),
            ao_price_process: env::var("AO_PRICE_PROCESS")
                .unwrap_or_else(|_| DEFAULT_AO_PRICE_PROCESS.to_string()),
            ao_chat_process: env::var("AO_CHAT_PROCESS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            ao_dryrun_owner: env::var("AO_DRYRUN_OWNER")
                .unwrap_or_else(|_| DEFAULT_AO_DRYRUN_OWNER.to_string()),

            irys_url: env::var("IRYS_URL").unwrap_or_else(|_| DEFAULT_IRYS_URL.to_string()),
            irys_token: env::var("IRYS_TOKEN").unwrap_or_else(|_| DEFAULT_IRYS_TOKEN.to_string()),

            base_token_symbol: env::var("BASE_TOKEN_SYMBOL")
                .unwrap_or_else(|_| DEFAULT_BASE_TOKEN_SYMBOL.to_string()),
            price_tokens: parse_symbol_list(
                &env::var("PRICE_TOKENS").unwrap_or_else(|_| DEFAULT_PRICE_TOKENS.to_string()),
            ),
            inbox_poll_secs: env::var("INBOX_POLL_SECS")
                .unwrap_or_else(|_| INBOX_POLL_INTERVAL_SECS.to_string())
                .parse()?,
            price_poll_secs: env::var("PRICE_POLL_SECS")
                .unwrap_or_else(|_| PRICE_POLL_INTERVAL_SECS.to_string())
                .parse()?,
            enable_inbox_poller: env_flag("ENABLE_INBOX_POLLER"),
            enable_price_poller: env_flag("ENABLE_PRICE_POLLER"),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_url.trim().is_empty() {
            anyhow::bail!("API_URL is empty");
        }
        if self.private_key.trim().is_empty() {
            anyhow::bail!("PRIVATE_KEY is empty");
        }
        if self.pool_fee == 0 {
            anyhow::bail!("POOL_FEE must be > 0");
        }
        if self.slippage_bps >= 10_000 {
            anyhow::bail!("SLIPPAGE_BPS must be below 10000");
        }
        if self.inbox_poll_secs == 0 || self.price_poll_secs == 0 {
            anyhow::bail!("Poll intervals must be > 0");
        }

        if self.alchemy_api_key.is_none() {
            tracing::warn!("ALCHEMY_API_KEY is not set; account lookups will fail");
        }
        if self.price_tokens.is_empty() {
            tracing::warn!("PRICE_TOKENS is empty; price poller has nothing to relay");
        }
        if self.custody_address.starts_with("0x0000") {
            tracing::warn!("Using placeholder custody address");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_mainnet(&self) -> bool {
        self.chain_id == DEFAULT_CHAIN_ID && self.environment == "production"
    }
}

fn load_wallet_key(path: &str) -> anyhow::Result<Option<String>> {
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let parsed: WalletKeyFile = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid wallet key file {}: {}", path, e))?;
    Ok(Some(parsed.private_key))
}

// Internal helper that checks conditions for `env_flag`.
fn env_flag(name: &str) -> bool {
    env::var(name)
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
        })
        .unwrap_or(false)
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3002,
            environment: "test".to_string(),
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            private_key: "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
                .to_string(),
            token_list_path: "data/valid_tokens.json".to_string(),
            swap_router_address: UNISWAP_SWAP_ROUTER_02.to_string(),
            quoter_address: UNISWAP_QUOTER_V1.to_string(),
            pool_fee: DEFAULT_POOL_FEE,
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            account_nft_address: DEFAULT_ACCOUNT_NFT_CONTRACT.to_string(),
            custody_address: DEFAULT_CUSTODY_ADDRESS.to_string(),
            tokenbound_registry: TOKENBOUND_REGISTRY.to_string(),
            tokenbound_proxy: TOKENBOUND_ACCOUNT_PROXY.to_string(),
            tokenbound_implementation: TOKENBOUND_ACCOUNT_IMPLEMENTATION.to_string(),
            alchemy_api_key: None,
            alchemy_network: DEFAULT_ALCHEMY_NETWORK.to_string(),
            ao_wallet_key: "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
                .to_string(),
            ao_mu_url: DEFAULT_AO_MU_URL.to_string(),
            ao_cu_url: DEFAULT_AO_CU_URL.to_string(),
            ao_module: DEFAULT_AO_MODULE.to_string(),
            ao_scheduler: DEFAULT_AO_SCHEDULER.to_string(),
            ao_registry_process: DEFAULT_AO_REGISTRY_PROCESS.to_string(),
            ao_inbox_process: DEFAULT_AO_INBOX_PROCESS.to_string(),
            ao_price_process: DEFAULT_AO_PRICE_PROCESS.to_string(),
            ao_chat_process: None,
            ao_dryrun_owner: DEFAULT_AO_DRYRUN_OWNER.to_string(),
            irys_url: DEFAULT_IRYS_URL.to_string(),
            irys_token: DEFAULT_IRYS_TOKEN.to_string(),
            base_token_symbol: DEFAULT_BASE_TOKEN_SYMBOL.to_string(),
            price_tokens: parse_symbol_list(DEFAULT_PRICE_TOKENS),
            inbox_poll_secs: INBOX_POLL_INTERVAL_SECS,
            price_poll_secs: PRICE_POLL_INTERVAL_SECS,
            enable_inbox_poller: false,
            enable_price_poller: false,
            cors_allowed_origins: "*".to_string(),
        }
    }
}
