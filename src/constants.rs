/// Application constants

// Polygon PoS
pub const DEFAULT_CHAIN_ID: u64 = 137;

// Uniswap V3 (Polygon)
pub const UNISWAP_SWAP_ROUTER_02: &str = "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45";
pub const UNISWAP_QUOTER_V1: &str = "0xb27308f9F90D607463bb33eA1BeBb41C27CE5AB6";
pub const DEFAULT_POOL_FEE: u32 = 3000; // 0.3%
pub const DEFAULT_SLIPPAGE_BPS: u32 = 500; // 5%
pub const DEFAULT_SWAP_DEADLINE_SECS: i64 = 1800;
pub const SINGLE_HOP_GAS_ESTIMATE: u64 = 160_000;

// ERC-6551 token-bound accounts
pub const TOKENBOUND_REGISTRY: &str = "0x000000006551c19487814612e58FE06813775758";
pub const TOKENBOUND_ACCOUNT_PROXY: &str = "0x55266d75D1a14E4572138116aF39863Ed6596E7F";
pub const TOKENBOUND_ACCOUNT_IMPLEMENTATION: &str = "0x41C8f39463A868d3A88af00cd0fe7102F30E44eC";
pub const MULTICALL3: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";
pub const VALID_SIGNER_MAGIC: [u8; 4] = [0x52, 0x3e, 0x32, 0x60];

// Account NFTs
pub const DEFAULT_ACCOUNT_NFT_CONTRACT: &str = "0x68a8bbfcecc2BC751b99a107E03a73eAc2A31d58";
pub const DEFAULT_CUSTODY_ADDRESS: &str = "0x94680ae28E4aa5Fe02e047f8411b19076e70E9AE";
pub const LEGACY_ACCOUNT_TOKEN_ID_CUTOFF: u64 = 18;
pub const MINT_GAS_BUFFER: u64 = 50_000;
pub const MINT_GAS_PRICE_BUMP_PERCENT: u64 = 110;

// Base token for inbox orders and price relays
pub const DEFAULT_BASE_TOKEN_SYMBOL: &str = "USDT";
pub const WRAPPED_NATIVE_SYMBOL: &str = "WMATIC";
pub const DEFAULT_PRICE_TOKENS: &str = "UNI,WMATIC,WETH";
pub const PRICE_QUOTE_AMOUNT: &str = "1.0";

// AO network
pub const DEFAULT_AO_MU_URL: &str = "https://mu.ao-testnet.xyz";
pub const DEFAULT_AO_CU_URL: &str = "https://cu.ao-testnet.xyz";
pub const DEFAULT_AO_MODULE: &str = "cNlipBptaF9JeFAf4wUmpi43EojNanIBos3EfNrEOWo";
pub const DEFAULT_AO_SCHEDULER: &str = "_GQ33BkPtZrqxA84vM8Zk-N2aO0toNNu_C-l-rawrBA";
pub const DEFAULT_AO_REGISTRY_PROCESS: &str = "fFHf9C18ty22vHcTIzDlTVcLc489mTnzdpaDmZYW5tE";
pub const DEFAULT_AO_INBOX_PROCESS: &str = "PCWYFhkCnwsXF3iXgN3Uo6YLewCW8YE0DJ0qJorhu7Q";
pub const DEFAULT_AO_PRICE_PROCESS: &str = "huh62dyyOfaxHs7YE5Y8_xv_M57TXYsBWvFxsTXsItE";
pub const DEFAULT_AO_DRYRUN_OWNER: &str = "AyhDJl1T16qJE1iksd_EgyMjdzXqZ8YuSAJGss1M4iY";

// Irys
pub const DEFAULT_IRYS_URL: &str = "https://node1.irys.xyz";
pub const DEFAULT_IRYS_TOKEN: &str = "matic";
pub const IRYS_GATEWAY_URL: &str = "https://gateway.irys.xyz";

// Alchemy NFT API
pub const DEFAULT_ALCHEMY_NETWORK: &str = "polygon-mainnet";

// Receipt waits
pub const APPROVAL_RECEIPT_TIMEOUT_SECS: u64 = 30;
pub const MULTICALL_RECEIPT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;

// Background service intervals
pub const INBOX_POLL_INTERVAL_SECS: u64 = 10;
pub const PRICE_POLL_INTERVAL_SECS: u64 = 60;
pub const PRICE_RESULT_DELAY_MS: u64 = 2_000;

pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 30;

// Upload cap; axum defaults to 2 MB
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
