use async_trait::async_trait;
use ethers::{
    abi::Token,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Bytes, TransactionReceipt, TransactionRequest, H256, U256, U64},
    utils::{id, keccak256},
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    constants::{MINT_GAS_BUFFER, MINT_GAS_PRICE_BUMP_PERCENT, MULTICALL3, VALID_SIGNER_MAGIC},
    error::{AppError, Result},
    utils::parse_address,
};

pub type SignedClient = SignerMiddleware<Provider<Http>, LocalWallet>;

ethers::contract::abigen!(
    Erc20,
    r#"[
        function balanceOf(address) view returns (uint256)
    ]"#
);

ethers::contract::abigen!(
    TokenboundAccount,
    r#"[
        function token() view returns (uint256, address, uint256)
        function isValidSigner(address signer, bytes context) view returns (bytes4)
    ]"#
);

ethers::contract::abigen!(
    Erc6551Registry,
    r#"[
        function account(address implementation, bytes32 salt, uint256 chainId, address tokenContract, uint256 tokenId) view returns (address)
    ]"#
);

ethers::contract::abigen!(
    AccountNftContract,
    r#"[
        function totalSupply() view returns (uint256)
        function safeMint(address to, string uri)
    ]"#
);

/// NFT a token-bound account is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundNft {
    pub chain_id: U256,
    pub token_contract: Address,
    pub token_id: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintedNft {
    pub tx_hash: H256,
    pub token_id: U256,
}

/// Everything the service needs from the EVM chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the service wallet that signs every transaction.
    fn service_address(&self) -> Address;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    /// Sends a transaction from the service wallet.
    async fn send_call(&self, to: Address, value: U256, data: Bytes) -> Result<H256>;

    /// Waits for a receipt with status 1. `label` names the step in errors.
    async fn wait_for_receipt(&self, tx_hash: H256, timeout: Duration, label: &str) -> Result<()>;

    async fn is_valid_signer(&self, account: Address, signer: Address) -> Result<bool>;

    async fn bound_nft(&self, account: Address) -> Result<BoundNft>;

    async fn account_address(&self, token_contract: Address, token_id: U256) -> Result<Address>;

    async fn create_account(&self, token_contract: Address, token_id: U256) -> Result<H256>;

    async fn nft_total_supply(&self, contract: Address) -> Result<U256>;

    async fn mint_account_nft(
        &self,
        contract: Address,
        to: Address,
        token_uri: &str,
    ) -> Result<MintedNft>;

    /// Calls `to` through a token-bound account (`execute(to, value, data, 0)`).
    async fn execute(&self, account: Address, to: Address, value: U256, data: Bytes) -> Result<H256> {
        self.send_call(account, U256::zero(), encode_execute(to, value, data))
            .await
    }
}

pub struct EvmClient {
    provider: Arc<Provider<Http>>,
    signer: Arc<SignedClient>,
    chain_id: u64,
    registry: Address,
    account_proxy: Address,
    account_implementation: Address,
    multicall: Address,
}

impl EvmClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| AppError::Internal(format!("Invalid RPC URL: {}", e)))?;
        let wallet = LocalWallet::from_str(config.private_key.trim())
            .map_err(|e| AppError::Internal(format!("Invalid PRIVATE_KEY: {}", e)))?
            .with_chain_id(config.chain_id);
        let signer = SignerMiddleware::new(provider.clone(), wallet);

        Ok(Self {
            provider: Arc::new(provider),
            signer: Arc::new(signer),
            chain_id: config.chain_id,
            registry: parse_address(&config.tokenbound_registry, "registry")?,
            account_proxy: parse_address(&config.tokenbound_proxy, "account proxy")?,
            account_implementation: parse_address(
                &config.tokenbound_implementation,
                "account implementation",
            )?,
            multicall: parse_address(MULTICALL3, "multicall")?,
        })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    async fn receipt(&self, tx_hash: H256, timeout: Duration) -> Result<TransactionReceipt> {
        let pending = PendingTransaction::new(tx_hash, self.provider.as_ref());
        tokio::time::timeout(timeout, pending)
            .await
            .map_err(|_| AppError::ReceiptTimeout(format!("{:?}", tx_hash)))?
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?
            .ok_or_else(|| AppError::BlockchainRPC(format!("Transaction {:?} was dropped", tx_hash)))
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    fn service_address(&self) -> Address {
        self.signer.address()
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        Erc20::new(token, self.provider.clone())
            .balance_of(owner)
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    }

    async fn send_call(&self, to: Address, value: U256, data: Bytes) -> Result<H256> {
        let tx = TransactionRequest::new().to(to).value(value).data(data);
        let pending = self
            .signer
            .send_transaction(tx, None)
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        tracing::debug!("Submitted transaction {:?} to {:?}", tx_hash, to);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: H256, timeout: Duration, label: &str) -> Result<()> {
        let receipt = self.receipt(tx_hash, timeout).await?;
        if receipt.status != Some(U64::from(1)) {
            return Err(AppError::TransactionReverted(format!(
                "{} failed ({:?})",
                label, tx_hash
            )));
        }
        tracing::debug!("{} confirmed in block {:?}", label, receipt.block_number);
        Ok(())
    }

    async fn is_valid_signer(&self, account: Address, signer: Address) -> Result<bool> {
        let magic = TokenboundAccount::new(account, self.provider.clone())
            .is_valid_signer(signer, Bytes::new())
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        Ok(magic == VALID_SIGNER_MAGIC)
    }

    async fn bound_nft(&self, account: Address) -> Result<BoundNft> {
        let (chain_id, token_contract, token_id) =
            TokenboundAccount::new(account, self.provider.clone())
                .token()
                .call()
                .await
                .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        Ok(BoundNft {
            chain_id,
            token_contract,
            token_id,
        })
    }

    async fn account_address(&self, token_contract: Address, token_id: U256) -> Result<Address> {
        Erc6551Registry::new(self.registry, self.provider.clone())
            .account(
                self.account_proxy,
                [0u8; 32],
                U256::from(self.chain_id),
                token_contract,
                token_id,
            )
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    }

    async fn create_account(&self, token_contract: Address, token_id: U256) -> Result<H256> {
        let account = self.account_address(token_contract, token_id).await?;
        let create = encode_create_account(
            self.account_proxy,
            U256::from(self.chain_id),
            token_contract,
            token_id,
        );
        let initialize = encode_call("initialize(address)", &[Token::Address(self.account_implementation)]);
        let data = encode_aggregate3(&[(self.registry, create), (account, initialize)]);
        self.send_call(self.multicall, U256::zero(), data).await
    }

    async fn nft_total_supply(&self, contract: Address) -> Result<U256> {
        AccountNftContract::new(contract, self.provider.clone())
            .total_supply()
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))
    }

    async fn mint_account_nft(
        &self,
        contract: Address,
        to: Address,
        token_uri: &str,
    ) -> Result<MintedNft> {
        let nft = AccountNftContract::new(contract, self.signer.clone());
        let call = nft.safe_mint(to, token_uri.to_string()).legacy();
        let estimated = call
            .estimate_gas()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        let call = call
            .gas(estimated + U256::from(MINT_GAS_BUFFER))
            .gas_price(gas_price * U256::from(MINT_GAS_PRICE_BUMP_PERCENT) / U256::from(100u64));

        let tx_hash = call
            .send()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?
            .tx_hash();
        tracing::info!("Minting transaction sent: {:?}", tx_hash);

        let receipt = self
            .receipt(tx_hash, Duration::from_secs(crate::constants::DEFAULT_RECEIPT_TIMEOUT_SECS))
            .await?;
        if receipt.status != Some(U64::from(1)) {
            return Err(AppError::TransactionReverted(format!("Mint failed ({:?})", tx_hash)));
        }

        let token_id = minted_token_id(&receipt, contract).ok_or_else(|| {
            AppError::BlockchainRPC(format!("No Transfer event in mint receipt {:?}", tx_hash))
        })?;
        Ok(MintedNft { tx_hash, token_id })
    }
}

// ==================== CALLDATA ====================

/// Selector of `signature` followed by the ABI-encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(ethers::abi::encode(args));
    data.into()
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    encode_call(
        "approve(address,uint256)",
        &[Token::Address(spender), Token::Uint(amount)],
    )
}

pub fn encode_transfer(recipient: Address, amount: U256) -> Bytes {
    encode_call(
        "transfer(address,uint256)",
        &[Token::Address(recipient), Token::Uint(amount)],
    )
}

pub fn encode_transfer_from(from: Address, to: Address, token_id: U256) -> Bytes {
    encode_call(
        "transferFrom(address,address,uint256)",
        &[Token::Address(from), Token::Address(to), Token::Uint(token_id)],
    )
}

pub fn encode_execute(to: Address, value: U256, data: Bytes) -> Bytes {
    encode_call(
        "execute(address,uint256,bytes,uint8)",
        &[
            Token::Address(to),
            Token::Uint(value),
            Token::Bytes(data.to_vec()),
            Token::Uint(U256::zero()),
        ],
    )
}

fn encode_create_account(
    implementation: Address,
    chain_id: U256,
    token_contract: Address,
    token_id: U256,
) -> Bytes {
    encode_call(
        "createAccount(address,bytes32,uint256,address,uint256)",
        &[
            Token::Address(implementation),
            Token::FixedBytes(vec![0u8; 32]),
            Token::Uint(chain_id),
            Token::Address(token_contract),
            Token::Uint(token_id),
        ],
    )
}

fn encode_aggregate3(calls: &[(Address, Bytes)]) -> Bytes {
    let calls = calls
        .iter()
        .map(|(target, data)| {
            Token::Tuple(vec![
                Token::Address(*target),
                Token::Bool(false),
                Token::Bytes(data.to_vec()),
            ])
        })
        .collect();
    encode_call("aggregate3((address,bool,bytes)[])", &[Token::Array(calls)])
}

/// Selector of an encoded call, if it carries one.
pub fn selector_of(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4).map(|s| [s[0], s[1], s[2], s[3]])
}

fn minted_token_id(receipt: &TransactionReceipt, contract: Address) -> Option<U256> {
    let transfer_topic = H256::from(keccak256("Transfer(address,address,uint256)"));
    receipt
        .logs
        .iter()
        .filter(|log| log.address == contract)
        .find(|log| log.topics.len() == 4 && log.topics[0] == transfer_topic)
        .map(|log| U256::from_big_endian(log.topics[3].as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Log;

    #[test]
    fn approve_calldata_uses_erc20_selector() {
        let spender = Address::repeat_byte(0x11);
        let data = encode_approve(spender, U256::from(5u64));
        assert_eq!(selector_of(&data), Some([0x09, 0x5e, 0xa7, 0xb3]));
        assert_eq!(data.len(), 4 + 64);
    }

    #[test]
    fn transfer_calldata_uses_erc20_selector() {
        let data = encode_transfer(Address::repeat_byte(0x22), U256::one());
        assert_eq!(selector_of(&data), Some([0xa9, 0x05, 0x9c, 0xbb]));
    }

    #[test]
    fn execute_wraps_inner_call() {
        let inner = encode_approve(Address::repeat_byte(0x11), U256::from(7u64));
        let data = encode_execute(Address::repeat_byte(0x33), U256::zero(), inner.clone());
        assert_eq!(selector_of(&data), Some([0x51, 0x94, 0x54, 0x47]));
        let decoded = ethers::abi::decode(
            &[
                ethers::abi::ParamType::Address,
                ethers::abi::ParamType::Uint(256),
                ethers::abi::ParamType::Bytes,
                ethers::abi::ParamType::Uint(8),
            ],
            &data[4..],
        )
        .expect("decode execute");
        assert_eq!(decoded[2], Token::Bytes(inner.to_vec()));
    }

    #[test]
    fn minted_token_id_reads_transfer_topic() {
        let contract = Address::repeat_byte(0x44);
        let transfer_topic = H256::from(keccak256("Transfer(address,address,uint256)"));
        let mut token_topic = [0u8; 32];
        U256::from(42u64).to_big_endian(&mut token_topic);
        let receipt = TransactionReceipt {
            logs: vec![Log {
                address: contract,
                topics: vec![
                    transfer_topic,
                    H256::zero(),
                    H256::repeat_byte(0x01),
                    H256::from(token_topic),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(minted_token_id(&receipt, contract), Some(U256::from(42u64)));
        assert_eq!(minted_token_id(&receipt, Address::zero()), None);
    }
}
