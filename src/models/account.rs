use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==================== ACCOUNTS ====================
/// Metadata stored verbatim as the account NFT's token URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub wallet_address: String,
    #[serde(default)]
    pub account_address: String,
    #[serde(default)]
    pub attributes: Vec<Value>,
}

impl AccountMetadata {
    pub fn new(wallet: &str, account: &str, name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            wallet_address: wallet.to_string(),
            account_address: account.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn to_token_uri(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_token_uri(uri: &str) -> serde_json::Result<Self> {
        serde_json::from_str(uri)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub account_address: String,
    pub name: String,
    pub description: String,
}

impl From<AccountMetadata> for AccountRecord {
    fn from(meta: AccountMetadata) -> Self {
        Self {
            account_address: meta.account_address,
            name: meta.name,
            description: meta.description,
        }
    }
}

/// NFT as listed by the indexer.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedNft {
    pub contract_address: String,
    pub token_id: String,
    pub token_uri: Option<String>,
}

impl IndexedNft {
    pub fn token_id_number(&self) -> Option<u64> {
        self.token_id.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_uses_camel_case_keys() {
        let meta = AccountMetadata::new("0xwallet", "0xaccount", "Trader", "Main account");
        let uri = meta.to_token_uri().expect("serialize");
        assert!(uri.contains("\"walletAddress\":\"0xwallet\""));
        assert!(uri.contains("\"accountAddress\":\"0xaccount\""));
        assert!(uri.contains("\"attributes\":[]"));
        assert_eq!(AccountMetadata::from_token_uri(&uri).expect("parse"), meta);
    }
}
