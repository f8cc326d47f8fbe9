use async_trait::async_trait;
use ethers::types::Address;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::{
    config::Config,
    constants::HTTP_CLIENT_TIMEOUT_SECS,
    error::{AppError, Result},
    models::IndexedNft,
};

/// Lists NFTs of a collection.
#[async_trait]
pub trait NftIndexer: Send + Sync {
    async fn nfts_for_contract(&self, contract: Address) -> Result<Vec<IndexedNft>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NftsForContractPage {
    #[serde(default)]
    nfts: Vec<AlchemyNft>,
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlchemyNft {
    contract: AlchemyContract,
    token_id: String,
    #[serde(default)]
    raw: Option<AlchemyRaw>,
}

#[derive(Debug, Deserialize)]
struct AlchemyContract {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlchemyRaw {
    token_uri: Option<Value>,
}

impl From<AlchemyNft> for IndexedNft {
    fn from(nft: AlchemyNft) -> Self {
        let token_uri = nft.raw.and_then(|raw| raw.token_uri).and_then(|uri| match uri {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        Self {
            contract_address: nft.contract.address,
            token_id: nft.token_id,
            token_uri,
        }
    }
}

/// Alchemy NFT API v3 client.
#[derive(Clone)]
pub struct AlchemyNftClient {
    http: Client,
    api_key: Option<String>,
    network: String,
}

impl AlchemyNftClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_key: config.alchemy_api_key.clone(),
            network: config.alchemy_network.clone(),
        })
    }

    fn page_url(&self, contract: Address, page_key: Option<&str>) -> Result<Url> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::ExternalAPI("ALCHEMY_API_KEY is not configured".to_string()))?;
        let mut url = Url::parse(&format!(
            "https://{}.g.alchemy.com/nft/v3/{}/getNFTsForContract",
            self.network, api_key
        ))
        .map_err(|e| AppError::Internal(format!("Invalid Alchemy URL: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("contractAddress", &format!("{:?}", contract))
                .append_pair("withMetadata", "true");
            if let Some(key) = page_key {
                query.append_pair("startToken", key);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl NftIndexer for AlchemyNftClient {
    async fn nfts_for_contract(&self, contract: Address) -> Result<Vec<IndexedNft>> {
        let mut nfts = Vec::new();
        let mut page_key: Option<String> = None;

        loop {
            let url = self.page_url(contract, page_key.as_deref())?;
            let page: NftsForContractPage = self
                .http
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            nfts.extend(page.nfts.into_iter().map(IndexedNft::from));
            match page.page_key {
                Some(next) if !next.is_empty() => page_key = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Indexer returned {} NFTs for {:?}", nfts.len(), contract);
        Ok(nfts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parses_token_uri_and_page_key() {
        let raw = r#"{
            "nfts": [
                {"contract": {"address": "0xabc"}, "tokenId": "19",
                 "raw": {"tokenUri": "{\"name\":\"a\"}", "metadata": {}}},
                {"contract": {"address": "0xabc"}, "tokenId": "20", "raw": {"tokenUri": null}}
            ],
            "pageKey": "0x15"
        }"#;
        let page: NftsForContractPage = serde_json::from_str(raw).expect("page");
        assert_eq!(page.page_key.as_deref(), Some("0x15"));
        let nfts: Vec<IndexedNft> = page.nfts.into_iter().map(IndexedNft::from).collect();
        assert_eq!(nfts[0].token_uri.as_deref(), Some("{\"name\":\"a\"}"));
        assert_eq!(nfts[0].token_id_number(), Some(19));
        assert_eq!(nfts[1].token_uri, None);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let client = AlchemyNftClient::from_config(&Config::for_tests()).expect("client");
        assert!(client.page_url(Address::zero(), None).is_err());
    }

    #[test]
    fn page_url_carries_start_token() {
        let mut config = Config::for_tests();
        config.alchemy_api_key = Some("key".to_string());
        let client = AlchemyNftClient::from_config(&config).expect("client");
        let url = client.page_url(Address::zero(), Some("0x15")).expect("url");
        assert!(url.as_str().starts_with("https://polygon-mainnet.g.alchemy.com/nft/v3/key/"));
        assert!(url.as_str().contains("startToken=0x15"));
        assert!(url.as_str().contains("withMetadata=true"));
    }
}
