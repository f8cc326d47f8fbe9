use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    config::Config,
    constants::{HTTP_CLIENT_TIMEOUT_SECS, IRYS_GATEWAY_URL},
    error::Result,
    integrations::ao::data_item::{fresh_anchor, DataItemDraft, DataItemSigner},
    models::Tag,
};

/// Permanent storage for uploaded blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `data` with `tags`; returns the stored item id.
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<String>;

    fn receipt_url(&self, id: &str) -> String {
        format!("{}/{}", IRYS_GATEWAY_URL, id)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Clone)]
pub struct IrysUploader {
    http: Client,
    node_url: String,
    token: String,
    signer: DataItemSigner,
}

impl IrysUploader {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            node_url: config.irys_url.trim_end_matches('/').to_string(),
            token: config.irys_token.clone(),
            signer: DataItemSigner::from_private_key(&config.private_key)?,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/tx/{}", self.node_url, self.token)
    }
}

#[async_trait]
impl BlobStore for IrysUploader {
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<String> {
        let size = data.len();
        let item = self
            .signer
            .sign(DataItemDraft {
                target: None,
                anchor: Some(fresh_anchor()),
                tags,
                data,
            })
            .await?;

        let response: UploadResponse = self
            .http
            .post(self.upload_url())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(item.bytes)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::info!("Uploaded {} bytes to Irys as {}", size, response.id);
        Ok(response.id)
    }
}
