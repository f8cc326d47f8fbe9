use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::data_item::{decode_id, fresh_anchor, DataItemDraft, DataItemSigner};
use super::ProcessBus;
use crate::{
    config::Config,
    constants::HTTP_CLIENT_TIMEOUT_SECS,
    error::{AppError, Result},
    models::Tag,
};

const SDK_NAME: &str = "aoconnect";
const VARIANT: &str = "ao.TN.1";
const SPAWN_DATA: &str = "1984";

#[derive(Debug, Deserialize)]
struct MuResponse {
    id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DryRunRequest<'a> {
    id: &'a str,
    target: &'a str,
    owner: &'a str,
    anchor: &'a str,
    data: &'a str,
    tags: Vec<Tag>,
}

/// HTTP client for the AO messenger (MU) and compute (CU) units.
#[derive(Clone)]
pub struct AoClient {
    http: Client,
    mu_url: String,
    cu_url: String,
    module: String,
    scheduler: String,
    dryrun_owner: String,
    signer: DataItemSigner,
}

impl AoClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
            .build()?;
        let signer = DataItemSigner::from_private_key(&config.ao_wallet_key)?;
        tracing::info!("AO signer owner 0x{}", hex::encode(signer.owner()));
        Ok(Self {
            http,
            mu_url: config.ao_mu_url.trim_end_matches('/').to_string(),
            cu_url: config.ao_cu_url.trim_end_matches('/').to_string(),
            module: config.ao_module.clone(),
            scheduler: config.ao_scheduler.clone(),
            dryrun_owner: config.ao_dryrun_owner.clone(),
            signer,
        })
    }

    async fn post_item(&self, draft: DataItemDraft) -> Result<String> {
        let item = self.signer.sign(draft).await?;
        let response: MuResponse = self
            .http
            .post(format!("{}/", self.mu_url))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(item.bytes)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.id.unwrap_or(item.id))
    }

    fn cu_endpoint(&self, path: &str, process_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.cu_url, path))
            .map_err(|e| AppError::Internal(format!("Invalid CU URL: {}", e)))?;
        url.query_pairs_mut().append_pair("process-id", process_id);
        Ok(url)
    }
}

pub fn message_tags(user_tags: Vec<Tag>) -> Vec<Tag> {
    let mut tags = vec![
        Tag::new("Data-Protocol", "ao"),
        Tag::new("Variant", VARIANT),
        Tag::new("Type", "Message"),
        Tag::new("SDK", SDK_NAME),
    ];
    tags.extend(user_tags);
    tags
}

pub fn process_tags(module: &str, scheduler: &str, user_tags: Vec<Tag>) -> Vec<Tag> {
    let mut tags = vec![
        Tag::new("Data-Protocol", "ao"),
        Tag::new("Variant", VARIANT),
        Tag::new("Type", "Process"),
        Tag::new("Module", module),
        Tag::new("Scheduler", scheduler),
        Tag::new("SDK", SDK_NAME),
    ];
    tags.extend(user_tags);
    tags
}

/// Output string of a dry-run: `Output.data.output`, or `Output.data` when it is a string.
pub fn extract_output(response: &Value) -> Result<String> {
    if let Some(error) = response.get("Error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(AppError::ExternalAPI(format!("AO evaluation error: {}", message)));
    }

    let output = response
        .pointer("/Output/data/output")
        .or_else(|| response.pointer("/Output/data"))
        .ok_or_else(|| AppError::ExternalAPI("AO response has no output".to_string()))?;
    Ok(match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[async_trait]
impl ProcessBus for AoClient {
    async fn spawn(&self, tags: Vec<Tag>) -> Result<String> {
        let process_id = self
            .post_item(DataItemDraft {
                target: None,
                anchor: Some(fresh_anchor()),
                tags: process_tags(&self.module, &self.scheduler, tags),
                data: SPAWN_DATA.as_bytes().to_vec(),
            })
            .await?;
        tracing::info!("Spawned AO process {}", process_id);
        Ok(process_id)
    }

    async fn message(&self, process_id: &str, tags: Vec<Tag>, data: String) -> Result<String> {
        let message_id = self
            .post_item(DataItemDraft {
                target: Some(decode_id(process_id)?),
                anchor: Some(fresh_anchor()),
                tags: message_tags(tags),
                data: data.into_bytes(),
            })
            .await?;
        tracing::debug!("Sent message {} to {}", message_id, process_id);
        Ok(message_id)
    }

    async fn dryrun(&self, process_id: &str, tags: Vec<Tag>, data: String) -> Result<String> {
        let url = self.cu_endpoint("dry-run", process_id)?;
        let body = DryRunRequest {
            id: "1234",
            target: process_id,
            owner: &self.dryrun_owner,
            anchor: "0",
            data: &data,
            tags: message_tags(tags),
        };
        let response: Value = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        extract_output(&response)
    }

    async fn result(&self, process_id: &str, message_id: &str) -> Result<Value> {
        let url = self.cu_endpoint(&format!("result/{}", message_id), process_id)?;
        let response = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }
}
