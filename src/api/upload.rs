use super::AppState;
use crate::{
    error::{AppError, Result},
    models::Tag,
};
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

const FILE_FIELD: &str = "encryptedFile";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub receipt: String,
}

/// Uploaded file with the tags it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPayload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadPayload {
    pub fn tags(&self) -> Vec<Tag> {
        vec![
            Tag::new("Content-Type", self.content_type.clone()),
            Tag::new("conversation-id", self.file_name.clone()),
        ]
    }
}

async fn read_file(mut multipart: Multipart) -> Result<UploadPayload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("conversation").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", FILE_FIELD, e)))?;
        return Ok(UploadPayload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::BadRequest(format!("Missing {} field", FILE_FIELD)))
}

/// Stores `payload` and returns the gateway receipt.
pub async fn store(state: &AppState, payload: UploadPayload) -> Result<UploadResponse> {
    let tags = payload.tags();
    let size = payload.bytes.len();
    let id = state.blobs.upload(payload.bytes, tags).await?;
    let receipt = state.blobs.receipt_url(&id);
    tracing::info!("Data uploaded ({} bytes) ==> {}", size, receipt);
    Ok(UploadResponse {
        success: true,
        receipt,
    })
}

/// POST /upload
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let payload = read_file(multipart).await?;
    Ok(Json(store(&state, payload).await?))
}
