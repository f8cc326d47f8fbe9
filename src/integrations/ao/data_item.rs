//! ANS-104 data items signed with an Ethereum key (signature type 3).
//!
//! Layout:
//! `sig_type u16 LE | signature (65) | owner (65) | target? | anchor? |
//!  tag count u64 LE | tag bytes len u64 LE | tags (avro) | data`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ethers::signers::{LocalWallet, Signer};
use sha2::{Digest, Sha256, Sha384};
use std::str::FromStr;

use crate::{
    error::{AppError, Result},
    models::Tag,
};

pub const ETHEREUM_SIGNATURE_TYPE: u16 = 3;
pub const SIGNATURE_LENGTH: usize = 65;
pub const OWNER_LENGTH: usize = 65;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDataItem {
    pub id: String,
    pub bytes: Vec<u8>,
}

/// Item fields before signing.
#[derive(Debug, Clone, Default)]
pub struct DataItemDraft {
    pub target: Option<[u8; 32]>,
    pub anchor: Option<[u8; 32]>,
    pub tags: Vec<Tag>,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct DataItemSigner {
    wallet: LocalWallet,
    owner: Vec<u8>,
}

impl DataItemSigner {
    pub fn from_private_key(key: &str) -> Result<Self> {
        let wallet = LocalWallet::from_str(key.trim())
            .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
        let owner = wallet
            .signer()
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Ok(Self { wallet, owner })
    }

    /// Uncompressed secp256k1 public key.
    pub fn owner(&self) -> &[u8] {
        &self.owner
    }

    pub async fn sign(&self, draft: DataItemDraft) -> Result<SignedDataItem> {
        let tags = encode_tags(&draft.tags);
        let message = signature_data(&self.owner, &draft, &tags);
        let signature = self
            .wallet
            .sign_message(&message[..])
            .await
            .map_err(|e| AppError::Internal(format!("Data item signing failed: {}", e)))?
            .to_vec();
        if signature.len() != SIGNATURE_LENGTH {
            return Err(AppError::Internal(format!(
                "Unexpected signature length {}",
                signature.len()
            )));
        }

        let bytes = assemble(&signature, &self.owner, &draft, &tags);
        let id = URL_SAFE_NO_PAD.encode(Sha256::digest(&signature));
        Ok(SignedDataItem { id, bytes })
    }
}

fn assemble(signature: &[u8], owner: &[u8], draft: &DataItemDraft, tags: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + signature.len() + owner.len() + 82 + tags.len() + draft.data.len());
    out.extend_from_slice(&ETHEREUM_SIGNATURE_TYPE.to_le_bytes());
    out.extend_from_slice(signature);
    out.extend_from_slice(owner);
    push_optional(&mut out, draft.target.as_ref());
    push_optional(&mut out, draft.anchor.as_ref());
    out.extend_from_slice(&(draft.tags.len() as u64).to_le_bytes());
    out.extend_from_slice(&(tags.len() as u64).to_le_bytes());
    out.extend_from_slice(tags);
    out.extend_from_slice(&draft.data);
    out
}

fn push_optional(out: &mut Vec<u8>, value: Option<&[u8; 32]>) {
    match value {
        Some(bytes) => {
            out.push(1);
            out.extend_from_slice(bytes);
        }
        None => out.push(0),
    }
}

fn signature_data(owner: &[u8], draft: &DataItemDraft, tags: &[u8]) -> [u8; 48] {
    let sig_type = ETHEREUM_SIGNATURE_TYPE.to_string();
    let target = draft.target.map(|t| t.to_vec()).unwrap_or_default();
    let anchor = draft.anchor.map(|a| a.to_vec()).unwrap_or_default();
    deep_hash(&DeepHashItem::List(vec![
        DeepHashItem::Blob(b"dataitem".to_vec()),
        DeepHashItem::Blob(b"1".to_vec()),
        DeepHashItem::Blob(sig_type.into_bytes()),
        DeepHashItem::Blob(owner.to_vec()),
        DeepHashItem::Blob(target),
        DeepHashItem::Blob(anchor),
        DeepHashItem::Blob(tags.to_vec()),
        DeepHashItem::Blob(draft.data.clone()),
    ]))
}

// ==================== DEEP HASH ====================

#[derive(Debug, Clone)]
pub enum DeepHashItem {
    Blob(Vec<u8>),
    List(Vec<DeepHashItem>),
}

pub fn deep_hash(item: &DeepHashItem) -> [u8; 48] {
    match item {
        DeepHashItem::Blob(data) => {
            let tag = sha384(format!("blob{}", data.len()).as_bytes());
            let body = sha384(data);
            sha384(&[tag.as_slice(), body.as_slice()].concat())
        }
        DeepHashItem::List(items) => {
            let mut acc = sha384(format!("list{}", items.len()).as_bytes());
            for child in items {
                let child_hash = deep_hash(child);
                acc = sha384(&[acc.as_slice(), child_hash.as_slice()].concat());
            }
            acc
        }
    }
}

fn sha384(data: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(&Sha384::digest(data));
    out
}

// ==================== TAGS ====================

/// Avro array of `{name: bytes, value: bytes}` records. No tags encode to zero bytes.
pub fn encode_tags(tags: &[Tag]) -> Vec<u8> {
    if tags.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    write_long(&mut out, tags.len() as i64);
    for tag in tags {
        write_bytes(&mut out, tag.name.as_bytes());
        write_bytes(&mut out, tag.value.as_bytes());
    }
    write_long(&mut out, 0);
    out
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

fn write_long(out: &mut Vec<u8>, value: i64) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n & !0x7f != 0 {
        out.push(((n & 0x7f) | 0x80) as u8);
        n >>= 7;
    }
    out.push(n as u8);
}

/// Decodes a 43-char base64url process or message id into its 32 raw bytes.
pub fn decode_id(id: &str) -> Result<[u8; 32]> {
    let raw = URL_SAFE_NO_PAD
        .decode(id.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid process id: {}", id)))?;
    raw.try_into()
        .map_err(|_| AppError::BadRequest(format!("Invalid process id length: {}", id)))
}

/// 32-byte anchor unique per call.
pub fn fresh_anchor() -> [u8; 32] {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut anchor = [0u8; 32];
    anchor.copy_from_slice(format!("{:032}", nanos.unsigned_abs()).as_bytes());
    anchor
}
