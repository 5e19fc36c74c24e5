//! Upload batch construction and the object-store naming rules.
//!
//! The naming and payload rules are applied by the upload endpoint; they
//! live here so the in-memory service behaves exactly like the real one.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Content type every upload is stored with.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// One file of an upload batch, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItem {
    pub file_name: String,
    pub file_type: String,
    /// `data:` URL or raw base64.
    #[serde(rename = "blob")]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl UploadItem {
    /// The `index`-th JPEG of a batch.
    pub fn jpeg(index: usize, payload: String, correlation_id: impl Into<String>) -> Self {
        Self {
            file_name: format!("image-{}.jpg", index),
            file_type: JPEG_CONTENT_TYPE.to_string(),
            payload,
            correlation_id: Some(correlation_id.into()),
        }
    }
}

/// Request body of the upload call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBatch {
    pub files: Vec<UploadItem>,
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Object key for an upload: `uploads/{uuid}-{stem}.jpg`, where `stem` is
/// the sanitized name without its last extension.
pub fn object_key(file_name: &str) -> String {
    let sanitized = sanitize_file_name(file_name);
    let stem = match sanitized.rfind('.') {
        Some(dot) if dot + 1 < sanitized.len() => &sanitized[..dot],
        _ => sanitized.as_str(),
    };
    format!("uploads/{}-{}.jpg", uuid::Uuid::new_v4(), stem)
}

/// Decode an upload payload to bytes.
///
/// Returns `None` for payloads the endpoint skips: `blob:` handles, empty
/// or undecodable payloads, and payloads that decode to zero bytes.
pub fn decode_payload(payload: &str) -> Option<Vec<u8>> {
    if payload.is_empty() || payload.starts_with("blob:") {
        return None;
    }
    let encoded = if payload.starts_with("data:") {
        let (_, data) = payload.split_once(',')?;
        data
    } else {
        payload
    };
    match STANDARD.decode(encoded.trim()) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Skipping undecodable payload: {}", e);
            None
        }
    }
}
