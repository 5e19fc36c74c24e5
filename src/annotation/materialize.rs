//! Turning image references into JPEG `data:` URLs for upload.
//!
//! # Supported origins
//!
//! - `data:` URLs with base64 payloads, any image encoding
//! - `file://` URIs and plain filesystem paths
//! - `http://` and `https://` URLs
//!
//! `blob:` handles only mean something inside the browser that created them
//! and are rejected.

use crate::error::{FlowError, Result};
use crate::types::ResourceRef;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use reqwest::Client;
use std::time::Duration;

/// Prefix of every materialized payload.
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Fetches, decodes and re-encodes images as JPEG.
#[derive(Debug, Clone)]
pub struct ImageMaterializer {
    client: Client,
    quality: u8,
}

impl ImageMaterializer {
    pub fn new(quality: u8, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlowError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            quality: quality.clamp(1, 100),
        })
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Materialize one resource as a `data:image/jpeg;base64,` URL.
    pub async fn materialize(&self, resource: &ResourceRef) -> Result<String> {
        let bytes = self.load_bytes(resource).await?;
        let quality = self.quality;
        let label = resource.to_string();

        let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&bytes, quality))
            .await
            .map_err(|e| FlowError::Materialize {
                resource: label.clone(),
                message: format!("encoder task failed: {}", e),
            })?
            .map_err(|e| FlowError::Materialize {
                resource: label,
                message: e.to_string(),
            })?;

        Ok(format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(jpeg)))
    }

    /// Materialize every resource, in order. The first failure aborts.
    pub async fn materialize_all(&self, resources: &[ResourceRef]) -> Result<Vec<String>> {
        let jobs = resources.iter().map(|r| self.materialize(r));
        futures::future::try_join_all(jobs).await
    }

    async fn load_bytes(&self, resource: &ResourceRef) -> Result<Vec<u8>> {
        let uri = resource.as_str();
        let fail = |message: String| FlowError::Materialize {
            resource: resource.to_string(),
            message,
        };

        if resource.is_data_url() {
            decode_data_url(uri).map_err(fail)
        } else if resource.is_blob_handle() {
            Err(fail("blob handles cannot be resolved outside the browser".to_string()))
        } else if resource.is_remote() {
            let response = self.client.get(uri).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        } else {
            let path = uri.strip_prefix("file://").unwrap_or(uri);
            tokio::fs::read(path)
                .await
                .map_err(|e| fail(format!("cannot read {}: {}", path, e)))
        }
    }
}

/// Decode the payload of a base64 `data:` URL.
pub fn decode_data_url(uri: &str) -> std::result::Result<Vec<u8>, String> {
    let (header, data) = uri
        .split_once(',')
        .ok_or_else(|| "data URL has no payload".to_string())?;
    if !header.ends_with(";base64") {
        return Err("only base64 data URLs are supported".to_string());
    }
    STANDARD
        .decode(data.trim())
        .map_err(|e| format!("invalid base64 payload: {}", e))
}

/// Decode any supported image encoding and re-encode it as JPEG.
pub fn encode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    // JPEG has no alpha channel
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode_image(&rgb)?;
    Ok(out)
}
