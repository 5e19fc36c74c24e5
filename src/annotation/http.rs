//! HTTP implementation of [`AnnotationService`].

use crate::annotation::record::AnnotationRecord;
use crate::annotation::service::AnnotationService;
use crate::annotation::upload::{UploadBatch, UploadItem};
use crate::config::AnnotationConfig;
use crate::error::{FlowError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Talks to the upload endpoint and the annotation table over HTTP.
///
/// - `POST {endpoint}{upload_path}` with `{"files": [...]}`
/// - `GET {endpoint}{records_path}` returning an array of records, or an
///   object with an `items` array
#[derive(Debug, Clone)]
pub struct HttpAnnotationService {
    client: Client,
    upload_url: String,
    records_url: String,
}

impl HttpAnnotationService {
    pub fn new(config: &AnnotationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("visionflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FlowError::Config(format!("Failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            upload = %config.upload_url(),
            records = %config.records_url(),
            "Annotation HTTP client initialized"
        );

        Ok(Self {
            client,
            upload_url: config.upload_url(),
            records_url: config.records_url(),
        })
    }
}

#[async_trait]
impl AnnotationService for HttpAnnotationService {
    fn name(&self) -> &str {
        "http"
    }

    async fn upload(&self, batch: &[UploadItem]) -> Result<()> {
        let body = UploadBatch {
            files: batch.to_vec(),
        };
        let response = self.client.post(&self.upload_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FlowError::Service(format!(
                "upload failed: {} - {}",
                status, text
            )));
        }
        tracing::debug!("Uploaded {} files to {}", batch.len(), self.upload_url);
        Ok(())
    }

    async fn fetch_records(&self) -> Result<Vec<AnnotationRecord>> {
        let response = self.client.get(&self.records_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlowError::Service(format!("scan failed: {}", status)));
        }

        let body: Value = response.json().await?;
        parse_scan_response(body)
    }
}

/// Accept a bare array or an `{"items": [...]}` envelope.
fn parse_scan_response(body: Value) -> Result<Vec<AnnotationRecord>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items").or_else(|| map.remove("Items")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FlowError::Service(
                    "scan response has no items array".to_string(),
                ))
            }
        },
        _ => {
            return Err(FlowError::Service(
                "scan response is not a JSON array".to_string(),
            ))
        }
    };

    let total = items.len();
    let records: Vec<AnnotationRecord> =
        items.iter().filter_map(AnnotationRecord::from_json).collect();
    if records.len() < total {
        tracing::warn!("Ignored {} non-object scan items", total - records.len());
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let records = parse_scan_response(json!([{"Emotion": "HAPPY"}, 3])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label.as_deref(), Some("HAPPY"));
    }

    #[test]
    fn test_parse_items_envelope() {
        let records =
            parse_scan_response(json!({"Items": [{"Emotion": {"S": "SAD"}}], "Count": 1}))
                .unwrap();
        assert_eq!(records[0].label.as_deref(), Some("SAD"));
    }

    #[test]
    fn test_parse_bad_shape() {
        assert!(parse_scan_response(json!("oops")).is_err());
        assert!(parse_scan_response(json!({"rows": []})).is_err());
    }

    #[test]
    fn test_client_builds_from_config() {
        let service = HttpAnnotationService::new(&AnnotationConfig::default()).unwrap();
        assert_eq!(service.upload_url, "http://localhost:3000/api/upload");
        assert_eq!(service.name(), "http");
    }
}
