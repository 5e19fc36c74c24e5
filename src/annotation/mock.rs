//! Mock Annotation Service for Testing
//!
//! An in-memory stand-in for the upload store and the labeling service.
//! Uploads follow the same naming and payload rules as the real endpoint;
//! optionally each stored image produces an annotation row that becomes
//! visible to scans after a configurable number of scans.
//!
//! # Example
//!
//! ```ignore
//! use visionflow::annotation::{AnnotationService, MockAnnotationService, UploadItem};
//!
//! let service = MockAnnotationService::new()
//!     .with_labels(["HAPPY", "SAD"])
//!     .echo_correlation_ids(true);
//!
//! service.upload(&[UploadItem::jpeg(0, "AAEC".into(), "c-0")]).await?;
//! let rows = service.fetch_records().await?;
//! assert_eq!(rows[0].label.as_deref(), Some("HAPPY"));
//! ```

use crate::annotation::record::AnnotationRecord;
use crate::annotation::service::AnnotationService;
use crate::annotation::upload::{decode_payload, object_key, UploadItem};
use crate::error::{FlowError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Mutex;

/// An object accepted by the mock store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub size: usize,
    pub correlation_id: Option<String>,
}

#[derive(Debug)]
struct MockState {
    table: Vec<AnnotationRecord>,
    /// Rows waiting to appear: visible once `scans` exceeds the threshold.
    pending: Vec<(usize, AnnotationRecord)>,
    stored: Vec<StoredObject>,
    upload_calls: usize,
    scans: usize,
    sequence: i64,
    labels: Vec<String>,
    echo_correlation: bool,
    latency_scans: usize,
    reverse_scan: bool,
    fail_upload: Option<String>,
    fail_fetch: Option<String>,
}

/// In-memory [`AnnotationService`].
#[derive(Debug)]
pub struct MockAnnotationService {
    state: Mutex<MockState>,
    base_time: DateTime<Utc>,
}

impl Default for MockAnnotationService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnnotationService {
    /// Empty table, no labeling.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                table: Vec::new(),
                pending: Vec::new(),
                stored: Vec::new(),
                upload_calls: 0,
                scans: 0,
                sequence: 0,
                labels: Vec::new(),
                echo_correlation: false,
                latency_scans: 0,
                reverse_scan: false,
                fail_upload: None,
                fail_fetch: None,
            }),
            base_time: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }

    /// Pre-populate the table.
    pub fn with_records(self, records: Vec<AnnotationRecord>) -> Self {
        self.lock().table = records;
        self
    }

    /// Label every stored image, cycling through `labels`.
    pub fn with_labels<I, S>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Copy each upload's correlation id onto its annotation row.
    pub fn echo_correlation_ids(self, echo: bool) -> Self {
        self.lock().echo_correlation = echo;
        self
    }

    /// Rows produced by an upload stay hidden for this many scans.
    pub fn ready_after_scans(self, scans: usize) -> Self {
        self.lock().latency_scans = scans;
        self
    }

    /// Return scan results newest-first, like an unordered table scan might.
    pub fn reverse_scan_order(self, reverse: bool) -> Self {
        self.lock().reverse_scan = reverse;
        self
    }

    pub fn failing_upload(self, message: impl Into<String>) -> Self {
        self.lock().fail_upload = Some(message.into());
        self
    }

    pub fn failing_fetch(self, message: impl Into<String>) -> Self {
        self.lock().fail_fetch = Some(message.into());
        self
    }

    /// Objects accepted so far.
    pub fn stored(&self) -> Vec<StoredObject> {
        self.lock().stored.clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.lock().upload_calls
    }

    pub fn scan_count(&self) -> usize {
        self.lock().scans
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn make_row(
        &self,
        state: &mut MockState,
        label: String,
        correlation_id: Option<String>,
    ) -> AnnotationRecord {
        state.sequence += 1;
        let at = self.base_time + ChronoDuration::seconds(state.sequence);
        let confidence = 80.0 + (state.sequence % 20) as f64;
        let analysis = json!({
            "FaceDetails": [{
                "Emotions": [{"Type": label.clone(), "Confidence": confidence}],
                "Pose": {"Yaw": 0.0, "Pitch": 0.0, "Roll": 0.0}
            }]
        });

        AnnotationRecord {
            timestamp: Some(Value::String(at.to_rfc3339())),
            label: Some(label),
            confidence: Some(json!(confidence)),
            analysis: Some(Value::String(analysis.to_string())),
            capture_date: Some(at.format("%Y-%m-%d").to_string()),
            correlation_id,
        }
    }
}

#[async_trait]
impl AnnotationService for MockAnnotationService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, batch: &[UploadItem]) -> Result<()> {
        let mut state = self.lock();
        state.upload_calls += 1;
        if let Some(message) = &state.fail_upload {
            return Err(FlowError::Service(message.clone()));
        }

        for (i, item) in batch.iter().enumerate() {
            let Some(bytes) = decode_payload(&item.payload) else {
                tracing::debug!("Mock store skipping file {} ({})", i, item.file_name);
                continue;
            };
            state.stored.push(StoredObject {
                key: object_key(&item.file_name),
                size: bytes.len(),
                correlation_id: item.correlation_id.clone(),
            });

            if state.labels.is_empty() {
                continue;
            }
            let label_index = (state.stored.len() - 1) % state.labels.len();
            let label = state.labels[label_index].clone();
            let correlation = if state.echo_correlation {
                item.correlation_id.clone()
            } else {
                None
            };
            let row = self.make_row(&mut state, label, correlation);
            let visible_after = state.scans + state.latency_scans;
            state.pending.push((visible_after, row));
        }
        Ok(())
    }

    async fn fetch_records(&self) -> Result<Vec<AnnotationRecord>> {
        let mut state = self.lock();
        state.scans += 1;
        if let Some(message) = &state.fail_fetch {
            return Err(FlowError::Service(message.clone()));
        }

        let scans = state.scans;
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
            .into_iter()
            .partition(|(after, _)| scans > *after);
        state.pending = waiting;
        state.table.extend(ready.into_iter().map(|(_, row)| row));

        let mut rows = state.table.clone();
        if state.reverse_scan {
            rows.reverse();
        }
        Ok(rows)
    }
}
