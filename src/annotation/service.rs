//! AnnotationService trait for the external labeling boundary
//!
//! The Annotate operator talks to the outside world only through this trait:
//! one call to submit a batch of images and one call to scan every
//! annotation produced so far. Implementations exist for HTTP and for an
//! in-memory mock used by tests and offline runs.

use crate::annotation::record::AnnotationRecord;
use crate::annotation::upload::UploadItem;
use crate::error::Result;
use async_trait::async_trait;

/// Boundary to the upload store and the asynchronous labeling service.
#[async_trait]
pub trait AnnotationService: Send + Sync {
    /// Implementation name, for logs.
    fn name(&self) -> &str;

    /// Submit one ordered batch. Success or failure only.
    async fn upload(&self, batch: &[UploadItem]) -> Result<()>;

    /// Full scan of the annotation table.
    async fn fetch_records(&self) -> Result<Vec<AnnotationRecord>>;
}
