//! External annotation pipeline.
//!
//! The Annotate operator runs this pipeline in order:
//!
//! 1. [`ImageMaterializer`] turns each resource into a JPEG `data:` URL
//! 2. [`AnnotationService::upload`] submits the batch
//! 3. [`poll_for_records`] waits for the labeling service to write results
//! 4. [`correlate`] re-attaches those results to the submitted images
//!
//! The service is a trait object so tests and offline runs can use
//! [`MockAnnotationService`] in place of [`HttpAnnotationService`].

pub mod correlate;
pub mod http;
pub mod materialize;
pub mod mock;
pub mod poll;
pub mod record;
pub mod service;
pub mod upload;

pub use correlate::{
    correlate, placeholder_metadata, select_latest, Correlation, CorrelationStrategy,
};
pub use http::HttpAnnotationService;
pub use materialize::{ImageMaterializer, JPEG_DATA_URL_PREFIX};
pub use mock::{MockAnnotationService, StoredObject};
pub use poll::{poll_for_records, PollOutcome, PollSettings};
pub use record::AnnotationRecord;
pub use service::AnnotationService;
pub use upload::{UploadBatch, UploadItem};
