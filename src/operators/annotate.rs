//! Annotate operator: sends the first incoming dataset's images to the
//! external labeling service and attaches what comes back.
//!
//! # Stages
//!
//! 1. Materialize every resource as a JPEG `data:` URL
//! 2. Upload one batch, each item tagged with a fresh correlation id
//! 3. Poll the annotation table within the configured window
//! 4. Correlate by id when echoed, by position otherwise
//! 5. Commit one record per submitted image
//!
//! Any error in stages 1-4 aborts the run before anything is committed.
//! No input images, or no annotations after the wait, is a warning and
//! also leaves the dataset untouched.

use super::{first_incoming_dataset, Operator, OperatorContext, RunDetail, RunReport};
use crate::annotation::{correlate, poll_for_records, CorrelationStrategy, PollSettings, UploadItem};
use crate::error::{Result, ResultExt};
use crate::graph::{NodeId, NodeKind};
use crate::types::{CommitMode, DatasetInput, ResourceRef};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateOperator;

#[async_trait]
impl Operator for AnnotateOperator {
    fn kind(&self) -> NodeKind {
        NodeKind::Annotate
    }

    async fn run(&self, ctx: &OperatorContext<'_>, node_id: &NodeId) -> Result<RunReport> {
        let resources: Vec<ResourceRef> = first_incoming_dataset(ctx.graph, node_id)?
            .into_iter()
            .map(|r| r.resource)
            .collect();
        let submitted = resources.len();

        if submitted == 0 {
            tracing::warn!("Annotate {}: no images to process", node_id);
            return Ok(RunReport::uncommitted(node_id, self.kind(), 0)
                .with_warning("No images to annotate")
                .with_detail(annotation_detail(0, 0, 0, 0, None)));
        }

        let payloads = ctx
            .materializer
            .materialize_all(&resources)
            .await
            .context("Failed to prepare images")?;

        let correlation_ids: Vec<String> = (0..submitted)
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        let batch: Vec<UploadItem> = payloads
            .into_iter()
            .zip(&correlation_ids)
            .enumerate()
            .map(|(i, (payload, id))| UploadItem::jpeg(i, payload, id.clone()))
            .collect();

        ctx.annotation
            .upload(&batch)
            .await
            .context("Upload failed")?;
        tracing::info!(
            "Annotate {}: uploaded {} images via {}",
            node_id,
            submitted,
            ctx.annotation.name()
        );

        let settings = PollSettings::from(&ctx.config.annotation);
        let outcome = poll_for_records(ctx.annotation, submitted, &correlation_ids, &settings)
            .await
            .context("Fetching annotations failed")?;
        let received = outcome.records.len();

        if received == 0 {
            tracing::warn!(
                "Annotate {}: no annotations after {:?} ({} scans)",
                node_id,
                outcome.elapsed,
                outcome.scans
            );
            return Ok(RunReport::uncommitted(node_id, self.kind(), 0)
                .with_warning("No annotations received")
                .with_detail(annotation_detail(submitted, 0, 0, outcome.scans, None)));
        }

        let correlation = correlate(&resources, &correlation_ids, outcome.records);
        if correlation.matched == 0 {
            // Rows came back but none had a usable timestamp or id.
            tracing::warn!(
                "Annotate {}: {} annotations received, none usable",
                node_id,
                received
            );
            return Ok(RunReport::uncommitted(node_id, self.kind(), 0)
                .with_warning("No annotations received")
                .with_detail(annotation_detail(
                    submitted,
                    received,
                    0,
                    outcome.scans,
                    Some(correlation.strategy),
                )));
        }
        tracing::info!(
            "Annotate {}: matched {} of {} images by {}",
            node_id,
            correlation.matched,
            submitted,
            correlation.strategy
        );

        let detail = annotation_detail(
            submitted,
            received,
            correlation.matched,
            outcome.scans,
            Some(correlation.strategy),
        );
        let items = ctx.graph.commit(
            node_id,
            DatasetInput::Records(correlation.records),
            CommitMode::Set,
        )?;
        Ok(RunReport::committed(node_id, self.kind(), items).with_detail(detail))
    }
}

fn annotation_detail(
    submitted: usize,
    received: usize,
    matched: usize,
    scans: usize,
    strategy: Option<CorrelationStrategy>,
) -> RunDetail {
    RunDetail::Annotation {
        submitted,
        received,
        matched,
        scans,
        strategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{
        placeholder_metadata, AnnotationRecord, MockAnnotationService,
    };
    use crate::operators::testing::{record, Fixture};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::json;
    use std::io::Cursor;

    fn png_data_url(shade: u8) -> String {
        let img = RgbImage::from_pixel(2, 2, Rgb([shade, shade, shade]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(out.into_inner()))
    }

    fn setup(service: MockAnnotationService, images: usize) -> (Fixture, NodeId, NodeId) {
        let fx = Fixture::with_service(service);
        let records = (0..images)
            .map(|i| record(&png_data_url(i as u8 * 40), json!({"source": i})))
            .collect();
        let up = fx.filled("up", records);
        let ann = fx.node("ann", NodeKind::Annotate);
        fx.connect(&up, &ann);
        (fx, up, ann)
    }

    #[tokio::test(start_paused = true)]
    async fn test_positional_correlation() {
        let service = MockAnnotationService::new().with_labels(["HAPPY", "SAD", "ANGRY"]);
        let (fx, up, ann) = setup(service, 3);

        let report = AnnotateOperator.run(&fx.ctx(), &ann).await.unwrap();
        assert_eq!(report.items, 3);
        assert_eq!(
            report.detail,
            annotation_detail(3, 3, 3, 1, Some(CorrelationStrategy::Position))
        );

        let out = fx.dataset(&ann);
        let labels: Vec<_> = out.iter().map(|r| r.metadata["label"].clone()).collect();
        assert_eq!(labels, vec![json!("HAPPY"), json!("SAD"), json!("ANGRY")]);
        let source = fx.dataset(&up);
        assert!(out.iter().zip(&source).all(|(o, s)| o.resource == s.resource));
        assert!(out[0].metadata["analysis"]["FaceDetails"].is_array());
        assert_eq!(fx.service.stored().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_correlation_id_join_survives_reordering() {
        let service = MockAnnotationService::new()
            .with_labels(["A", "B"])
            .echo_correlation_ids(true)
            .reverse_scan_order(true);
        let (fx, _, ann) = setup(service, 2);

        let report = AnnotateOperator.run(&fx.ctx(), &ann).await.unwrap();
        match report.detail {
            RunDetail::Annotation { strategy, matched, .. } => {
                assert_eq!(strategy, Some(CorrelationStrategy::CorrelationId));
                assert_eq!(matched, 2);
            }
            other => panic!("unexpected detail {:?}", other),
        }
        let out = fx.dataset(&ann);
        assert_eq!(out[0].metadata["label"], json!("A"));
        assert_eq!(out[1].metadata["label"], json!("B"));
        assert!(out[0].metadata["correlation_id"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_images_makes_no_calls() {
        let fx = Fixture::new();
        let ann = fx.node("ann", NodeKind::Annotate);

        let report = AnnotateOperator.run(&fx.ctx(), &ann).await.unwrap();
        assert!(!report.committed);
        assert_eq!(report.warning.as_deref(), Some("No images to annotate"));
        assert_eq!(fx.service.upload_calls(), 0);
        assert_eq!(fx.service.scan_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_retrieval_keeps_dataset() {
        let (fx, _, ann) = setup(MockAnnotationService::new(), 2);
        fx.graph
            .commit(&ann, DatasetInput::Records(vec![record("old.jpg", json!({}))]), CommitMode::Set)
            .unwrap();

        let report = AnnotateOperator.run(&fx.ctx(), &ann).await.unwrap();
        assert_eq!(report.warning.as_deref(), Some("No annotations received"));
        assert_eq!(fx.dataset(&ann)[0].resource.as_str(), "old.jpg");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_leave_dataset_untouched() {
        let service = MockAnnotationService::new().failing_upload("bucket unavailable");
        let (fx, _, ann) = setup(service, 1);
        fx.graph
            .commit(&ann, DatasetInput::Records(vec![record("old.jpg", json!({}))]), CommitMode::Set)
            .unwrap();

        let err = AnnotateOperator.run(&fx.ctx(), &ann).await.unwrap_err();
        assert!(err.to_string().contains("bucket unavailable"));
        assert_eq!(fx.dataset(&ann).len(), 1);
        assert_eq!(fx.dataset(&ann)[0].resource.as_str(), "old.jpg");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmaterializable_resource_aborts_before_upload() {
        let fx = Fixture::new();
        let up = fx.filled("up", vec![record("blob:http://localhost/7", json!({}))]);
        let ann = fx.node("ann", NodeKind::Annotate);
        fx.connect(&up, &ann);

        assert!(AnnotateOperator.run(&fx.ctx(), &ann).await.is_err());
        assert_eq!(fx.service.upload_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fewer_annotations_than_images_get_placeholders() {
        let row = AnnotationRecord {
            timestamp: Some(json!("2024-05-01T10:00:00Z")),
            label: Some("HAPPY".into()),
            confidence: Some(json!("88.1")),
            analysis: Some(json!("not json")),
            capture_date: Some("2024-05-01".into()),
            correlation_id: None,
        };
        let service = MockAnnotationService::new().with_records(vec![row]);
        let (fx, _, ann) = setup(service, 2);

        let report = AnnotateOperator.run(&fx.ctx(), &ann).await.unwrap();
        assert_eq!(report.items, 2);

        let out = fx.dataset(&ann);
        assert_eq!(out[0].metadata["label"], json!("HAPPY"));
        assert_eq!(out[0].metadata["analysis"], json!({}));
        assert_eq!(out[1].metadata, placeholder_metadata());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rows_without_timestamps_keep_dataset() {
        let row = AnnotationRecord {
            timestamp: None,
            label: Some("HAPPY".into()),
            confidence: Some(json!("88.1")),
            analysis: None,
            capture_date: None,
            correlation_id: None,
        };
        let service = MockAnnotationService::new().with_records(vec![row]);
        let (fx, _, ann) = setup(service, 2);
        fx.graph
            .commit(&ann, DatasetInput::Records(vec![record("old.jpg", json!({}))]), CommitMode::Set)
            .unwrap();

        let report = AnnotateOperator.run(&fx.ctx(), &ann).await.unwrap();
        assert!(!report.committed);
        assert_eq!(report.warning.as_deref(), Some("No annotations received"));
        assert_eq!(
            report.detail,
            annotation_detail(2, 1, 0, 1, Some(CorrelationStrategy::Position))
        );
        let out = fx.dataset(&ann);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].resource.as_str(), "old.jpg");
    }
}
