//! Operator chains run through the engine
//!
//! Uses the offline engine; nothing here reaches the annotation service.

mod common;

use common::builders::{chain, RecordBuilder};
use serde_json::json;
use visionflow::operators::{conditional, limit, path_filter};
use visionflow::{
    AppConfig, CommitMode, DatasetInput, FlowEngine, NodeKind, NodeStatus, Position, RunDetail,
};

fn engine() -> FlowEngine {
    FlowEngine::offline(AppConfig::default()).expect("engine")
}

#[tokio::test]
async fn test_source_limit_sink_chain() {
    let engine = engine();
    let source = chain(&engine, None, NodeKind::Source);
    let lim = chain(&engine, Some(&source), NodeKind::Limit);
    let sink = chain(&engine, Some(&lim), NodeKind::Sink);
    limit::set_limit(engine.graph(), &lim, 2).unwrap();

    engine
        .stage(&source, ["1.png".into(), "2.png".into(), "3.png".into()])
        .unwrap();
    let reports = engine
        .run_sequence(&[source.clone(), lim.clone(), sink.clone()])
        .await
        .unwrap();

    assert_eq!(reports[0].items, 3);
    assert_eq!(reports[1].items, 2);
    assert!(matches!(reports[2].detail, RunDetail::Viewer { version: 1 }));
    assert_eq!(
        common::resources(engine.graph(), &lim),
        vec!["1.png", "2.png"]
    );

    let snapshot = engine.viewer().snapshot();
    assert_eq!(snapshot.published_by.as_ref(), Some(&sink));
    assert_eq!(snapshot.source_node.as_ref(), Some(&lim));
    assert_eq!(snapshot.len(), 2);

    let graph = engine.graph().snapshot();
    assert_eq!(graph.node(&lim).unwrap().status, NodeStatus::Ready { items: 2 });
    assert!(graph.node(&sink).unwrap().dataset.is_empty());
}

#[tokio::test]
async fn test_merge_concatenates_with_fresh_ids() {
    let engine = engine();
    let a = chain(&engine, None, NodeKind::Source);
    let b = chain(&engine, None, NodeKind::Source);
    let merge = engine.add_node(NodeKind::Merge, Position::default()).unwrap();
    engine.graph().connect(&a, &merge, Some("in-a")).unwrap();
    engine.graph().connect(&b, &merge, Some("in-b")).unwrap();

    engine.stage(&a, ["a1.png".into(), "a2.png".into()]).unwrap();
    engine.stage(&b, ["b1.png".into()]).unwrap();
    engine.run_sequence(&[a.clone(), b.clone()]).await.unwrap();

    let report = engine.run(&merge).await.unwrap();
    assert_eq!(report.items, 3);
    assert_eq!(
        common::resources(engine.graph(), &merge),
        vec!["a1.png", "a2.png", "b1.png"]
    );

    let merged = engine.graph().dataset(&merge).unwrap();
    common::assert_disjoint_ids(&merged, &engine.graph().dataset(&a).unwrap());
    common::assert_disjoint_ids(&merged, &engine.graph().dataset(&b).unwrap());

    // Running again replaces rather than accumulates
    engine.run(&merge).await.unwrap();
    assert_eq!(engine.graph().dataset(&merge).unwrap().len(), 3);
}

#[tokio::test]
async fn test_conditional_filter_on_labels() {
    let engine = engine();
    let source = chain(&engine, None, NodeKind::Source);
    let filter = chain(&engine, Some(&source), NodeKind::ConditionalFilter);

    let records = vec![
        RecordBuilder::new("1.png").annotated("ANGRY", 0.0).build(),
        RecordBuilder::new("2.png").annotated("CALM", 0.0).build(),
        RecordBuilder::new("3.png").annotated("ANGRY", 15.0).build(),
    ];
    engine
        .graph()
        .commit(&source, DatasetInput::Records(records), CommitMode::Set)
        .unwrap();

    conditional::set_expression(engine.graph(), &filter, "metadata.label === 'ANGRY'").unwrap();
    let report = engine.run(&filter).await.unwrap();
    assert_eq!(report.items, 2);
    assert!(report.warning.is_none());
    assert_eq!(
        common::resources(engine.graph(), &filter),
        vec!["1.png", "3.png"]
    );

    conditional::set_expression(
        engine.graph(),
        &filter,
        "metadata.analysis.FaceDetails[0].Pose.Yaw > 10 && metadata.label == 'ANGRY'",
    )
    .unwrap();
    engine.run(&filter).await.unwrap();
    assert_eq!(common::resources(engine.graph(), &filter), vec!["3.png"]);
}

#[tokio::test]
async fn test_conditional_filter_reports_bad_syntax() {
    let engine = engine();
    let source = chain(&engine, None, NodeKind::Source);
    let filter = chain(&engine, Some(&source), NodeKind::ConditionalFilter);
    engine.stage(&source, ["1.png".into()]).unwrap();
    engine.run(&source).await.unwrap();

    conditional::set_expression(engine.graph(), &filter, "metadata.label ===").unwrap();
    let report = engine.run(&filter).await.unwrap();
    assert_eq!(report.items, 0);
    assert_eq!(report.warning.as_deref(), Some("Invalid condition syntax"));
    match report.detail {
        RunDetail::Conditional {
            invalid_condition, ..
        } => assert!(invalid_condition),
        other => panic!("unexpected detail {:?}", other),
    }
}

#[tokio::test]
async fn test_path_filter_projects_selected_leaves() {
    let engine = engine();
    let source = chain(&engine, None, NodeKind::Source);
    let filter = chain(&engine, Some(&source), NodeKind::PathFilter);
    let records = vec![RecordBuilder::new("1.png")
        .meta("label", json!("HAPPY"))
        .meta("box", json!({"w": 10, "h": 20}))
        .build()];
    engine
        .graph()
        .commit(&source, DatasetInput::Records(records), CommitMode::Set)
        .unwrap();

    // First run: everything discovered is selected
    engine.run(&filter).await.unwrap();
    let out = engine.graph().dataset(&filter).unwrap();
    assert_eq!(out[0].metadata["box"], json!({"w": 10, "h": 20}));

    path_filter::toggle_path(engine.graph(), &filter, "box.h").unwrap();
    path_filter::toggle_path(engine.graph(), &filter, "label").unwrap();
    let report = engine.run(&filter).await.unwrap();

    let out = engine.graph().dataset(&filter).unwrap();
    assert_eq!(out[0].metadata.get("label"), None);
    assert_eq!(out[0].metadata["box"], json!({"w": 10}));
    match report.detail {
        RunDetail::PathFilter { leaf_paths, .. } => assert_eq!(leaf_paths, vec!["box.w"]),
        other => panic!("unexpected detail {:?}", other),
    }
}

#[tokio::test]
async fn test_analytics_does_not_commit() {
    let engine = engine();
    let source = chain(&engine, None, NodeKind::Source);
    let analytics = chain(&engine, Some(&source), NodeKind::Analytics);
    let records = vec![
        RecordBuilder::new("1.png").annotated("HAPPY", 0.0).build(),
        RecordBuilder::new("2.png").annotated("HAPPY", -30.0).build(),
        RecordBuilder::new("3.png").meta("label", json!("SAD")).build(),
    ];
    engine
        .graph()
        .commit(&source, DatasetInput::Records(records), CommitMode::Set)
        .unwrap();

    let report = engine.run(&analytics).await.unwrap();
    assert!(!report.committed);
    assert!(engine.graph().dataset(&analytics).unwrap().is_empty());

    let RunDetail::Analytics(face_report) = report.detail else {
        panic!("expected analytics detail");
    };
    assert_eq!(face_report.total_records, 3);
    assert_eq!(face_report.faces(), 2);
    let poses: Vec<_> = face_report
        .pose_distribution
        .iter()
        .map(|c| (c.name.as_str(), c.value))
        .collect();
    assert_eq!(poses, vec![("Front", 1), ("Left", 1)]);
}

#[tokio::test]
async fn test_rerun_on_unchanged_input_is_stable() {
    let engine = engine();
    let source = chain(&engine, None, NodeKind::Source);
    let lim = chain(&engine, Some(&source), NodeKind::Limit);
    engine.stage(&source, ["1.png".into(), "2.png".into()]).unwrap();
    engine.run(&source).await.unwrap();

    engine.run(&lim).await.unwrap();
    let first = engine.graph().dataset(&lim).unwrap();
    engine.run(&lim).await.unwrap();
    let second = engine.graph().dataset(&lim).unwrap();

    assert_eq!(first.len(), second.len());
    assert!(first.iter().zip(&second).all(|(a, b)| a.same_content(b)));
}
