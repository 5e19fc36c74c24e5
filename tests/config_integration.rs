//! Config file round trips

use tempfile::TempDir;
use visionflow::config::{AppConfig, OperatorConfig, PollCompletion};
use visionflow::{FlowEngine, NodeKind, Position};

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::default();
    config.annotation.endpoint = "https://labels.internal:8443".to_string();
    config.annotation.completion = PollCompletion::AwaitAll;
    config.operators.default_limit = 12;
    config.save(&path).unwrap();

    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(
        loaded.annotation.upload_url(),
        "https://labels.internal:8443/api/upload"
    );
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[annotation]\nmax_wait_ms = 1500\ncompletion = \"await_all\"\n",
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.annotation.max_wait_ms, 1500);
    assert_eq!(config.annotation.completion, PollCompletion::AwaitAll);
    assert_eq!(config.annotation.poll_interval_ms, 10_000);
    assert_eq!(config.operators, OperatorConfig::default());
}

#[test]
fn test_load_or_default_tolerates_bad_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");
    assert_eq!(AppConfig::load_or_default(Some(&missing)), AppConfig::default());

    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "annotation = [not toml").unwrap();
    assert!(AppConfig::load(&broken).is_err());
    assert_eq!(AppConfig::load_or_default(Some(&broken)), AppConfig::default());
}

#[tokio::test]
async fn test_engine_uses_default_limit_from_config() {
    let mut config = AppConfig::default();
    config.operators.default_limit = 1;
    let engine = FlowEngine::offline(config).unwrap();

    let source = engine.add_node(NodeKind::Source, Position::default()).unwrap();
    let limit = engine.add_node(NodeKind::Limit, Position::default()).unwrap();
    engine.graph().connect(&source, &limit, None).unwrap();
    engine.stage(&source, ["a.png".into(), "b.png".into()]).unwrap();

    engine.run(&source).await.unwrap();
    let report = engine.run(&limit).await.unwrap();
    assert_eq!(report.items, 1);
}
