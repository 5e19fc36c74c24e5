//! visionflow - command line entry point
//!
//! Builds a linear graph `Source → [Annotate] → Limit → Sink` for the given
//! images, runs every node in order and prints the viewer snapshot as JSON.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use visionflow::operators::limit;
use visionflow::{AppConfig, FlowEngine, NodeKind, Position, ResourceRef};

/// Run a linear image graph and print the viewer snapshot
#[derive(Debug, Parser)]
#[command(name = "visionflow")]
#[command(about = "Node-based image dataflow graph runner")]
#[command(version)]
struct Cli {
    /// Read settings from PATH instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep at most N records (default from config)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Send the images to the annotation service
    #[arg(long)]
    annotate: bool,

    /// Use the in-memory annotation service
    #[arg(long)]
    offline: bool,

    /// Image references: paths, file:// or http(s) URLs, data: URLs
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<String>,
}

fn init_logging(config: &AppConfig) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::load_or_default(AppConfig::default_path()),
    };
    init_logging(&config);
    tracing::info!("Starting visionflow with {} images", args.images.len());

    let engine = if args.offline {
        FlowEngine::offline(config)?
    } else {
        FlowEngine::with_http(config)?
    };

    let mut chain = Vec::new();
    let mut x = 0.0;
    let mut next = |kind: NodeKind| -> anyhow::Result<_> {
        let id = engine.add_node(kind, Position::new(x, 0.0))?;
        x += 250.0;
        Ok(id)
    };

    let source = next(NodeKind::Source)?;
    chain.push(source.clone());
    if args.annotate {
        chain.push(next(NodeKind::Annotate)?);
    }
    let limit_node = next(NodeKind::Limit)?;
    chain.push(limit_node.clone());
    chain.push(next(NodeKind::Sink)?);

    for pair in chain.windows(2) {
        engine.graph().connect(&pair[0], &pair[1], None)?;
    }
    if let Some(n) = args.limit {
        limit::set_limit(engine.graph(), &limit_node, n)?;
    }

    engine.stage(&source, args.images.into_iter().map(ResourceRef::from))?;

    for report in engine.run_sequence(&chain).await? {
        if let Some(warning) = &report.warning {
            eprintln!("{} {}: {}", report.kind, report.node_id, warning);
        }
    }

    println!("{}", engine.viewer().snapshot().to_json_pretty()?);

    let dropped = engine.events().dropped();
    if dropped > 0 {
        tracing::debug!("{} engine events dropped", dropped);
    }
    Ok(())
}
