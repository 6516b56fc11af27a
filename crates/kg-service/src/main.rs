//! Graph initialization: load config, collect schema sources, build the graph.

use kg_service::{config_path, load_config, KgContext, MergePolicy, PipelineError, SourceSet, StaticExtractor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = config_path();
    let config = load_config(&path)?;
    let policy: MergePolicy = config.sources.merge_policy.parse()?;

    let mut sources = SourceSet::new();
    if let Some(schema) = config.sources.static_schema.clone() {
        sources = sources.with_static(StaticExtractor::new(schema));
    }

    let ctx = KgContext::from_config(&config)?;
    let result = ctx.init_graph(&mut sources, policy).await?;
    if !result.success {
        let msg = result
            .error_message
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(PipelineError::Build(msg).into());
    }
    tracing::info!(
        nodes = result.nodes_created,
        edges = result.edges_created,
        labels = result.labels_added,
        build_time_ms = result.build_time_ms,
        "Graph initialized"
    );

    let stats = ctx.service().get_statistics().await?;
    tracing::info!(
        tables = stats.table_count,
        edges = stats.edge_count,
        connected = stats.is_connected,
        kinds = ?stats.relation_kind_counts,
        "Graph statistics"
    );
    Ok(())
}
