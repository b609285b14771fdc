use std::path::Path;
use std::sync::Arc;

use inbox_buckets::classifier::{ClassificationClient, OpenAiAssistants, RunPoller};
use inbox_buckets::config::ServiceConfig;
use inbox_buckets::pipeline::{MessagePipeline, TenantProvisioner};
use inbox_buckets::routes::app_routes;
use inbox_buckets::store::{LibSqlBackend, TenantStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env()?;

    eprintln!("📬 inbox-buckets v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Assistant: {}", config.classifier.assistant_id);
    eprintln!("   API base: {}", config.classifier.base_url);
    eprintln!(
        "   Poll: every {}ms, deadline {}s",
        config.poll.interval.as_millis(),
        config.poll.deadline.as_secs()
    );

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn TenantStore> =
        Arc::new(LibSqlBackend::new_local(Path::new(&config.db_path)).await?);
    eprintln!("   Database: {}", config.db_path);

    // ── Pipeline ─────────────────────────────────────────────────────────
    let service = Arc::new(OpenAiAssistants::new(&config.classifier)?);
    let classifier = ClassificationClient::new(
        service,
        config.classifier.assistant_id.clone(),
        RunPoller::with_tokio_clock(config.poll),
    );
    let pipeline = Arc::new(MessagePipeline::new(classifier, Arc::clone(&store)));
    let provisioner = Arc::new(TenantProvisioner::new(store));

    // ── HTTP ─────────────────────────────────────────────────────────────
    let app = app_routes(pipeline, provisioner);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    eprintln!("   Listening: http://0.0.0.0:{}\n", config.port);
    tracing::info!(port = config.port, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
