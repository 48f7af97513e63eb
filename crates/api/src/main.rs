use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgbatch_api::config::ServerConfig;
use imgbatch_api::router::build_app_router;
use imgbatch_api::state::AppState;
use imgbatch_db::Ledger;
use imgbatch_events::{EventBus, EventLog};
use imgbatch_pipeline::{FsArtifactStore, HttpFetcher, Pipeline, ResizeTransformer};
use imgbatch_worker::PipelineRunner;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "imgbatch_api=debug,imgbatch_worker=debug,imgbatch_db=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        max_workers = config.max_workers,
        "Loaded server configuration",
    );

    // --- Ledger ---
    let ledger = Ledger::open(config.ledger_dir.clone())
        .await
        .expect("Failed to open progress ledger");
    tracing::info!(
        dir = %config.ledger_dir.display(),
        batches = ledger.len().await,
        "Progress ledger loaded",
    );

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let event_log_handle = tokio::spawn(EventLog::run(event_bus.subscribe()));

    // --- Pipeline ---
    let fetch_timeout = Duration::from_secs(config.fetch_timeout_secs);
    let fetcher = HttpFetcher::new(fetch_timeout).expect("Failed to build HTTP client");
    let transformer = ResizeTransformer {
        width: config.resize_width,
        height: config.resize_height,
        grayscale: config.grayscale,
    };
    let pipeline = Pipeline::new(
        Arc::new(fetcher),
        Arc::new(transformer),
        Arc::new(FsArtifactStore::new(config.output_dir.clone())),
    );
    let runner = Arc::new(PipelineRunner::new(pipeline, fetch_timeout));

    // --- App ---
    let state = AppState::new(
        config.clone(),
        Arc::new(ledger),
        runner,
        Arc::clone(&event_bus),
    );
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // The log exits once the last sender is gone; jobs still in flight
    // keep theirs alive, so don't wait forever.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), event_log_handle).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
