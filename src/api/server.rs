use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{
    services::{
        get_credits, get_task, grant_credits, health, kie_webhook, metrics, submit_hairstyles,
    },
    state::AppState,
};
use crate::config::Config;
use crate::ledger::{CreditLedger, TaskStore, open_keyspace};
use crate::observability::Metrics;
use crate::provider::{KieClient, KieOptions, ProviderClient};
use crate::storage::StorageClient;
use crate::storage::http::{FetchOptions, HttpFetcher};
use crate::storage::relocate::{AssetRelocator, BucketRelocator};
use crate::tasks::{LifecycleEngine, TaskIntake};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Builds the application router over a prepared state.
///
/// Split out from [`run`] so integration tests can drive the exact
/// production routing without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/hairstyles", post(submit_hairstyles))
        .route("/api/tasks/{task_no}", get(get_task))
        .route("/api/credits", get(get_credits))
        .route("/webhooks/kie-image", post(kie_webhook))
        .route("/operators/credits/{user_id}", post(grant_credits))
        .route("/operators/metrics", get(metrics))
        .route("/operators/health", get(health))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    // Load config
    info!("Loading configuration");
    let config =
        Config::load().map_err(|e| format!("Failed to load config: {}", e))?;

    if config.kie.api_key.is_none() {
        warn!("KIE_API_KEY is not set, provider submissions will be rejected");
    }

    // Open the ledger keyspace and attach both partitions
    info!(path = %config.server.ledger_path.display(), "Opening ledger");
    let keyspace = open_keyspace(&config.server.ledger_path)
        .map_err(|e| format!("Failed to open ledger: {}", e))?;
    let store = Arc::new(
        TaskStore::attach(&keyspace)
            .map_err(|e| format!("Failed to open task store: {}", e))?,
    );
    let credits = Arc::new(
        CreditLedger::attach(&keyspace)
            .map_err(|e| format!("Failed to open credit ledger: {}", e))?,
    );

    // Asset pipeline: fetch foreign URLs, store, serve via CDN base
    let storage = StorageClient::from_config(&config.storage)
        .map_err(|e| format!("Failed to initialize storage: {}", e))?;
    let fetcher = HttpFetcher::new(FetchOptions::default())
        .map_err(|e| format!("Failed to build HTTP fetcher: {}", e))?;
    let relocator: Arc<dyn AssetRelocator> = Arc::new(BucketRelocator::new(
        fetcher,
        storage,
        config.storage.cdn_url.clone(),
    ));

    let provider: Arc<dyn ProviderClient> = Arc::new(
        KieClient::new(KieOptions {
            base_url: config.kie.base_url.clone(),
            api_key: config.kie.api_key.clone().unwrap_or_default(),
            connect_timeout: Duration::from_secs(config.kie.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.kie.request_timeout_secs),
        })
        .map_err(|e| format!("Failed to build KIE client: {}", e))?,
    );

    let shared_metrics = Arc::new(Metrics::new());
    let intake = TaskIntake::new(
        store.clone(),
        credits.clone(),
        relocator.clone(),
        shared_metrics.clone(),
        config.kie.callback_url.clone(),
    );
    let engine = LifecycleEngine::new(
        store.clone(),
        provider,
        relocator,
        shared_metrics.clone(),
        config.generation.mirror_results,
    );

    let address = address.unwrap_or(config.server.bind_addr);
    let state = AppState::new(config, store, credits, intake, engine, shared_metrics);

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "Salon API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
