//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, configuration,
//! HTTP servers and the Kubernetes client.

use crate::admission::webhook::webhook_router;
use crate::admission::AdmissionValidator;
use crate::config::ControllerConfig;
use crate::constants::DEFAULT_LOG_FILTER;
use crate::controller::reconciler::Reconciler;
use crate::observability;
use crate::server::{serve_webhook, start_server, ServerState};
use crate::store::{KubeStore, LabelStore};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Configuration loaded at startup
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "server_ready",
                &self
                    .server_state
                    .is_ready
                    .load(std::sync::atomic::Ordering::Relaxed),
            )
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - Configuration loading
/// - Kubernetes client creation
/// - Metrics/probe server and admission webhook startup
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_existing| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    info!(
        "Starting Namespace Label Controller v{}",
        env!("CARGO_PKG_VERSION")
    );

    observability::metrics::register_metrics()?;

    let config = ControllerConfig::from_env();
    info!(
        protected_domains = ?config.protected_domains.suffixes(),
        metrics_port = config.metrics_port,
        webhook_enabled = config.webhook_enabled,
        reconcile_interval_secs = config.reconcile_interval_secs,
        "Configuration loaded"
    );

    let server_state = Arc::new(ServerState::default());
    let metrics_state = Arc::clone(&server_state);
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, metrics_state).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let store: Arc<dyn LabelStore> = Arc::new(KubeStore::new(client.clone()));

    let reconciler = Arc::new(Reconciler::new(Arc::clone(&store), config.clone()));

    if config.webhook_enabled {
        let validator = Arc::new(AdmissionValidator::new(
            Arc::clone(&store),
            config.protected_domains.clone(),
        ));
        let webhook_config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_webhook(&webhook_config, webhook_router(validator)).await {
                error!("Admission webhook server error: {:#}", e);
            }
        });
    } else {
        info!("Admission webhook disabled (WEBHOOK_ENABLED=false)");
    }

    server_state
        .is_ready
        .store(true, std::sync::atomic::Ordering::Relaxed);
    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        config,
    })
}
