//! # HTTP Server
//!
//! HTTP servers for metrics, health checks, Kubernetes probes and the
//! admission webhook.
//!
//! Metrics server endpoints:
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (returns 200 when the controller is ready)
//!
//! The metrics server runs on port 5000 by default (`METRICS_PORT`). The
//! webhook is served over TLS on port 9443 (`WEBHOOK_PORT`) using the
//! certificate mounted at `WEBHOOK_TLS_CERT_PATH` / `WEBHOOK_TLS_KEY_PATH`.

use crate::config::ControllerConfig;
use crate::observability::metrics::REGISTRY;
use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use prometheus::{Encoder, TextEncoder};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
pub struct ServerState {
    pub is_ready: Arc<AtomicBool>,
}

/// Router for metrics and probes
pub fn metrics_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(state)
}

/// Serve metrics and probes until the process exits
///
/// # Errors
///
/// Fails if the port cannot be bound or the server stops with an error.
pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<(), anyhow::Error> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind metrics server on {addr}"))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, metrics_router(state)).await?;

    Ok(())
}

/// Serve the admission webhook
///
/// Uses TLS when both certificate files exist, plain HTTP otherwise.
///
/// # Errors
///
/// Fails if the port cannot be bound or the certificate cannot be loaded.
pub async fn serve_webhook(config: &ControllerConfig, router: Router) -> Result<(), anyhow::Error> {
    let addr = format!("0.0.0.0:{}", config.webhook_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind webhook server on {addr}"))?;

    let cert_path = config.webhook_tls_cert_path.as_path();
    let key_path = config.webhook_tls_key_path.as_path();
    if !cert_path.exists() || !key_path.exists() {
        warn!(
            "⚠️  Webhook TLS files not found ({}, {}), serving plain HTTP on {}",
            cert_path.display(),
            key_path.display(),
            addr
        );
        axum::serve(listener, router).await?;
        return Ok(());
    }

    let acceptor = TlsAcceptor::from(Arc::new(load_tls_config(cert_path, key_path)?));
    info!("Admission webhook listening on https://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept webhook connection");
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let service = TowerToHyperService::new(router.clone());

        tokio::spawn(async move {
            let tls = match acceptor.accept(stream).await {
                Ok(tls) => tls,
                Err(e) => {
                    debug!(%peer, error = %e, "TLS handshake failed");
                    return;
                }
            };
            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(tls), service)
                .await
            {
                debug!(%peer, error = %e, "Webhook connection ended with error");
            }
        });
    }
}

/// Build a rustls server config from PEM files
///
/// # Errors
///
/// Fails if a file cannot be read or does not hold a usable cert/key pair.
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> anyhow::Result<rustls::ServerConfig> {
    let certs = CertificateDer::pem_file_iter(cert_path)
        .with_context(|| format!("failed to open {}", cert_path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse certificates in {}", cert_path.display()))?;
    let key = PrivateKeyDer::from_pem_file(key_path)
        .with_context(|| format!("failed to parse private key in {}", key_path.display()))?;

    let mut tls = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("invalid webhook certificate or key")?;
    tls.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(tls)
}

fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
