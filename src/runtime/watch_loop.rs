//! # Watch Loop
//!
//! Runs the controller over NamespaceLabel resources in all namespaces.
//!
//! Namespaces are watched as well: when a Namespace changes, every cached
//! NamespaceLabel in it is enqueued so external edits to managed labels are
//! repaired without waiting for the periodic requeue.

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::crd::NamespaceLabel;
use crate::runtime::error_policy::{handle_controller_error, handle_reconciliation_error};
use crate::server::ServerState;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop
///
/// Restarts the controller if its stream ends for any reason other than a
/// shutdown signal.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    restart_delay: Duration,
) -> Result<(), anyhow::Error> {
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_state.is_ready.store(false, Ordering::Relaxed);
    });

    loop {
        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );

        info!("Starting controller watch loop...");
        let labels: Api<NamespaceLabel> = Api::all(client.clone());
        let namespaces: Api<Namespace> = Api::all(client.clone());

        let controller = Controller::new(labels, watcher::Config::default().any_semantic());
        let cache = controller.store();

        controller
            .watches(namespaces, watcher::Config::default(), move |ns: Namespace| {
                let namespace = ns.name_any();
                cache
                    .state()
                    .into_iter()
                    .filter(|obj| obj.namespace().as_deref() == Some(namespace.as_str()))
                    .map(|obj| ObjectRef::from_obj(obj.as_ref()))
                    .collect::<Vec<_>>()
            })
            .shutdown_on_signal()
            .run(
                reconcile,
                handle_reconciliation_error,
                Arc::clone(&reconciler),
            )
            .for_each(|result| async move {
                match result {
                    Ok((obj, _action)) => debug!(object = %obj, "watch.event.success"),
                    Err(e) => handle_controller_error(&e),
                }
            })
            .instrument(watch_span)
            .await;

        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut terminate) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
            return;
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
