//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::NamespaceLabel;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::{self, Action};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing object does not slow
/// down the others. A successful pass resets it.
pub fn handle_reconciliation_error(
    obj: Arc<NamespaceLabel>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    if error.is_conflict() {
        warn!("Conflict reconciling {}/{}: {}", namespace, name, error);
    } else {
        error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    }
    observability::metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = ctx.record_failure(&resource_key);

    info!(
        "🔄 Retrying with Fibonacci backoff: {}s (error count: {}, trigger source: error-backoff)",
        backoff_seconds, error_count
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Log an error surfaced by the controller stream
///
/// Reconciler failures were already handled by [`handle_reconciliation_error`];
/// anything else comes from the watch or the scheduler.
pub fn handle_controller_error<E, Q>(error: &controller::Error<E, Q>)
where
    E: std::error::Error + 'static,
    Q: std::error::Error + 'static,
{
    match error {
        controller::Error::ReconcilerFailed(_, obj) => {
            debug!(object = %obj, "reconcile failure already scheduled for retry");
        }
        controller::Error::ObjectNotFound(obj) => {
            debug!(object = %obj, "object gone before reconcile");
        }
        other => warn!("Controller stream error: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::crd::NamespaceLabelSpec;
    use crate::store::{InMemoryStore, StoreError};

    fn object() -> Arc<NamespaceLabel> {
        let mut obj = NamespaceLabel::new("labels", NamespaceLabelSpec::default());
        obj.metadata.namespace = Some("team-a".to_string());
        Arc::new(obj)
    }

    fn persistence_error() -> ReconcilerError {
        ReconcilerError::Persistence {
            identity: "team-a/labels".to_string(),
            action: "patching namespace labels",
            diff: "no changes".to_string(),
            source: StoreError::NotFound {
                kind: "Namespace",
                name: "team-a".to_string(),
            },
        }
    }

    #[test]
    fn test_backoff_grows_and_resets() {
        let ctx = Arc::new(Reconciler::new(
            Arc::new(InMemoryStore::new()),
            ControllerConfig::default(),
        ));
        let error = persistence_error();

        let delays: Vec<Action> = (0..3)
            .map(|_| handle_reconciliation_error(object(), &error, Arc::clone(&ctx)))
            .collect();
        assert_eq!(
            delays,
            vec![
                Action::requeue(Duration::from_secs(5)),
                Action::requeue(Duration::from_secs(5)),
                Action::requeue(Duration::from_secs(10)),
            ]
        );

        assert!(ctx.record_success("team-a/labels"));
        assert_eq!(
            handle_reconciliation_error(object(), &error, Arc::clone(&ctx)),
            Action::requeue(Duration::from_secs(5))
        );
    }
}
