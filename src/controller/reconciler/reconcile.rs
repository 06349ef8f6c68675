//! # Reconcile
//!
//! One reconcile pass over a NamespaceLabel.
//!
//! ```text
//! Pending  --add finalizer--> Active --apply diff, record status--> Active
//! Active   --deletion requested--> Deleting
//! Deleting --remove active labels, then remove finalizer--> Gone
//! ```
//!
//! Ordering within a pass is fixed: the finalizer is persisted before any
//! label is applied, and labels are removed before the finalizer is released.
//! If the process dies mid-cleanup the finalizer is still present and the
//! next pass repeats the (idempotent) cleanup.

use crate::controller::reconciler::lifecycle::{
    finalizers_with_ours, finalizers_without_ours, LifecycleState,
};
use crate::controller::reconciler::status::{active_status, status_is_current};
use crate::controller::reconciler::types::{ReconcileOutcome, Reconciler, ReconcilerError};
use crate::controller::reconciler::LabelDiff;
use crate::crd::NamespaceLabel;
use crate::observability;
use crate::store::StoreError;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Controller entry point
///
/// The object handed in by the watch is only used for its identity; the pass
/// always re-reads current state from the store.
pub async fn reconcile(
    obj: Arc<NamespaceLabel>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    let Some(namespace) = obj.namespace() else {
        warn!(resource.name = name.as_str(), "NamespaceLabel without namespace, ignoring");
        return Ok(Action::await_change());
    };

    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
    );

    async move {
        let start = Instant::now();
        observability::metrics::increment_reconciliations();

        let result = reconcile_namespace_label(&ctx, &namespace, &name).await;
        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        let outcome = result?;

        let resource_key = format!("{namespace}/{name}");
        if outcome.is_terminal() {
            ctx.forget(&resource_key);
        } else if ctx.record_success(&resource_key) {
            info!("🔄 Backoff reset for {} after successful reconciliation", resource_key);
        }

        match &outcome {
            ReconcileOutcome::Applied(diff) => {
                info!(
                    outcome = outcome.as_str(),
                    "✅ Reconciled {} ({}, duration: {:.3}s)",
                    resource_key,
                    diff.summary(),
                    start.elapsed().as_secs_f64()
                );
            }
            ReconcileOutcome::CleanedUp(diff) => {
                info!(
                    outcome = outcome.as_str(),
                    "🧹 Cleaned up {} ({}), finalizer removed",
                    resource_key,
                    diff.summary()
                );
            }
            _ => debug!(outcome = outcome.as_str(), "reconcile.finished"),
        }

        Ok::<_, ReconcilerError>(next_action(&outcome, &ctx))
    }
    .instrument(span)
    .await
}

/// Decide what the controller should do after a successful pass
#[must_use]
pub fn next_action(outcome: &ReconcileOutcome, ctx: &Reconciler) -> Action {
    match outcome {
        ReconcileOutcome::Applied(_)
        | ReconcileOutcome::Unchanged
        | ReconcileOutcome::TargetMissing => {
            observability::metrics::increment_requeues_total("timer-based");
            Action::requeue(ctx.config.reconcile_interval())
        }
        ReconcileOutcome::NotFound | ReconcileOutcome::Gone | ReconcileOutcome::CleanedUp(_) => {
            Action::await_change()
        }
    }
}

/// Run one pass for the NamespaceLabel `namespace/name`
///
/// # Errors
///
/// Returns a retryable [`ReconcilerError`] when a store read or write fails.
/// Not-found conditions are reported through [`ReconcileOutcome`], not errors.
pub async fn reconcile_namespace_label(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let identity = format!("{namespace}/{name}");

    let Some(obj) = ctx
        .store
        .get_namespace_label(namespace, name)
        .await
        .map_err(|source| lookup_error(&identity, "NamespaceLabel", source))?
    else {
        info!("NamespaceLabel {} not found, assuming it was deleted", identity);
        return Ok(ReconcileOutcome::NotFound);
    };

    let state = LifecycleState::of(&obj);
    debug!(state = state.as_str(), "reconcile.state");

    match state {
        LifecycleState::Gone => Ok(ReconcileOutcome::Gone),
        LifecycleState::Pending => {
            info!("Adding finalizer to {}", identity);
            match ctx
                .store
                .set_finalizers(
                    namespace,
                    name,
                    obj.metadata.resource_version.as_deref(),
                    finalizers_with_ours(&obj),
                )
                .await
            {
                Ok(Some(updated)) => apply_labels(ctx, &identity, &updated).await,
                Ok(None) => Ok(ReconcileOutcome::NotFound),
                Err(e) if e.is_not_found() => Ok(ReconcileOutcome::NotFound),
                Err(e) => Err(ReconcilerError::from_write(
                    &identity,
                    "adding finalizer",
                    &LabelDiff::default(),
                    e,
                )),
            }
        }
        LifecycleState::Active => apply_labels(ctx, &identity, &obj).await,
        LifecycleState::Deleting => cleanup(ctx, &identity, &obj).await,
    }
}

/// Bring the namespace labels in line with `spec.labels` and record them
async fn apply_labels(
    ctx: &Reconciler,
    identity: &str,
    obj: &NamespaceLabel,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let namespace = obj.namespace().unwrap_or_default();
    let name = obj.name_any();

    let Some(target) = ctx
        .store
        .get_namespace(&namespace)
        .await
        .map_err(|source| lookup_error(identity, "Namespace", source))?
    else {
        warn!(
            "Namespace {} not found while reconciling {}, skipping (concurrent deletion)",
            namespace, identity
        );
        return Ok(ReconcileOutcome::TargetMissing);
    };

    let desired = &obj.spec.labels;
    let active = obj.status.as_ref().and_then(|s| s.active_labels.as_ref());
    let diff = LabelDiff::compute(desired, active).with_drift(desired, target.metadata.labels.as_ref());

    if diff.is_empty() && status_is_current(obj) {
        debug!("Labels and status already in sync for {}", identity);
        return Ok(ReconcileOutcome::Unchanged);
    }

    if !diff.is_empty() {
        debug!(diff = diff.summary().as_str(), "Patching namespace labels");
        match ctx
            .store
            .patch_namespace_labels(
                &namespace,
                target.metadata.resource_version.as_deref(),
                &diff,
            )
            .await
        {
            Ok(()) => observability::metrics::record_label_changes(&diff),
            Err(e) if e.is_not_found() => {
                warn!("Namespace {} disappeared before patch, skipping", namespace);
                return Ok(ReconcileOutcome::TargetMissing);
            }
            Err(e) => {
                return Err(ReconcilerError::from_write(
                    identity,
                    "patching namespace labels",
                    &diff,
                    e,
                ))
            }
        }
    }

    let status = active_status(obj, &diff);
    match ctx
        .store
        .patch_status(
            &namespace,
            &name,
            obj.metadata.resource_version.as_deref(),
            &status,
            active,
        )
        .await
    {
        Ok(()) => Ok(ReconcileOutcome::Applied(diff)),
        Err(e) if e.is_not_found() => Ok(ReconcileOutcome::NotFound),
        Err(e) => Err(ReconcilerError::from_write(
            identity,
            "recording active labels",
            &diff,
            e,
        )),
    }
}

/// Remove every label recorded in `status.activeLabels`, then release the finalizer
///
/// The delete set comes from what was applied, not from `spec.labels`: the
/// spec may have been edited after the last successful apply.
async fn cleanup(
    ctx: &Reconciler,
    identity: &str,
    obj: &NamespaceLabel,
) -> Result<ReconcileOutcome, ReconcilerError> {
    let namespace = obj.namespace().unwrap_or_default();
    let name = obj.name_any();
    let active = obj.status.as_ref().and_then(|s| s.active_labels.as_ref());
    let diff = LabelDiff::cleanup(active);

    if !diff.is_empty() {
        match ctx
            .store
            .get_namespace(&namespace)
            .await
            .map_err(|source| lookup_error(identity, "Namespace", source))?
        {
            Some(target) => {
                match ctx
                    .store
                    .patch_namespace_labels(
                        &namespace,
                        target.metadata.resource_version.as_deref(),
                        &diff,
                    )
                    .await
                {
                    Ok(()) => observability::metrics::record_label_changes(&diff),
                    Err(e) if e.is_not_found() => {
                        info!("Namespace {} already gone, nothing to clean", namespace);
                    }
                    Err(e) => {
                        return Err(ReconcilerError::from_write(
                            identity,
                            "removing namespace labels",
                            &diff,
                            e,
                        ))
                    }
                }
            }
            None => info!("Namespace {} already gone, nothing to clean", namespace),
        }
    }

    match ctx
        .store
        .set_finalizers(
            &namespace,
            &name,
            obj.metadata.resource_version.as_deref(),
            finalizers_without_ours(obj),
        )
        .await
    {
        Ok(_) => Ok(ReconcileOutcome::CleanedUp(diff)),
        Err(e) if e.is_not_found() => Ok(ReconcileOutcome::CleanedUp(diff)),
        Err(e) => Err(ReconcilerError::from_write(
            identity,
            "removing finalizer",
            &diff,
            e,
        )),
    }
}

fn lookup_error(identity: &str, what: &'static str, source: StoreError) -> ReconcilerError {
    ReconcilerError::Lookup {
        identity: identity.to_string(),
        what,
        source,
    }
}
