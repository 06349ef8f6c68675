//! # Status
//!
//! Builds the status written after a successful apply.

use crate::controller::reconciler::LabelDiff;
use crate::crd::{Condition, NamespaceLabel, NamespaceLabelStatus, Phase};

/// Status recording that `spec.labels` is now what the namespace carries
#[must_use]
pub fn active_status(obj: &NamespaceLabel, diff: &LabelDiff) -> NamespaceLabelStatus {
    let now = chrono::Utc::now().to_rfc3339();
    let count = obj.spec.labels.len();
    let message = if diff.is_empty() {
        format!("{count} labels in sync")
    } else {
        format!("{count} labels in sync ({})", diff.summary())
    };

    NamespaceLabelStatus {
        active_labels: Some(obj.spec.labels.clone()),
        phase: Some(Phase::Active),
        message: Some(message.clone()),
        conditions: vec![Condition {
            r#type: "Ready".to_string(),
            status: "True".to_string(),
            last_transition_time: Some(now.clone()),
            reason: Some("LabelsApplied".to_string()),
            message: Some(message),
        }],
        observed_generation: obj.metadata.generation,
        last_reconcile_time: Some(now),
    }
}

/// Whether the current status already reflects the spec
///
/// Used to skip status writes that would only bump timestamps and retrigger
/// the watch.
#[must_use]
pub fn status_is_current(obj: &NamespaceLabel) -> bool {
    obj.status.as_ref().is_some_and(|status| {
        status.phase == Some(Phase::Active)
            && status.active_labels.as_ref() == Some(&obj.spec.labels)
            && status.observed_generation == obj.metadata.generation
    })
}
