//! # Lifecycle State
//!
//! The finalizer list and deletion timestamp on a NamespaceLabel are mapped to
//! a [`LifecycleState`] here and nowhere else. The reconciler matches on the
//! enum; string finalizer handling stays at this boundary.

use crate::constants::FINALIZER;
use crate::crd::NamespaceLabel;

/// Where a NamespaceLabel is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Never reconciled: finalizer absent, no deletion requested
    Pending,
    /// Finalizer present, normal operation
    Active,
    /// Deletion requested, finalizer present, cleanup pending
    Deleting,
    /// Deletion requested and finalizer gone; nothing left to do
    Gone,
}

impl LifecycleState {
    #[must_use]
    pub fn of(obj: &NamespaceLabel) -> Self {
        let deletion_requested = obj.metadata.deletion_timestamp.is_some();
        match (has_finalizer(obj), deletion_requested) {
            (false, false) => LifecycleState::Pending,
            (true, false) => LifecycleState::Active,
            (true, true) => LifecycleState::Deleting,
            (false, true) => LifecycleState::Gone,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Active => "active",
            LifecycleState::Deleting => "deleting",
            LifecycleState::Gone => "gone",
        }
    }
}

#[must_use]
pub fn has_finalizer(obj: &NamespaceLabel) -> bool {
    obj.metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == FINALIZER))
}

/// Finalizer list with ours appended, other finalizers preserved
#[must_use]
pub fn finalizers_with_ours(obj: &NamespaceLabel) -> Vec<String> {
    let mut finalizers = obj.metadata.finalizers.clone().unwrap_or_default();
    if !finalizers.iter().any(|f| f == FINALIZER) {
        finalizers.push(FINALIZER.to_string());
    }
    finalizers
}

/// Finalizer list with ours removed, other finalizers preserved
#[must_use]
pub fn finalizers_without_ours(obj: &NamespaceLabel) -> Vec<String> {
    obj.metadata
        .finalizers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|f| f != FINALIZER)
        .collect()
}
