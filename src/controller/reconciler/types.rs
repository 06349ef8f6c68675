//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::LabelDiff;
use crate::store::{LabelStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Reconciliation errors
///
/// Every variant is retryable: the loop is level-triggered, so the driving
/// controller re-runs the pass with fresh reads.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// A write was based on a stale read
    #[error("conflict while {action} for {identity}; will retry with fresh state")]
    StoreConflict {
        identity: String,
        action: &'static str,
    },
    /// A write failed for any other reason
    #[error("failed {action} for {identity} (attempted: {diff}): {source}")]
    Persistence {
        identity: String,
        action: &'static str,
        diff: String,
        #[source]
        source: StoreError,
    },
    /// A read failed for a reason other than not-found
    #[error("failed to read {what} for {identity}: {source}")]
    Lookup {
        identity: String,
        what: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ReconcilerError {
    /// Wrap a write failure, keeping conflicts distinguishable
    pub(crate) fn from_write(
        identity: &str,
        action: &'static str,
        diff: &LabelDiff,
        source: StoreError,
    ) -> Self {
        if source.is_conflict() {
            ReconcilerError::StoreConflict {
                identity: identity.to_string(),
                action,
            }
        } else {
            ReconcilerError::Persistence {
                identity: identity.to_string(),
                action,
                diff: diff.summary(),
                source,
            }
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcilerError::StoreConflict { .. })
    }
}

/// Result of one reconcile pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The NamespaceLabel no longer exists
    NotFound,
    /// Deletion already complete from the controller's point of view
    Gone,
    /// The target namespace does not exist; nothing to reconcile against
    TargetMissing,
    /// Labels were applied (the diff may be empty if only status changed)
    Applied(LabelDiff),
    /// Namespace and status already matched; no writes
    Unchanged,
    /// Cleanup ran and the finalizer was removed
    CleanedUp(LabelDiff),
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::NotFound => "not-found",
            ReconcileOutcome::Gone => "gone",
            ReconcileOutcome::TargetMissing => "target-missing",
            ReconcileOutcome::Applied(_) => "applied",
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::CleanedUp(_) => "cleaned-up",
        }
    }

    /// The resource is gone or about to be; nothing further will happen to it
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconcileOutcome::NotFound | ReconcileOutcome::Gone | ReconcileOutcome::CleanedUp(_)
        )
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared reconciler context
pub struct Reconciler {
    pub store: Arc<dyn LabelStore>,
    pub config: ControllerConfig,
    // Backoff state per resource (identified by namespace/name)
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn LabelStore>, config: ControllerConfig) -> Self {
        Self {
            store,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failed pass and return the backoff to wait, in seconds
    pub fn record_failure(&self, resource_key: &str) -> (u64, u32) {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(resource_key.to_string()).or_insert_with(|| {
            BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
        });
        state.increment_error();
        (state.backoff.next_backoff_seconds(), state.error_count)
    }

    /// Reset backoff after a successful pass; returns whether the resource was backing off
    pub fn record_success(&self, resource_key: &str) -> bool {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match states.get_mut(resource_key) {
            Some(state) => {
                let had_errors = state.error_count > 0;
                state.reset();
                had_errors
            }
            None => false,
        }
    }

    /// Drop backoff tracking for a resource that no longer exists
    pub fn forget(&self, resource_key: &str) {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(resource_key);
    }

    /// Number of resources with backoff tracking
    #[must_use]
    pub fn tracked_backoffs(&self) -> usize {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
