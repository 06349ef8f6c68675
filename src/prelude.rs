//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use namespace_label_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - CRD types (NamespaceLabel, NamespaceLabelSpec, NamespaceLabelStatus, ...)
//! - Store trait and implementations
//! - Reconciler types
//! - Admission validator and policy
//! - Configuration

// CRD types - most commonly used
pub use crate::crd::*;

// Object store
pub use crate::store::{InMemoryStore, KubeStore, LabelStore, StoreError, StoreOperation};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, reconcile_namespace_label, BackoffState, LabelDiff, LifecycleState,
    ReconcileOutcome, Reconciler, ReconcilerError,
};

// Admission
pub use crate::admission::{AdmissionValidator, ProtectedDomains, ValidationError};

// Config types
pub use crate::config::ControllerConfig;
