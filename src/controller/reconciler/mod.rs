//! # Reconciler
//!
//! Keeps a Namespace's labels in line with the NamespaceLabel declared inside it.
//!
//! - `diff` - minimal add/remove computation over label maps
//! - `lifecycle` - finalizer/deletion state derived from the resource
//! - `reconcile` - the reconcile pass and its state machine
//! - `status` - status written after a successful apply
//! - `types` - context, outcomes and errors

mod diff;
pub mod lifecycle;
mod reconcile;
mod status;
mod types;

pub use diff::LabelDiff;
pub use lifecycle::LifecycleState;
pub use reconcile::{next_action, reconcile, reconcile_namespace_label};
pub use status::{active_status, status_is_current};
pub use types::{BackoffState, ReconcileOutcome, Reconciler, ReconcilerError};
