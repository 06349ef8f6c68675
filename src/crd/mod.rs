//! # Custom Resource Definitions
//!
//! CRD types for the Namespace Label Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - The `NamespaceLabel` resource and its desired label set
//! - `status.rs` - Status types recording the labels the controller applied

mod spec;
mod status;

// Re-export all public types
pub use spec::{NamespaceLabel, NamespaceLabelSpec};
pub use status::{Condition, NamespaceLabelStatus, Phase};

/// Label map as stored on Kubernetes objects (`metadata.labels`)
pub type Labels = std::collections::BTreeMap<String, String>;
