//! # Object Store
//!
//! The reconciler and the admission validator never talk to the API server
//! directly. They go through [`LabelStore`], which exposes exactly the reads
//! and writes they need:
//!
//! - reads: one NamespaceLabel, NamespaceLabels in a namespace, one Namespace
//! - writes: a minimal label patch on a Namespace, the finalizer list of a
//!   NamespaceLabel, and NamespaceLabel status
//!
//! Every write carries the `resourceVersion` the caller read, so a write based
//! on stale state fails with [`StoreError::Conflict`] instead of clobbering a
//! concurrent change.
//!
//! Implementations:
//! - [`KubeStore`] - backed by the Kubernetes API
//! - [`InMemoryStore`] - in-process store with the same concurrency semantics,
//!   used by tests

mod kubernetes;
mod memory;

pub use kubernetes::KubeStore;
pub use memory::{InMemoryStore, StoreOperation};

use crate::controller::reconciler::LabelDiff;
use crate::crd::{Labels, NamespaceLabel, NamespaceLabelStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use thiserror::Error;

/// Errors returned by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency failure: the object changed since it was read
    #[error("conflict writing {kind} {name}: object was modified")]
    Conflict { kind: &'static str, name: String },
    /// The object does not exist (anymore)
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },
    /// Any other API failure
    #[error("{kind} {name}: {source}")]
    Api {
        kind: &'static str,
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Read/write access to NamespaceLabels and Namespaces
#[async_trait]
pub trait LabelStore: Send + Sync + std::fmt::Debug {
    /// Fetch a NamespaceLabel, `None` if it does not exist
    async fn get_namespace_label(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<NamespaceLabel>, StoreError>;

    /// List NamespaceLabels in one namespace
    async fn list_namespace_labels(&self, namespace: &str)
        -> Result<Vec<NamespaceLabel>, StoreError>;

    /// Fetch a Namespace, `None` if it does not exist
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError>;

    /// Apply a label diff to a Namespace
    ///
    /// Only keys named by the diff are touched. Removing an absent key is a no-op.
    async fn patch_namespace_labels(
        &self,
        name: &str,
        resource_version: Option<&str>,
        diff: &LabelDiff,
    ) -> Result<(), StoreError>;

    /// Replace the finalizer list of a NamespaceLabel
    ///
    /// Returns the updated object, or `None` when clearing the last finalizer of
    /// an object scheduled for deletion caused the store to remove it.
    async fn set_finalizers(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        finalizers: Vec<String>,
    ) -> Result<Option<NamespaceLabel>, StoreError>;

    /// Write NamespaceLabel status
    ///
    /// `status.active_labels` fully replaces `previous_active`.
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &NamespaceLabelStatus,
        previous_active: Option<&Labels>,
    ) -> Result<(), StoreError>;
}
