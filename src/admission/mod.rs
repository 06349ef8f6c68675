//! # Admission
//!
//! Validation of NamespaceLabel create/update/delete requests.
//!
//! - `policy` - protected label domains
//! - `webhook` - `AdmissionReview` HTTP adapter
//!
//! The validator itself has no HTTP knowledge. It answers with
//! `Result<(), ValidationError>` and the webhook turns that into an
//! allow/deny response.

pub mod policy;
pub mod webhook;

pub use policy::ProtectedDomains;

use crate::crd::NamespaceLabel;
use crate::observability;
use crate::store::{LabelStore, StoreError};
use kube::ResourceExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a request is rejected
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Another NamespaceLabel already exists in the namespace
    #[error("namespace {namespace} already has a NamespaceLabel ({existing}); only one is allowed per namespace")]
    Conflict { namespace: String, existing: String },
    /// A desired key falls in a protected domain
    #[error("setting labels of the {domain} domain is not allowed (label {key})")]
    ProtectedLabel { key: String, domain: String },
    /// The uniqueness check could not read existing objects
    #[error("failed to list NamespaceLabels in {namespace}: {source}")]
    Lookup {
        namespace: String,
        #[source]
        source: StoreError,
    },
}

/// Admission validator for NamespaceLabel requests
#[derive(Debug, Clone)]
pub struct AdmissionValidator {
    store: Arc<dyn LabelStore>,
    policy: ProtectedDomains,
}

impl AdmissionValidator {
    #[must_use]
    pub fn new(store: Arc<dyn LabelStore>, policy: ProtectedDomains) -> Self {
        Self { store, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &ProtectedDomains {
        &self.policy
    }

    /// Validate a create request
    ///
    /// # Errors
    ///
    /// [`ValidationError::Conflict`] if the namespace already holds a
    /// NamespaceLabel, [`ValidationError::ProtectedLabel`] if a key is in a
    /// protected domain, [`ValidationError::Lookup`] if the store cannot be read.
    pub async fn validate_create(&self, candidate: &NamespaceLabel) -> Result<(), ValidationError> {
        let result = self.check_create(candidate).await;
        record("create", &result);
        result
    }

    /// Validate an update request
    ///
    /// Only the protected-domain policy is checked; uniqueness was settled at
    /// create time. Updates to an object being deleted and updates that leave
    /// `spec.labels` untouched (finalizer and status writes) are always
    /// admitted, so a policy change can never wedge a deletion.
    ///
    /// # Errors
    ///
    /// [`ValidationError::ProtectedLabel`] if a new key is in a protected domain.
    pub fn validate_update(
        &self,
        candidate: &NamespaceLabel,
        previous: Option<&NamespaceLabel>,
    ) -> Result<(), ValidationError> {
        let labels_unchanged =
            previous.is_some_and(|previous| previous.spec.labels == candidate.spec.labels);
        let result = if candidate.metadata.deletion_timestamp.is_some() || labels_unchanged {
            Ok(())
        } else {
            self.check_labels(candidate)
        };
        record("update", &result);
        result
    }

    /// Validate a delete request; deletes are always allowed
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn validate_delete(&self, candidate: Option<&NamespaceLabel>) -> Result<(), ValidationError> {
        if let Some(obj) = candidate {
            debug!(resource.name = obj.name_any().as_str(), "delete admitted");
        }
        let result = Ok(());
        record("delete", &result);
        result
    }

    async fn check_create(&self, candidate: &NamespaceLabel) -> Result<(), ValidationError> {
        let namespace = candidate.namespace().unwrap_or_default();

        let existing = self
            .store
            .list_namespace_labels(&namespace)
            .await
            .map_err(|source| ValidationError::Lookup {
                namespace: namespace.clone(),
                source,
            })?;

        if let Some(other) = existing.first() {
            return Err(ValidationError::Conflict {
                namespace,
                existing: other.name_any(),
            });
        }

        self.check_labels(candidate)
    }

    fn check_labels(&self, candidate: &NamespaceLabel) -> Result<(), ValidationError> {
        match self.policy.first_violation(&candidate.spec.labels) {
            Some((key, domain)) => Err(ValidationError::ProtectedLabel {
                key: key.to_string(),
                domain: domain.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn record(operation: &str, result: &Result<(), ValidationError>) {
    match result {
        Ok(()) => {
            observability::metrics::record_admission_decision(operation, true);
        }
        Err(e) => {
            if matches!(e, ValidationError::Lookup { .. }) {
                warn!(operation, error = %e, "admission lookup failed");
            } else {
                info!(operation, reason = %e, "admission denied");
            }
            observability::metrics::record_admission_decision(operation, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::NamespaceLabelSpec;
    use crate::store::{InMemoryStore, StoreOperation};

    fn candidate(namespace: &str, name: &str, labels: &[(&str, &str)]) -> NamespaceLabel {
        let mut obj = NamespaceLabel::new(
            name,
            NamespaceLabelSpec {
                labels: labels
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            },
        );
        obj.metadata.namespace = Some(namespace.to_string());
        obj
    }

    fn validator(store: Arc<InMemoryStore>, domains: &str) -> AdmissionValidator {
        AdmissionValidator::new(store, ProtectedDomains::parse(domains))
    }

    #[tokio::test]
    async fn test_create_rejects_existing_object_with_same_name() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_namespace_label(candidate("team-a", "labels", &[]))
            .unwrap();
        let validator = validator(Arc::clone(&store), "");

        let result = validator
            .validate_create(&candidate("team-a", "labels", &[("a", "1")]))
            .await;
        assert!(matches!(
            result,
            Err(ValidationError::Conflict { ref existing, .. }) if existing == "labels"
        ));
    }

    #[tokio::test]
    async fn test_create_fails_closed_on_lookup_error() {
        let store = Arc::new(InMemoryStore::new());
        store.inject_failure(StoreOperation::ListNamespaceLabels);
        let validator = validator(Arc::clone(&store), "");

        let result = validator
            .validate_create(&candidate("team-a", "labels", &[]))
            .await;
        assert!(matches!(result, Err(ValidationError::Lookup { .. })));
    }

    #[test]
    fn test_update_rejects_protected_key() {
        let validator = validator(Arc::new(InMemoryStore::new()), "kubernetes.io");
        let err = validator
            .validate_update(
                &candidate("team-a", "labels", &[("node.kubernetes.io/x", "1")]),
                None,
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "setting labels of the kubernetes.io domain is not allowed (label node.kubernetes.io/x)"
        );
    }

    #[test]
    fn test_delete_always_allowed() {
        let validator = validator(Arc::new(InMemoryStore::new()), "kubernetes.io");
        let obj = candidate("team-a", "labels", &[("kubernetes.io/x", "1")]);
        assert!(matches!(validator.validate_delete(Some(&obj)), Ok(())));
        assert!(matches!(validator.validate_delete(None), Ok(())));
    }
}
