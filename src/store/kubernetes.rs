//! # Kubernetes-backed Store
//!
//! Implements [`LabelStore`] against the API server using JSON merge patches.
//! Each patch includes `metadata.resourceVersion`, which makes the API server
//! reject it with 409 if the object changed since it was read.

use super::{LabelStore, StoreError};
use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::LabelDiff;
use crate::crd::{Labels, NamespaceLabel, NamespaceLabelStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::{json, Map, Value};

/// [`LabelStore`] backed by a Kubernetes client
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespace_labels(&self, namespace: &str) -> Api<NamespaceLabel> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }
}

/// Map a kube error to the store taxonomy
fn classify(kind: &'static str, name: &str, error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(ref status) if status.code == 409 => StoreError::Conflict {
            kind,
            name: name.to_string(),
        },
        kube::Error::Api(ref status) if status.code == 404 => StoreError::NotFound {
            kind,
            name: name.to_string(),
        },
        other => StoreError::Api {
            kind,
            name: name.to_string(),
            source: Box::new(other),
        },
    }
}

/// `metadata` object for a merge patch, carrying the resource version precondition
fn metadata_with_version(resource_version: Option<&str>) -> Map<String, Value> {
    let mut metadata = Map::new();
    if let Some(rv) = resource_version {
        metadata.insert("resourceVersion".to_string(), json!(rv));
    }
    metadata
}

/// Merge patch body that replaces `previous` with `next`
///
/// Merge patches merge maps, so keys that disappear must be sent as `null`.
#[must_use]
pub fn label_replacement_patch(next: &Labels, previous: Option<&Labels>) -> Value {
    let mut patch = Map::new();
    if let Some(previous) = previous {
        for key in previous.keys().filter(|k| !next.contains_key(*k)) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    for (key, value) in next {
        patch.insert(key.clone(), json!(value));
    }
    Value::Object(patch)
}

#[async_trait]
impl LabelStore for KubeStore {
    async fn get_namespace_label(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<NamespaceLabel>, StoreError> {
        self.namespace_labels(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify("NamespaceLabel", name, e))
    }

    async fn list_namespace_labels(
        &self,
        namespace: &str,
    ) -> Result<Vec<NamespaceLabel>, StoreError> {
        self.namespace_labels(namespace)
            .list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| classify("NamespaceLabel", namespace, e))
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError> {
        self.namespaces()
            .get_opt(name)
            .await
            .map_err(|e| classify("Namespace", name, e))
    }

    async fn patch_namespace_labels(
        &self,
        name: &str,
        resource_version: Option<&str>,
        diff: &LabelDiff,
    ) -> Result<(), StoreError> {
        let mut metadata = metadata_with_version(resource_version);
        metadata.insert("labels".to_string(), diff.to_merge_patch());
        let patch = json!({ "metadata": metadata });

        self.namespaces()
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|e| classify("Namespace", name, e))
    }

    async fn set_finalizers(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        finalizers: Vec<String>,
    ) -> Result<Option<NamespaceLabel>, StoreError> {
        let mut metadata = metadata_with_version(resource_version);
        metadata.insert("finalizers".to_string(), json!(finalizers));
        let patch = json!({ "metadata": metadata });

        match self
            .namespace_labels(namespace)
            .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
        {
            Ok(updated) => Ok(Some(updated)),
            // Clearing the last finalizer lets the API server delete the object
            // before the response is built
            Err(e) => match classify("NamespaceLabel", name, e) {
                StoreError::NotFound { .. } if finalizers.is_empty() => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &NamespaceLabelStatus,
        previous_active: Option<&Labels>,
    ) -> Result<(), StoreError> {
        let mut status_value = serde_json::to_value(status).map_err(|e| StoreError::Api {
            kind: "NamespaceLabel",
            name: name.to_string(),
            source: Box::new(e),
        })?;
        if let (Some(object), Some(active)) =
            (status_value.as_object_mut(), status.active_labels.as_ref())
        {
            object.insert(
                "activeLabels".to_string(),
                label_replacement_patch(active, previous_active),
            );
        }
        let patch = json!({
            "metadata": metadata_with_version(resource_version),
            "status": status_value,
        });

        self.namespace_labels(namespace)
            .patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|e| classify("NamespaceLabel", name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_replacement_patch_nulls_dropped_keys() {
        let previous = labels(&[("a", "1"), ("c", "3")]);
        let next = labels(&[("a", "1"), ("b", "2")]);
        let patch = label_replacement_patch(&next, Some(&previous));
        assert_eq!(patch, json!({"a": "1", "b": "2", "c": null}));
    }

    #[test]
    fn test_replacement_patch_without_previous() {
        let patch = label_replacement_patch(&labels(&[("a", "1")]), None);
        assert_eq!(patch, json!({"a": "1"}));
    }

    #[test]
    fn test_metadata_carries_resource_version() {
        let metadata = metadata_with_version(Some("42"));
        assert_eq!(Value::Object(metadata), json!({"resourceVersion": "42"}));
        assert!(metadata_with_version(None).is_empty());
    }
}
