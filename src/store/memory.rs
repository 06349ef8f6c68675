//! # In-memory Store
//!
//! [`LabelStore`] kept in process memory. Mirrors the API server behaviour the
//! reconciler relies on:
//!
//! - every write bumps the object's `resourceVersion`
//! - a write carrying a stale `resourceVersion` fails with a conflict
//! - an object with finalizers is only marked for deletion; it disappears
//!   once its last finalizer is removed
//!
//! Failures can be injected per operation to exercise retry paths, and
//! successful writes are journaled so ordering can be asserted.

use super::{LabelStore, StoreError};
use crate::controller::reconciler::LabelDiff;
use crate::crd::{Labels, NamespaceLabel, NamespaceLabelStatus, NamespaceLabelSpec};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store operations, used to inject failures and to journal writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetNamespaceLabel,
    ListNamespaceLabels,
    GetNamespace,
    PatchNamespaceLabels,
    SetFinalizers,
    PatchStatus,
}

#[derive(Debug, Clone, Copy)]
enum Injected {
    Conflict,
    Failure,
}

#[derive(Debug, Default)]
struct State {
    revision: u64,
    namespaces: BTreeMap<String, Namespace>,
    objects: BTreeMap<(String, String), NamespaceLabel>,
    injected: HashMap<StoreOperation, VecDeque<Injected>>,
    writes: Vec<StoreOperation>,
}

impl State {
    fn next_revision(&mut self) -> Option<String> {
        self.revision += 1;
        Some(self.revision.to_string())
    }

    fn take_injected(
        &mut self,
        op: StoreOperation,
        kind: &'static str,
        name: &str,
    ) -> Result<(), StoreError> {
        let Some(injected) = self.injected.get_mut(&op).and_then(VecDeque::pop_front) else {
            return Ok(());
        };
        Err(match injected {
            Injected::Conflict => StoreError::Conflict {
                kind,
                name: name.to_string(),
            },
            Injected::Failure => StoreError::Api {
                kind,
                name: name.to_string(),
                source: format!("injected failure in {op:?}").into(),
            },
        })
    }
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

fn check_version(
    kind: &'static str,
    name: &str,
    current: Option<&str>,
    expected: Option<&str>,
) -> Result<(), StoreError> {
    match expected {
        Some(expected) if current != Some(expected) => Err(StoreError::Conflict {
            kind,
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

fn not_found(kind: &'static str, name: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        name: name.to_string(),
    }
}

fn deletion_time() -> Result<Time, StoreError> {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    serde_json::from_value(serde_json::Value::String(now)).map_err(|e| StoreError::Api {
        kind: "NamespaceLabel",
        name: String::new(),
        source: Box::new(e),
    })
}

/// [`LabelStore`] held in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or replace a Namespace with the given labels
    pub fn add_namespace(&self, name: &str, labels: Labels) {
        let mut state = self.lock();
        let resource_version = state.next_revision();
        state.namespaces.insert(
            name.to_string(),
            Namespace {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    labels: Some(labels),
                    resource_version,
                    ..ObjectMeta::default()
                },
                ..Namespace::default()
            },
        );
    }

    pub fn remove_namespace(&self, name: &str) {
        self.lock().namespaces.remove(name);
    }

    /// Current labels of a Namespace, `None` if it does not exist
    #[must_use]
    pub fn namespace_labels_of(&self, name: &str) -> Option<Labels> {
        self.lock()
            .namespaces
            .get(name)
            .map(|ns| ns.metadata.labels.clone().unwrap_or_default())
    }

    /// Change a Namespace label the way another actor would
    ///
    /// `None` removes the key.
    pub fn set_external_label(&self, namespace: &str, label: &str, value: Option<&str>) {
        let mut state = self.lock();
        let resource_version = state.next_revision();
        if let Some(ns) = state.namespaces.get_mut(namespace) {
            let labels = ns.metadata.labels.get_or_insert_with(Labels::new);
            match value {
                Some(value) => labels.insert(label.to_string(), value.to_string()),
                None => labels.remove(label),
            };
            ns.metadata.resource_version = resource_version;
        }
    }

    /// Store a new NamespaceLabel at generation 1
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the name is taken in that namespace.
    pub fn create_namespace_label(
        &self,
        mut obj: NamespaceLabel,
    ) -> Result<NamespaceLabel, StoreError> {
        let namespace = obj.metadata.namespace.clone().unwrap_or_default();
        let name = obj.metadata.name.clone().unwrap_or_default();
        let mut state = self.lock();
        if state.objects.contains_key(&key(&namespace, &name)) {
            return Err(StoreError::Conflict {
                kind: "NamespaceLabel",
                name,
            });
        }
        obj.metadata.resource_version = state.next_revision();
        obj.metadata.generation = Some(1);
        state.objects.insert(key(&namespace, &name), obj.clone());
        Ok(obj)
    }

    /// Replace `spec.labels`, bumping the generation
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the object does not exist.
    pub fn update_spec(&self, namespace: &str, name: &str, labels: Labels) -> Result<(), StoreError> {
        let mut state = self.lock();
        let resource_version = state.next_revision();
        let obj = state
            .objects
            .get_mut(&key(namespace, name))
            .ok_or_else(|| not_found("NamespaceLabel", name))?;
        obj.spec = NamespaceLabelSpec { labels };
        obj.metadata.generation = Some(obj.metadata.generation.unwrap_or(0) + 1);
        obj.metadata.resource_version = resource_version;
        Ok(())
    }

    /// Request deletion the way the API server handles a DELETE
    ///
    /// Objects without finalizers are removed at once; others get a
    /// deletion timestamp and stay until their finalizers are cleared.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the object does not exist.
    pub fn request_deletion(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let timestamp = deletion_time()?;
        let mut state = self.lock();
        let resource_version = state.next_revision();
        let object_key = key(namespace, name);
        let obj = state
            .objects
            .get_mut(&object_key)
            .ok_or_else(|| not_found("NamespaceLabel", name))?;
        if obj.metadata.finalizers.as_ref().is_none_or(Vec::is_empty) {
            state.objects.remove(&object_key);
            return Ok(());
        }
        if obj.metadata.deletion_timestamp.is_none() {
            obj.metadata.deletion_timestamp = Some(timestamp);
            obj.metadata.resource_version = resource_version;
        }
        Ok(())
    }

    /// Current copy of a NamespaceLabel
    #[must_use]
    pub fn namespace_label(&self, namespace: &str, name: &str) -> Option<NamespaceLabel> {
        self.lock().objects.get(&key(namespace, name)).cloned()
    }

    /// Make the next call of `op` fail with a non-conflict error
    pub fn inject_failure(&self, op: StoreOperation) {
        self.lock()
            .injected
            .entry(op)
            .or_default()
            .push_back(Injected::Failure);
    }

    /// Make the next call of `op` fail with a conflict
    pub fn inject_conflict(&self, op: StoreOperation) {
        self.lock()
            .injected
            .entry(op)
            .or_default()
            .push_back(Injected::Conflict);
    }

    /// Successful writes, oldest first
    #[must_use]
    pub fn writes(&self) -> Vec<StoreOperation> {
        self.lock().writes.clone()
    }
}

#[async_trait]
impl LabelStore for InMemoryStore {
    async fn get_namespace_label(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<NamespaceLabel>, StoreError> {
        let mut state = self.lock();
        state.take_injected(StoreOperation::GetNamespaceLabel, "NamespaceLabel", name)?;
        Ok(state.objects.get(&key(namespace, name)).cloned())
    }

    async fn list_namespace_labels(
        &self,
        namespace: &str,
    ) -> Result<Vec<NamespaceLabel>, StoreError> {
        let mut state = self.lock();
        state.take_injected(StoreOperation::ListNamespaceLabels, "NamespaceLabel", namespace)?;
        Ok(state
            .objects
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, StoreError> {
        let mut state = self.lock();
        state.take_injected(StoreOperation::GetNamespace, "Namespace", name)?;
        Ok(state.namespaces.get(name).cloned())
    }

    async fn patch_namespace_labels(
        &self,
        name: &str,
        resource_version: Option<&str>,
        diff: &LabelDiff,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.take_injected(StoreOperation::PatchNamespaceLabels, "Namespace", name)?;
        let next_version = state.next_revision();
        let ns = state
            .namespaces
            .get_mut(name)
            .ok_or_else(|| not_found("Namespace", name))?;
        check_version(
            "Namespace",
            name,
            ns.metadata.resource_version.as_deref(),
            resource_version,
        )?;
        diff.apply_to(&mut ns.metadata.labels);
        ns.metadata.resource_version = next_version;
        state.writes.push(StoreOperation::PatchNamespaceLabels);
        Ok(())
    }

    async fn set_finalizers(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        finalizers: Vec<String>,
    ) -> Result<Option<NamespaceLabel>, StoreError> {
        let mut state = self.lock();
        state.take_injected(StoreOperation::SetFinalizers, "NamespaceLabel", name)?;
        let next_version = state.next_revision();
        let object_key = key(namespace, name);
        let obj = state
            .objects
            .get_mut(&object_key)
            .ok_or_else(|| not_found("NamespaceLabel", name))?;
        check_version(
            "NamespaceLabel",
            name,
            obj.metadata.resource_version.as_deref(),
            resource_version,
        )?;

        if finalizers.is_empty() && obj.metadata.deletion_timestamp.is_some() {
            state.objects.remove(&object_key);
            state.writes.push(StoreOperation::SetFinalizers);
            return Ok(None);
        }

        obj.metadata.finalizers = (!finalizers.is_empty()).then_some(finalizers);
        obj.metadata.resource_version = next_version;
        let updated = obj.clone();
        state.writes.push(StoreOperation::SetFinalizers);
        Ok(Some(updated))
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &NamespaceLabelStatus,
        _previous_active: Option<&Labels>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.take_injected(StoreOperation::PatchStatus, "NamespaceLabel", name)?;
        let next_version = state.next_revision();
        let obj = state
            .objects
            .get_mut(&key(namespace, name))
            .ok_or_else(|| not_found("NamespaceLabel", name))?;
        check_version(
            "NamespaceLabel",
            name,
            obj.metadata.resource_version.as_deref(),
            resource_version,
        )?;
        obj.status = Some(status.clone());
        obj.metadata.resource_version = next_version;
        state.writes.push(StoreOperation::PatchStatus);
        Ok(())
    }
}
