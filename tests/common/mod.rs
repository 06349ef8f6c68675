//! Common test utilities
//!
//! Fixtures for driving the reconciler and the admission validator against
//! the in-memory store.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use namespace_label_controller::config::ControllerConfig;
use namespace_label_controller::controller::reconciler::{
    reconcile_namespace_label, ReconcileOutcome, Reconciler, ReconcilerError,
};
use namespace_label_controller::crd::{Labels, NamespaceLabel, NamespaceLabelSpec};
use namespace_label_controller::store::{InMemoryStore, LabelStore};
use std::sync::Arc;

pub const NAMESPACE: &str = "team-a";
pub const NAME: &str = "labels";

pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

pub fn namespace_label(namespace: &str, name: &str, pairs: &[(&str, &str)]) -> NamespaceLabel {
    let mut obj = NamespaceLabel::new(
        name,
        NamespaceLabelSpec {
            labels: labels(pairs),
        },
    );
    obj.metadata.namespace = Some(namespace.to_string());
    obj
}

/// A reconciler wired to an in-memory store holding one namespace
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub reconciler: Reconciler,
}

impl Harness {
    /// Namespace `team-a` with the given labels, no NamespaceLabel yet
    pub fn with_namespace(pairs: &[(&str, &str)]) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.add_namespace(NAMESPACE, labels(pairs));
        let reconciler = Reconciler::new(
            Arc::clone(&store) as Arc<dyn LabelStore>,
            ControllerConfig::default(),
        );
        Self { store, reconciler }
    }

    pub fn create(&self, pairs: &[(&str, &str)]) {
        self.store
            .create_namespace_label(namespace_label(NAMESPACE, NAME, pairs))
            .unwrap();
    }

    pub async fn reconcile(&self) -> Result<ReconcileOutcome, ReconcilerError> {
        reconcile_namespace_label(&self.reconciler, NAMESPACE, NAME).await
    }

    pub fn namespace_labels(&self) -> Labels {
        self.store.namespace_labels_of(NAMESPACE).unwrap_or_default()
    }

    pub fn active_labels(&self) -> Option<Labels> {
        self.store
            .namespace_label(NAMESPACE, NAME)
            .and_then(|obj| obj.status)
            .and_then(|status| status.active_labels)
    }

    pub fn object(&self) -> Option<NamespaceLabel> {
        self.store.namespace_label(NAMESPACE, NAME)
    }
}
