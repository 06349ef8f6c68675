//! # NamespaceLabel Spec
//!
//! Main CRD specification type.

use serde::{Deserialize, Serialize};

/// NamespaceLabel Custom Resource Definition
///
/// Declares the labels that should be present on the Namespace the resource
/// lives in. At most one NamespaceLabel may exist per namespace; the admission
/// webhook enforces this.
///
/// # Example
///
/// ```yaml
/// apiVersion: labels.octopilot.io/v1alpha1
/// kind: NamespaceLabel
/// metadata:
///   name: team-labels
///   namespace: payments
/// spec:
///   labels:
///     team: payments
///     cost-center: "4411"
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "NamespaceLabel",
    group = "labels.octopilot.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::NamespaceLabelStatus",
    shortname = "nsl",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceLabelSpec {
    /// Labels to set on the namespace
    /// Keys follow the Kubernetes `domain/name` or bare `name` form
    #[serde(default)]
    pub labels: crate::crd::Labels,
}
