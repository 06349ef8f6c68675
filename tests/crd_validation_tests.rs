//! # CRD Validation Tests
//!
//! Sample resources deserialize into the CRD types and the generated
//! CustomResourceDefinition carries the expected names and subresources.

use kube::core::CustomResourceExt;
use namespace_label_controller::crd::{NamespaceLabel, Phase};

#[test]
fn test_minimal_namespace_label() {
    let yaml = r#"
apiVersion: labels.octopilot.io/v1alpha1
kind: NamespaceLabel
metadata:
  name: team-labels
  namespace: payments
spec:
  labels:
    team: payments
    example.com/cost-center: "4411"
"#;

    let obj: NamespaceLabel =
        serde_yaml::from_str(yaml).expect("Failed to deserialize NamespaceLabel");
    assert_eq!(obj.metadata.namespace.as_deref(), Some("payments"));
    assert_eq!(obj.spec.labels.len(), 2);
    assert_eq!(
        obj.spec.labels.get("example.com/cost-center").map(String::as_str),
        Some("4411")
    );
    assert!(obj.status.is_none());
}

#[test]
fn test_missing_labels_default_to_empty() {
    let yaml = r"
apiVersion: labels.octopilot.io/v1alpha1
kind: NamespaceLabel
metadata:
  name: empty
  namespace: payments
spec: {}
";

    let obj: NamespaceLabel =
        serde_yaml::from_str(yaml).expect("Failed to deserialize NamespaceLabel");
    assert!(obj.spec.labels.is_empty());
}

#[test]
fn test_status_round_trips_camel_case() {
    let yaml = r#"
apiVersion: labels.octopilot.io/v1alpha1
kind: NamespaceLabel
metadata:
  name: team-labels
  namespace: payments
  generation: 2
spec:
  labels:
    team: payments
status:
  activeLabels:
    team: payments
  phase: Active
  observedGeneration: 2
  lastReconcileTime: "2024-01-01T00:00:00Z"
  conditions:
    - type: Ready
      status: "True"
      reason: LabelsApplied
"#;

    let obj: NamespaceLabel =
        serde_yaml::from_str(yaml).expect("Failed to deserialize NamespaceLabel");
    let status = obj.status.expect("status should be present");
    assert_eq!(status.phase, Some(Phase::Active));
    assert_eq!(status.observed_generation, Some(2));
    assert_eq!(status.conditions[0].r#type, "Ready");
    assert_eq!(
        status.active_labels.as_ref().and_then(|l| l.get("team")).map(String::as_str),
        Some("payments")
    );

    let json = serde_json::to_value(&status).unwrap();
    assert!(json.get("activeLabels").is_some());
    assert!(json.get("observedGeneration").is_some());
}

#[test]
fn test_generated_crd() {
    let crd = NamespaceLabel::crd();

    assert_eq!(crd.spec.group, "labels.octopilot.io");
    assert_eq!(crd.spec.names.kind, "NamespaceLabel");
    assert_eq!(crd.spec.names.plural, "namespacelabels");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(crd.spec.names.short_names, Some(vec!["nsl".to_string()]));

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(version
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());

    let yaml = serde_yaml::to_string(&crd).unwrap();
    assert!(yaml.contains("activeLabels"));
}
