//! # NamespaceLabel Status
//!
//! Status types for tracking which labels the controller has applied.

use serde::{Deserialize, Serialize};

/// Status of the NamespaceLabel resource
///
/// `active_labels` is written only by the reconciler. It is the record of what
/// was last applied to the namespace and drives both the next diff and the
/// cleanup on deletion.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceLabelStatus {
    /// Labels most recently applied to the namespace
    #[serde(default)]
    pub active_labels: Option<crate::crd::Labels>,
    /// Current lifecycle phase
    #[serde(default)]
    pub phase: Option<Phase>,
    /// Human-readable summary of the last reconciliation
    #[serde(default)]
    pub message: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation of the spec that `active_labels` reflects
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
}

/// Lifecycle phase reported in status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum Phase {
    /// Seen but labels not yet applied
    Pending,
    /// Labels applied, finalizer in place
    Active,
    /// Deletion requested, cleanup in progress
    Deleting,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Active => "Active",
            Phase::Deleting => "Deleting",
        }
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}
