//! # Label Diff
//!
//! Computes the minimal change that moves a namespace from the label set the
//! controller last applied (`status.activeLabels`) to the desired label set
//! (`spec.labels`).
//!
//! ```text
//! add    = { (k, v) in desired : k not in active, or active[k] != v }
//! remove = { (k, v) in active  : k not in desired }
//! ```
//!
//! Keys outside `add ∪ remove` are never touched, so labels written by other
//! actors survive every apply.

use crate::crd::Labels;
use serde_json::{Map, Value};

/// Minimal add/remove patch over a label map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDiff {
    /// Keys to set, with their new values
    pub add: Labels,
    /// Keys to delete, with the value that was previously applied
    pub remove: Labels,
}

impl LabelDiff {
    /// Diff desired labels against the previously applied set
    ///
    /// `active` is `None` when the resource has never been reconciled, in which
    /// case every desired label is added and nothing is removed.
    #[must_use]
    pub fn compute(desired: &Labels, active: Option<&Labels>) -> Self {
        let Some(active) = active else {
            return Self {
                add: desired.clone(),
                remove: Labels::new(),
            };
        };

        let add = desired
            .iter()
            .filter(|(key, value)| active.get(*key) != Some(*value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let remove = active
            .iter()
            .filter(|(key, _)| !desired.contains_key(*key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self { add, remove }
    }

    /// Diff that removes every previously applied label (deletion cleanup)
    #[must_use]
    pub fn cleanup(active: Option<&Labels>) -> Self {
        Self {
            add: Labels::new(),
            remove: active.cloned().unwrap_or_default(),
        }
    }

    /// Also re-set desired keys whose live value has drifted
    ///
    /// Another actor may have changed or dropped a label the controller owns,
    /// or an earlier pass may have written the namespace without recording
    /// status. Only desired keys are considered.
    #[must_use]
    pub fn with_drift(mut self, desired: &Labels, live: Option<&Labels>) -> Self {
        for (key, value) in desired {
            let live_value = live.and_then(|labels| labels.get(key));
            if live_value != Some(value) {
                self.add.insert(key.clone(), value.clone());
            }
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Apply the diff in place, allocating the label map if needed
    pub fn apply_to(&self, labels: &mut Option<Labels>) {
        if self.is_empty() {
            return;
        }
        let labels = labels.get_or_insert_with(Labels::new);
        for key in self.remove.keys() {
            labels.remove(key);
        }
        for (key, value) in &self.add {
            labels.insert(key.clone(), value.clone());
        }
    }

    /// JSON merge patch body for `metadata.labels`
    ///
    /// Removed keys are sent as `null`; keys not in the diff are omitted and
    /// therefore left untouched by the API server.
    #[must_use]
    pub fn to_merge_patch(&self) -> Value {
        let mut patch = Map::new();
        for key in self.remove.keys() {
            patch.insert(key.clone(), Value::Null);
        }
        for (key, value) in &self.add {
            patch.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(patch)
    }

    /// Short description used in logs, errors and status messages
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no changes".to_string();
        }
        let added: Vec<String> = self.add.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let removed: Vec<&str> = self.remove.keys().map(String::as_str).collect();
        format!("add [{}] remove [{}]", added.join(", "), removed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_first_reconcile_adds_everything() {
        let desired = labels(&[("a", "1")]);
        let diff = LabelDiff::compute(&desired, None);
        assert_eq!(diff.add, labels(&[("a", "1")]));
        assert!(diff.remove.is_empty());

        let mut target = None;
        diff.apply_to(&mut target);
        assert_eq!(target, Some(labels(&[("a", "1")])));
    }

    #[test]
    fn test_add_and_remove_sets() {
        let desired = labels(&[("a", "1"), ("b", "2")]);
        let active = labels(&[("a", "1"), ("c", "3")]);
        let diff = LabelDiff::compute(&desired, Some(&active));
        assert_eq!(diff.add, labels(&[("b", "2")]));
        assert_eq!(diff.remove, labels(&[("c", "3")]));
    }

    #[test]
    fn test_changed_value_is_re_added() {
        let desired = labels(&[("a", "2")]);
        let active = labels(&[("a", "1")]);
        let diff = LabelDiff::compute(&desired, Some(&active));
        assert_eq!(diff.add, labels(&[("a", "2")]));
        assert!(diff.remove.is_empty());
    }

    #[test]
    fn test_second_pass_is_empty() {
        let desired = labels(&[("a", "1"), ("b", "2")]);
        let active = labels(&[("a", "1"), ("c", "3")]);
        let first = LabelDiff::compute(&desired, Some(&active));
        assert!(!first.is_empty());

        let second = LabelDiff::compute(&desired, Some(&desired));
        assert!(second.is_empty());
    }

    #[test]
    fn test_minimality_over_mixed_inputs() {
        let cases = [
            (labels(&[]), labels(&[])),
            (labels(&[("a", "1")]), labels(&[("a", "1")])),
            (labels(&[("a", "1"), ("b", "2")]), labels(&[("b", "3"), ("c", "4")])),
            (labels(&[]), labels(&[("x", "1"), ("y", "2")])),
        ];
        for (desired, active) in cases {
            let diff = LabelDiff::compute(&desired, Some(&active));
            for (key, value) in &diff.add {
                assert_ne!(active.get(key), Some(value), "{key} already correct");
            }
            for key in diff.remove.keys() {
                assert!(!desired.contains_key(key), "{key} is still desired");
            }
        }
    }

    #[test]
    fn test_apply_leaves_foreign_keys_alone() {
        let desired = labels(&[("a", "1"), ("b", "2")]);
        let active = labels(&[("a", "1"), ("c", "3")]);
        let mut target = Some(labels(&[("a", "1"), ("c", "3"), ("owner", "ops")]));

        LabelDiff::compute(&desired, Some(&active)).apply_to(&mut target);

        assert_eq!(
            target,
            Some(labels(&[("a", "1"), ("b", "2"), ("owner", "ops")]))
        );
    }

    #[test]
    fn test_removing_absent_key_is_a_no_op() {
        let mut target = Some(labels(&[("z", "9")]));
        LabelDiff::cleanup(Some(&labels(&[("a", "1")]))).apply_to(&mut target);
        assert_eq!(target, Some(labels(&[("z", "9")])));
    }

    #[test]
    fn test_drift_restores_only_desired_keys() {
        let desired = labels(&[("a", "1"), ("b", "2")]);
        let live = labels(&[("a", "changed"), ("b", "2"), ("other", "x")]);
        let diff = LabelDiff::compute(&desired, Some(&desired)).with_drift(&desired, Some(&live));
        assert_eq!(diff.add, labels(&[("a", "1")]));
        assert!(diff.remove.is_empty());
    }

    #[test]
    fn test_merge_patch_nulls_removed_keys() {
        let diff = LabelDiff {
            add: labels(&[("b", "2")]),
            remove: labels(&[("c", "3")]),
        };
        assert_eq!(diff.to_merge_patch(), json!({"b": "2", "c": null}));
        assert_eq!(diff.summary(), "add [b=2] remove [c]");
    }
}
