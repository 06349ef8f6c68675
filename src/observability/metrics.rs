//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `namespace_label_reconciliations_total` - Total number of reconciliations
//! - `namespace_label_reconciliation_errors_total` - Total number of reconciliation errors
//! - `namespace_label_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `namespace_label_mutations_total{operation}` - Namespace label keys added or removed
//! - `namespace_label_admission_decisions_total{operation,allowed}` - Admission outcomes
//! - `namespace_label_requeues_total{reason}` - Requeues scheduled by the controller

use crate::controller::reconciler::LabelDiff;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "namespace_label_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "namespace_label_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "namespace_label_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static LABEL_MUTATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "namespace_label_mutations_total",
            "Total number of namespace label keys written by the controller",
        ),
        &["operation"],
    )
    .expect("Failed to create LABEL_MUTATIONS_TOTAL metric - this should never happen")
});

static ADMISSION_DECISIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "namespace_label_admission_decisions_total",
            "Total number of admission decisions by operation and outcome",
        ),
        &["operation", "allowed"],
    )
    .expect("Failed to create ADMISSION_DECISIONS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "namespace_label_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register all metrics with the global registry
///
/// # Errors
///
/// Fails if called twice (metrics are already registered).
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(LABEL_MUTATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ADMISSION_DECISIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

/// Number of passes recorded in the duration histogram
#[must_use]
pub fn reconciliation_duration_samples() -> u64 {
    RECONCILIATION_DURATION.get_sample_count()
}

/// Count the keys a successfully applied diff added and removed
pub fn record_label_changes(diff: &LabelDiff) {
    LABEL_MUTATIONS_TOTAL
        .with_label_values(&["add"])
        .inc_by(diff.add.len() as u64);
    LABEL_MUTATIONS_TOTAL
        .with_label_values(&["remove"])
        .inc_by(diff.remove.len() as u64);
}

pub fn record_admission_decision(operation: &str, allowed: bool) {
    let allowed = if allowed { "true" } else { "false" };
    ADMISSION_DECISIONS_TOTAL
        .with_label_values(&[operation, allowed])
        .inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::Labels;

    #[test]
    fn test_register_metrics() {
        assert!(matches!(register_metrics(), Ok(())));
        increment_reconciliations();
        assert!(!REGISTRY.gather().is_empty());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        assert_eq!(RECONCILIATIONS_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL.get();
        increment_reconciliation_errors();
        assert_eq!(RECONCILIATION_ERRORS_TOTAL.get(), before + 1u64);
    }

    #[test]
    fn test_record_label_changes() {
        let desired: Labels = [("a".to_string(), "1".to_string())].into_iter().collect();
        let active: Labels = [("b".to_string(), "2".to_string())].into_iter().collect();
        let diff = LabelDiff::compute(&desired, Some(&active));

        let added = LABEL_MUTATIONS_TOTAL.with_label_values(&["add"]).get();
        let removed = LABEL_MUTATIONS_TOTAL.with_label_values(&["remove"]).get();
        record_label_changes(&diff);
        assert_eq!(LABEL_MUTATIONS_TOTAL.with_label_values(&["add"]).get(), added + 1);
        assert_eq!(LABEL_MUTATIONS_TOTAL.with_label_values(&["remove"]).get(), removed + 1);
    }

    #[test]
    fn test_record_admission_decision() {
        let before = ADMISSION_DECISIONS_TOTAL
            .with_label_values(&["connect", "false"])
            .get();
        record_admission_decision("connect", false);
        assert_eq!(
            ADMISSION_DECISIONS_TOTAL
                .with_label_values(&["connect", "false"])
                .get(),
            before + 1
        );
    }
}
