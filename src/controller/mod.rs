//! # Controller
//!
//! Reconciliation logic for NamespaceLabel resources.

pub mod backoff;
pub mod reconciler;
