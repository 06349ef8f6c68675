//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::admission::ProtectedDomains;
use std::path::PathBuf;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
/// The configuration is read once at startup and handed to the components that need it.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Label domain suffixes that may not be set through a NamespaceLabel
    pub protected_domains: ProtectedDomains,
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Serve the validating admission webhook
    pub webhook_enabled: bool,
    /// Port for the admission webhook
    pub webhook_port: u16,
    /// PEM certificate served by the webhook
    pub webhook_tls_cert_path: PathBuf,
    /// PEM private key served by the webhook
    pub webhook_tls_key_path: PathBuf,
    /// Requeue interval after a successful reconciliation (seconds)
    pub reconcile_interval_secs: u64,
    /// Minimum per-resource error backoff (seconds)
    pub backoff_min_secs: u64,
    /// Maximum per-resource error backoff (seconds)
    pub backoff_max_secs: u64,
    /// Watch stream restart delay after the stream ends (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map lookup instead of mutating
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use crate::constants::*;
        Self {
            protected_domains: ProtectedDomains::parse(
                lookup(PROTECTED_LABEL_DOMAINS_ENV).as_deref().unwrap_or(""),
            ),
            metrics_port: parsed_or(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            webhook_enabled: bool_or(&lookup, "WEBHOOK_ENABLED", true),
            webhook_port: parsed_or(&lookup, "WEBHOOK_PORT", DEFAULT_WEBHOOK_PORT),
            webhook_tls_cert_path: lookup("WEBHOOK_TLS_CERT_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_WEBHOOK_TLS_CERT_PATH), PathBuf::from),
            webhook_tls_key_path: lookup("WEBHOOK_TLS_KEY_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_WEBHOOK_TLS_KEY_PATH), PathBuf::from),
            reconcile_interval_secs: parsed_or(
                &lookup,
                "RECONCILE_INTERVAL_SECS",
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ),
            backoff_min_secs: parsed_or(&lookup, "BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: parsed_or(&lookup, "BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            watch_restart_delay_secs: parsed_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
        }
    }

    /// Get reconcile interval duration
    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Read a key and parse it, falling back to the default on absence or parse failure
fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a key as boolean or return default
fn bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.trim().to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}
