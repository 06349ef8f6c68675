//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable (see [`crate::config::ControllerConfig`]).

/// Finalizer token placed on every NamespaceLabel the controller has reconciled
pub const FINALIZER: &str = "labels.octopilot.io/finalizer";

/// Field manager name used for patches issued by the controller
pub const FIELD_MANAGER: &str = "namespace-label-controller";

/// Environment variable holding the comma-separated protected label domains
pub const PROTECTED_LABEL_DOMAINS_ENV: &str = "PROTECTED_LABEL_DOMAINS";

/// Path the API server posts AdmissionReview requests to
pub const WEBHOOK_PATH: &str = "/validate-namespacelabel";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTPS port for the validating admission webhook
pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;

/// Default serving certificate location (controller-runtime convention)
pub const DEFAULT_WEBHOOK_TLS_CERT_PATH: &str = "/tmp/k8s-webhook-server/serving-certs/tls.crt";

/// Default serving key location (controller-runtime convention)
pub const DEFAULT_WEBHOOK_TLS_KEY_PATH: &str = "/tmp/k8s-webhook-server/serving-certs/tls.key";

/// Default requeue interval after a successful reconciliation (seconds)
/// Periodic passes repair label drift introduced by other actors
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

/// Default minimum error backoff (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum error backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "namespace_label_controller=info";
