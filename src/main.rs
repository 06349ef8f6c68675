//! # Namespace Label Controller
//!
//! A Kubernetes controller that keeps the labels declared by a `NamespaceLabel`
//! resource applied to its Namespace.
//!
//! ## Overview
//!
//! 1. **Label sync** - desired labels are added to the Namespace, labels dropped
//!    from the spec are removed, and labels owned by others are left alone
//! 2. **Cleanup** - a finalizer guarantees managed labels are removed before the
//!    `NamespaceLabel` disappears
//! 3. **Admission** - a validating webhook allows one `NamespaceLabel` per
//!    namespace and rejects keys in protected label domains
//!
//! Metrics and probes are served on `METRICS_PORT`, the webhook on `WEBHOOK_PORT`.

use anyhow::Result;
use namespace_label_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    let restart_delay = init.config.watch_restart_delay();

    run_watch_loop(init.client, init.reconciler, init.server_state, restart_delay).await
}
