//! # Runtime
//!
//! Controller process wiring.
//!
//! - `initialization` - logging, metrics, configuration, servers, client
//! - `watch_loop` - the controller stream and its restart loop
//! - `error_policy` - per-resource backoff for failed reconciliations

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
