//! Namespace Label Controller Library
//!
//! Keeps the labels declared by a `NamespaceLabel` resource synchronized onto
//! the Namespace that contains it, and validates `NamespaceLabel` requests at
//! admission time.
//!
//! ## Quick Start
//!
//! ```rust
//! use namespace_label_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod admission;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
pub mod server;
pub mod store;
