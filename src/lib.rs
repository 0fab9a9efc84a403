//! Ingress TLS Controller Library
//!
//! Provisions and renews TLS certificates for the hostnames declared on
//! Kubernetes Ingress resources.
//!
//! ## Quick Start
//!
//! ```rust
//! use ingress_tls_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod ingress;
pub mod issuer;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod store;
