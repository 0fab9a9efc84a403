//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ## Usage
//!
//! ```rust
//! use ingress_tls_controller::prelude::*;
//! ```

// Domain types
pub use crate::ingress::{
    needs_new_certificate, CertificateInfo, Ingress, ResourceKey, Secret, TlsDeclaration,
};

// Collaborator traits - needed for plugging in stores, issuers and providers
pub use crate::issuer::{CertificateIssuer, IssuanceRequest, IssuedCertificate};
pub use crate::provider::{IngressProvider, ProviderRegistry};
pub use crate::store::{IngressStore, SecretStore};

// Reconciler types - core controller functionality
pub use crate::controller::events::{IngressEvent, QueueAction};
pub use crate::controller::queue::WorkQueue;
pub use crate::controller::reconciler::{AggregateError, Reconciler, ReconcilerError};
pub use crate::runtime::ControllerContext;

// Config types
pub use crate::config::{ConfigError, ControllerConfig, SharedControllerConfig};
