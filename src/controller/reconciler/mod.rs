//! # Reconciler
//!
//! Reconciliation of a single ingress.
//!
//! - `reconcile`: the orchestrator (`Reconciler`)
//! - `dispatch`: provider selection and lifecycle
//! - `dedup`: dropping TLS entries that share a secret
//! - `types`: error types

pub mod dedup;
pub mod dispatch;
pub mod reconcile;
pub mod types;

pub use reconcile::Reconciler;
pub use types::{AggregateError, ReconcilerError};
