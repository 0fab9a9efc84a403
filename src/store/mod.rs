//! # Store
//!
//! Read and write access to the cluster objects the controller works on.
//!
//! - `IngressStore`: ingress lookups for the worker and resync
//! - `SecretStore`: secret reads and server-side apply of issued certificates
//! - `cluster`: implementations backed by the Kubernetes API

pub mod cluster;

pub use cluster::{KubeIngressStore, KubeSecretStore};

use crate::ingress::{Ingress, ResourceKey};
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;

#[async_trait]
pub trait IngressStore: Send + Sync {
    /// Current state of an ingress; `None` once it is gone
    async fn get(&self, key: &ResourceKey) -> Result<Option<Ingress>>;

    /// Every ingress visible to the controller
    async fn list(&self) -> Result<Vec<Ingress>>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &ResourceKey) -> Result<Option<Secret>>;

    /// Create or update a secret; the object carries its own namespace and name
    async fn apply(&self, secret: &Secret) -> Result<()>;
}
