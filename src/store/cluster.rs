//! # Cluster Stores
//!
//! `IngressStore` and `SecretStore` backed by the Kubernetes API.

use crate::constants::FIELD_MANAGER;
use crate::ingress::{Ingress, ResourceKey};
use crate::store::{IngressStore, SecretStore};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::Ingress as IngressApi;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client};
use tracing::debug;

#[derive(Clone)]
pub struct KubeIngressStore {
    client: Client,
    namespace: Option<String>,
}

impl std::fmt::Debug for KubeIngressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeIngressStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeIngressStore {
    /// Store scoped to `namespace`, or to all namespaces when `None`
    #[must_use]
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    /// API handle for listing and watching in the configured scope
    #[must_use]
    pub fn api(&self) -> Api<IngressApi> {
        match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl IngressStore for KubeIngressStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<Ingress>> {
        let api: Api<IngressApi> = Api::namespaced(self.client.clone(), &key.namespace);
        let ingress = api
            .get_opt(&key.name)
            .await
            .with_context(|| format!("failed to get ingress {key}"))?;
        Ok(ingress.map(Ingress::new))
    }

    async fn list(&self) -> Result<Vec<Ingress>> {
        let list = self
            .api()
            .list(&ListParams::default())
            .await
            .context("failed to list ingresses")?;
        Ok(list.items.into_iter().map(Ingress::new).collect())
    }
}

#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name)
            .await
            .with_context(|| format!("failed to get secret {key}"))
    }

    async fn apply(&self, secret: &Secret) -> Result<()> {
        let namespace = secret
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| anyhow!("secret has no namespace"))?;
        let name = secret
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| anyhow!("secret has no name"))?;

        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(name, &params, &Patch::Apply(secret))
            .await
            .with_context(|| format!("failed to apply secret {namespace}/{name}"))?;

        debug!("Applied secret {}/{}", namespace, name);
        Ok(())
    }
}
