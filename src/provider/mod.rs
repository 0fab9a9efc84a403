//! # Provider Modules
//!
//! Routing-layer providers that make an ingress reachable for certificate
//! validation (for example by publishing challenge paths).
//!
//! Every reconcile pass drives each registered provider through
//! `reset`, then `process` if the provider was selected for the ingress,
//! then `finalize`.

use crate::ingress::Ingress;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod recording;

pub use recording::HostRecordingProvider;

/// Provider trait for ingress routing layers
#[async_trait]
pub trait IngressProvider: Send + Sync {
    /// Registry name, matched against class and provider annotations
    fn name(&self) -> &str;

    /// Discard state accumulated for the previous pass
    async fn reset(&self) -> Result<()>;

    /// Take on the ingress being reconciled
    async fn process(&self, ingress: &Ingress) -> Result<()>;

    /// Publish whatever was accumulated during this pass
    async fn finalize(&self) -> Result<()>;
}

/// Registered providers, iterated in name order
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn IngressProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider under its lower-cased name; names must be unique
    pub fn register(&mut self, provider: Arc<dyn IngressProvider>) -> Result<()> {
        let name = provider.name().to_lowercase();
        if self.providers.contains_key(&name) {
            bail!("provider {name} is already registered");
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn IngressProvider>)> {
        self.providers
            .iter()
            .map(|(name, provider)| (name.as_str(), provider))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_rejects_duplicates_case_insensitively() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(HostRecordingProvider::new("nginx")))
            .unwrap();
        assert!(registry
            .register(Arc::new(HostRecordingProvider::new("NGINX")))
            .is_err());
        assert!(registry.contains("Nginx"));
    }

    #[test]
    fn test_registry_iterates_in_name_order() {
        let mut registry = ProviderRegistry::new();
        for name in ["nginx", "gce", "haproxy"] {
            registry
                .register(Arc::new(HostRecordingProvider::new(name)))
                .unwrap();
        }
        assert_eq!(registry.names().collect::<Vec<_>>(), ["gce", "haproxy", "nginx"]);
    }
}
