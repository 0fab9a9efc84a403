//! # Host Recording Provider
//!
//! Provider that tracks which hosts must be reachable through its routing
//! layer. Hosts collected during a pass are published on `finalize` and
//! can be read back with `published()`.

use crate::ingress::{Ingress, ResourceKey};
use crate::provider::IngressProvider;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

type HostMap = BTreeMap<ResourceKey, Vec<String>>;

#[derive(Debug, Default)]
struct RecordingState {
    pending: HostMap,
    published: HostMap,
}

#[derive(Debug)]
pub struct HostRecordingProvider {
    name: String,
    state: Mutex<RecordingState>,
}

impl HostRecordingProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            state: Mutex::new(RecordingState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hosts published by the last finalized pass, per ingress
    #[must_use]
    pub fn published(&self) -> HostMap {
        self.state().published.clone()
    }
}

#[async_trait]
impl IngressProvider for HostRecordingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reset(&self) -> Result<()> {
        self.state().pending.clear();
        Ok(())
    }

    async fn process(&self, ingress: &Ingress) -> Result<()> {
        let hosts: Vec<String> = ingress
            .tls()
            .iter()
            .flat_map(|tls| tls.hosts().iter().cloned())
            .collect();
        debug!(
            "Provider {}: ingress {} routes hosts [{}] (ssl redirect: {}, source ranges: [{}])",
            self.name,
            ingress.key(),
            hosts.join(", "),
            ingress.ssl_redirect(),
            ingress.whitelist_source_ranges().join(", ")
        );
        self.state().pending.insert(ingress.key(), hosts);
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        let mut state = self.state();
        let pending = std::mem::take(&mut state.pending);
        for (key, hosts) in &pending {
            info!(
                "Provider {}: publishing hosts [{}] for ingress {}",
                self.name,
                hosts.join(", "),
                key
            );
        }
        state.published = pending;
        Ok(())
    }
}
