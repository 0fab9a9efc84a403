//! # Watch
//!
//! Ingress informer: watches the cluster, keeps the last seen state of
//! every ingress and turns watcher events into `IngressEvent`s carrying
//! old and new objects. A single ordered channel feeds the event filter.

use crate::constants::DEFAULT_WATCH_RESTART_DELAY_SECS;
use crate::controller::events::{apply_event, IngressEvent};
use crate::controller::server::ServerState;
use crate::ingress::{Ingress, ResourceKey};
use crate::runtime::ControllerContext;
use futures::StreamExt;
use k8s_openapi::api::networking::v1::Ingress as IngressApi;
use kube::Api;
use kube_runtime::watcher::{self, Event};
use kube_runtime::WatchStreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Last observed state of every ingress
#[derive(Debug, Default)]
pub struct IngressCache {
    objects: HashMap<ResourceKey, IngressApi>,
    /// Keys seen since the current relist started
    relisting: Option<HashSet<ResourceKey>>,
}

impl IngressCache {
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Fold a watcher event into the cache, returning the resulting changes
    pub fn apply(&mut self, event: Event<IngressApi>) -> Vec<IngressEvent> {
        match event {
            Event::Init => {
                self.relisting = Some(HashSet::new());
                Vec::new()
            }
            Event::InitApply(api) => {
                let key = Ingress::new(api.clone()).key();
                if let Some(seen) = self.relisting.as_mut() {
                    seen.insert(key);
                }
                vec![self.upsert(api)]
            }
            Event::InitDone => {
                let seen = self.relisting.take().unwrap_or_default();
                let gone: Vec<ResourceKey> = self
                    .objects
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect();
                gone.into_iter()
                    .filter_map(|key| self.objects.remove(&key))
                    .map(|api| IngressEvent::Deleted(Ingress::deleted(api)))
                    .collect()
            }
            Event::Apply(api) => vec![self.upsert(api)],
            Event::Delete(api) => {
                let key = Ingress::new(api.clone()).key();
                let last = self.objects.remove(&key).unwrap_or(api);
                vec![IngressEvent::Deleted(Ingress::deleted(last))]
            }
        }
    }

    fn upsert(&mut self, api: IngressApi) -> IngressEvent {
        let new = Ingress::new(api.clone());
        match self.objects.insert(new.key(), api) {
            Some(old) => IngressEvent::Updated {
                old: Ingress::new(old),
                new,
            },
            None => IngressEvent::Added(new),
        }
    }
}

/// Watch ingresses and forward changes until shutdown
///
/// The server is marked ready once the first full listing has been
/// delivered.
pub async fn run_ingress_watch(
    api: Api<IngressApi>,
    events: mpsc::Sender<IngressEvent>,
    server_state: Arc<ServerState>,
    shutdown: CancellationToken,
) {
    let mut cache = IngressCache::default();

    loop {
        info!("Starting ingress watch");
        let mut stream = watcher::watcher(api.clone(), watcher::Config::default())
            .default_backoff()
            .boxed();

        loop {
            let next = tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("Ingress watch stopped");
                    return;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    let synced = matches!(event, Event::InitDone);
                    for change in cache.apply(event) {
                        if events.send(change).await.is_err() {
                            debug!("Event channel closed, stopping ingress watch");
                            return;
                        }
                    }
                    if synced {
                        info!("Ingress cache synced ({} ingress(es))", cache.len());
                        server_state.set_ready(true);
                    }
                }
                Some(Err(e)) => warn!("Ingress watch error: {}", e),
                None => break,
            }
        }

        warn!(
            "Ingress watch stream ended, restarting in {} seconds...",
            DEFAULT_WATCH_RESTART_DELAY_SECS
        );
        tokio::select! {
            () = shutdown.cancelled() => return,
            () = tokio::time::sleep(Duration::from_secs(DEFAULT_WATCH_RESTART_DELAY_SECS)) => {}
        }
    }
}

/// Apply incoming events to the queue in arrival order
pub async fn run_event_filter(ctx: Arc<ControllerContext>, mut events: mpsc::Receiver<IngressEvent>) {
    let shutdown = ctx.shutdown_token();
    loop {
        let event = tokio::select! {
            () = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let action = apply_event(&ctx.queue, &event, &ctx.config);
        debug!("Event for {} resolved to {:?}", event.key(), action);
    }
    debug!("Event filter stopped");
}
