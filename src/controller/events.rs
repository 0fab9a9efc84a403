//! # Event Filter
//!
//! Turns ingress watch notifications into queue actions.
//!
//! - Added: enqueue immediately unless ignored
//! - Deleted: forget the key's backoff unless ignored
//! - Updated: enqueue immediately when the spec or a tracked annotation
//!   changed and the new object is not ignored

use crate::config::ControllerConfig;
use crate::constants::TRACKED_ANNOTATIONS;
use crate::controller::queue::WorkQueue;
use crate::ingress::{Ingress, ResourceKey};
use std::collections::BTreeMap;
use tracing::debug;

/// A change observed on an ingress
#[derive(Debug, Clone)]
pub enum IngressEvent {
    Added(Ingress),
    Deleted(Ingress),
    Updated { old: Ingress, new: Ingress },
}

impl IngressEvent {
    /// Key of the ingress the event is about
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        match self {
            IngressEvent::Added(ingress) | IngressEvent::Deleted(ingress) => ingress.key(),
            IngressEvent::Updated { new, .. } => new.key(),
        }
    }
}

/// What the queue should do with an event's key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueAction {
    /// Add the key without rate limiting
    Enqueue(ResourceKey),
    /// Drop the key's backoff bookkeeping
    Forget(ResourceKey),
    Skip,
}

/// Whether any tracked annotation differs between two annotation maps
///
/// A missing map differs from any present map, even an empty one. Two
/// missing maps are equal.
#[must_use]
pub fn tracked_annotations_changed(
    old: Option<&BTreeMap<String, String>>,
    new: Option<&BTreeMap<String, String>>,
) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(_), None) | (None, Some(_)) => true,
        (Some(old), Some(new)) => TRACKED_ANNOTATIONS
            .iter()
            .any(|key| old.get(*key) != new.get(*key)),
    }
}

/// Decide what an event means for the queue
#[must_use]
pub fn filter_event(event: &IngressEvent, config: &ControllerConfig) -> QueueAction {
    match event {
        IngressEvent::Added(ingress) => {
            if ingress.ignore(config) {
                QueueAction::Skip
            } else {
                QueueAction::Enqueue(ingress.key())
            }
        }
        IngressEvent::Deleted(ingress) => {
            // The deleted object no longer exists; judge it on its annotations
            let last_state = Ingress::new(ingress.api().clone());
            if last_state.ignore(config) {
                QueueAction::Skip
            } else {
                QueueAction::Forget(ingress.key())
            }
        }
        IngressEvent::Updated { old, new } => {
            let spec_changed = old.spec() != new.spec();
            let annotations_changed =
                tracked_annotations_changed(old.annotations(), new.annotations());
            if (spec_changed || annotations_changed) && !new.ignore(config) {
                QueueAction::Enqueue(new.key())
            } else {
                QueueAction::Skip
            }
        }
    }
}

/// Filter `event` and apply the resulting action to `queue`
pub fn apply_event(
    queue: &WorkQueue<ResourceKey>,
    event: &IngressEvent,
    config: &ControllerConfig,
) -> QueueAction {
    let action = filter_event(event, config);
    match &action {
        QueueAction::Enqueue(key) => {
            debug!("Queueing ingress {}", key);
            queue.add(key.clone());
        }
        QueueAction::Forget(key) => {
            debug!("Ingress {} deleted, forgetting", key);
            queue.forget(key);
        }
        QueueAction::Skip => {}
    }
    action
}
