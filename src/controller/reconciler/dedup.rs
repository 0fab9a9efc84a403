//! # TLS Deduplication
//!
//! Two TLS entries of one ingress that target the same secret would fight
//! over its contents. Every entry of such a group is dropped with a warning.

use crate::ingress::{ResourceKey, TlsDeclaration};
use crate::observability::metrics;
use std::collections::HashMap;
use tracing::warn;

/// Drop every declaration whose secret is referenced more than once
///
/// Surviving declarations keep their input order.
#[must_use]
pub fn dedup(declarations: Vec<TlsDeclaration>) -> Vec<TlsDeclaration> {
    let mut references: HashMap<ResourceKey, usize> = HashMap::new();
    for tls in &declarations {
        *references.entry(tls.secret_key()).or_default() += 1;
    }

    let (unique, shared): (Vec<_>, Vec<_>) = declarations
        .into_iter()
        .partition(|tls| references[&tls.secret_key()] == 1);

    if !shared.is_empty() {
        let mut groups: Vec<(ResourceKey, Vec<&TlsDeclaration>)> = Vec::new();
        for tls in &shared {
            let secret = tls.secret_key();
            match groups.iter_mut().find(|(key, _)| *key == secret) {
                Some((_, members)) => members.push(tls),
                None => groups.push((secret, vec![tls])),
            }
        }

        for (secret, members) in &groups {
            let elements: Vec<String> = members
                .iter()
                .map(|tls| {
                    format!(
                        "ingress {} (hosts: {})",
                        tls.ingress(),
                        tls.hosts().join(", ")
                    )
                })
                .collect();
            warn!(
                "the secret {} is used multiple times. These linked TLS ingress elements were ignored: {}",
                secret,
                elements.join(", ")
            );
        }
        metrics::increment_secret_conflicts(shared.len() as u64);
    }

    unique
}
