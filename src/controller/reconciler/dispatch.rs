//! # Provider Dispatch
//!
//! Runs every registered provider through one pass for an ingress:
//! `reset`, then `process` only for the selected provider, then `finalize`.
//! Failures of one provider or phase never stop the others.

use crate::controller::reconciler::types::AggregateError;
use crate::ingress::Ingress;
use crate::observability::metrics;
use crate::provider::ProviderRegistry;
use tracing::{debug, warn};

/// Provider phase, used to tag collected errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Reset,
    Process,
    Finalize,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Reset => "reset",
            Phase::Process => "process",
            Phase::Finalize => "finalize",
        }
    }
}

/// Name of the provider responsible for `ingress`
///
/// The provider annotation wins if it names a registered provider, then the
/// ingress class annotation, then `default_provider`.
#[must_use]
pub fn selected_provider(
    ingress: &Ingress,
    providers: &ProviderRegistry,
    default_provider: &str,
) -> String {
    if let Some(provider) = ingress.provider_annotation() {
        if providers.contains(&provider) {
            return provider;
        }
        debug!(
            "Ingress {} requests unknown provider {}, ignoring annotation",
            ingress.key(),
            provider
        );
    }

    let class = ingress.ingress_class(default_provider);
    if providers.contains(&class) {
        return class;
    }

    default_provider.to_lowercase()
}

/// Drive every provider through one pass, collecting all errors
pub async fn dispatch(
    ingress: &Ingress,
    providers: &ProviderRegistry,
    default_provider: &str,
) -> AggregateError {
    let selected = selected_provider(ingress, providers, default_provider);
    debug!("Ingress {} handled by provider {}", ingress.key(), selected);

    let mut errors = AggregateError::new();
    let mut record = |name: &str, phase: Phase, error: anyhow::Error| {
        warn!(
            "Provider {} failed to {} for ingress {}: {:#}",
            name,
            phase.as_str(),
            ingress.key(),
            error
        );
        metrics::increment_provider_errors(name, phase.as_str());
        errors.push(error.context(format!("provider {name} {}", phase.as_str())));
    };

    for (name, provider) in providers.iter() {
        if let Err(e) = provider.reset().await {
            record(name, Phase::Reset, e);
        }

        if name == selected {
            if let Err(e) = provider.process(ingress).await {
                record(name, Phase::Process, e);
            }
        }

        if let Err(e) = provider.finalize().await {
            record(name, Phase::Finalize, e);
        }
    }

    errors
}
