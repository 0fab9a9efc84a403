//! # Reconcile
//!
//! One pass over one ingress:
//!
//! 1. Skip ignored ingresses
//! 2. Drive the providers (errors collected)
//! 3. Extract and deduplicate TLS declarations
//! 4. Check and renew each declaration's certificate (errors collected)
//! 5. Return every collected error as one aggregate

use crate::config::{ControllerConfig, SharedControllerConfig};
use crate::controller::reconciler::dedup::dedup;
use crate::controller::reconciler::dispatch::dispatch;
use crate::controller::reconciler::types::ReconcilerError;
use crate::ingress::tls::TlsOutcome;
use crate::ingress::{CertificatePolicy, Ingress};
use crate::issuer::{CertificateIssuer, RetryPolicy};
use crate::observability::metrics;
use crate::provider::ProviderRegistry;
use crate::store::SecretStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

/// Reconciles ingresses against providers, secrets and the issuer
#[derive(Clone)]
pub struct Reconciler {
    providers: ProviderRegistry,
    secrets: Arc<dyn SecretStore>,
    issuer: Arc<dyn CertificateIssuer>,
    config: SharedControllerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        providers: ProviderRegistry,
        secrets: Arc<dyn SecretStore>,
        issuer: Arc<dyn CertificateIssuer>,
        config: SharedControllerConfig,
    ) -> Self {
        Self {
            providers,
            secrets,
            issuer,
            config,
        }
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Reconcile one ingress
    pub async fn reconcile(&self, ingress: &Ingress) -> Result<(), ReconcilerError> {
        let span = info_span!(
            "ingress.reconcile",
            resource.namespace = ingress.namespace(),
            resource.name = ingress.name()
        );
        async move {
            let start = Instant::now();
            let result = self.reconcile_inner(ingress).await;
            metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
            result
        }
        .instrument(span)
        .await
    }

    async fn reconcile_inner(&self, ingress: &Ingress) -> Result<(), ReconcilerError> {
        let config: &ControllerConfig = &self.config;

        if let Some(reason) = ingress.ignore_reason(config) {
            debug!("Ignoring ingress {}: {}", ingress.key(), reason);
            return Ok(());
        }

        metrics::increment_reconciliations();
        info!("Reconciling ingress {}", ingress.key());

        let mut errors = dispatch(ingress, &self.providers, &config.default_ingress_provider).await;

        let policy = CertificatePolicy {
            minimum_validity: config.minimum_validity(),
            rsa_key_size: config.rsa_key_size(),
            retry: RetryPolicy::from_config(config),
        };

        let mut issued = 0usize;
        for tls in dedup(ingress.tls()) {
            match tls
                .process(self.secrets.as_ref(), self.issuer.as_ref(), &policy)
                .await
            {
                Ok(TlsOutcome::Issued) => issued += 1,
                Ok(TlsOutcome::Valid) => {}
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            info!(
                "Reconciled ingress {} ({} certificate(s) issued)",
                ingress.key(),
                issued
            );
            return Ok(());
        }

        metrics::increment_reconciliation_errors();
        error!(
            "Error while processing ingress {}: {}",
            ingress.key(),
            errors
        );
        Err(ReconcilerError::Aggregate(errors))
    }
}
