//! # TLS
//!
//! A TLS declaration pairs the hosts of one ingress TLS entry with the
//! Secret that must hold a certificate for them.
//!
//! `needs_new_certificate` is the renewal decision. It is pure so that it
//! can be driven with a fixed clock.

use crate::ingress::{ResourceKey, Secret};
use crate::issuer::{issue_with_retry, CertificateIssuer, IssuanceRequest, RetryPolicy};
use crate::observability::metrics;
use crate::store::SecretStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Settings applied when checking and issuing certificates
#[derive(Debug, Clone, PartialEq)]
pub struct CertificatePolicy {
    pub minimum_validity: Duration,
    pub rsa_key_size: u32,
    pub retry: RetryPolicy,
}

/// Result of processing one TLS declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsOutcome {
    /// The stored certificate is still good
    Valid,
    /// A new certificate was issued and stored
    Issued,
}

/// One `spec.tls` entry of an ingress
#[derive(Debug)]
pub struct TlsDeclaration {
    ingress: ResourceKey,
    hosts: Vec<String>,
    secret_name: String,
    secret: OnceCell<Secret>,
}

impl TlsDeclaration {
    pub fn new(ingress: ResourceKey, hosts: Vec<String>, secret_name: impl Into<String>) -> Self {
        Self {
            ingress,
            hosts,
            secret_name: secret_name.into(),
            secret: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn ingress(&self) -> &ResourceKey {
        &self.ingress
    }

    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    #[must_use]
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Secrets live in the namespace of the ingress that references them
    #[must_use]
    pub fn secret_key(&self) -> ResourceKey {
        ResourceKey::new(self.ingress.namespace.clone(), self.secret_name.clone())
    }

    /// The referenced secret, fetched on first use and cached afterwards
    pub async fn secret(&self, store: &dyn SecretStore) -> Result<&Secret> {
        self.secret
            .get_or_try_init(|| async {
                let key = self.secret_key();
                let api = store
                    .get(&key)
                    .await
                    .with_context(|| format!("failed to read secret {key}"))?;
                Ok::<_, anyhow::Error>(Secret::new(key, api))
            })
            .await
    }

    /// Check the stored certificate and issue a new one when required
    pub async fn process(
        &self,
        secrets: &dyn SecretStore,
        issuer: &dyn CertificateIssuer,
        policy: &CertificatePolicy,
    ) -> Result<TlsOutcome> {
        let secret = self.secret(secrets).await?;
        if !needs_new_certificate(&self.hosts, secret, Utc::now(), policy.minimum_validity) {
            return Ok(TlsOutcome::Valid);
        }

        let request = IssuanceRequest {
            hosts: self.hosts.clone(),
            rsa_key_size: policy.rsa_key_size,
        };
        let issued = issue_with_retry(issuer, &request, &policy.retry)
            .await
            .inspect_err(|_| metrics::increment_issuance_errors())
            .with_context(|| {
                format!(
                    "failed to obtain certificate for {} (hosts: {})",
                    self.secret_key(),
                    self.hosts.join(", ")
                )
            })?;

        secrets
            .apply(&secret.desired(&issued))
            .await
            .with_context(|| format!("failed to store certificate in secret {}", secret.key()))?;

        metrics::increment_certificates_issued();
        info!(
            "Stored new certificate for hosts [{}] in secret {}",
            self.hosts.join(", "),
            secret.key()
        );
        Ok(TlsOutcome::Issued)
    }
}

/// Whether `secret` must receive a new certificate for `hosts`
///
/// True when the secret is missing, its certificate cannot be read, the
/// certificate does not name every host, it has expired, or less than
/// `minimum_validity` of its lifetime remains at `now`.
#[must_use]
pub fn needs_new_certificate(
    hosts: &[String],
    secret: &Secret,
    now: DateTime<Utc>,
    minimum_validity: Duration,
) -> bool {
    if !secret.exists() {
        info!("Secret {} does not exist, requesting certificate", secret.key());
        return true;
    }

    let certificate = match secret.certificate() {
        Ok(certificate) => certificate,
        Err(e) => {
            info!(
                "Cannot read certificate in secret {}, requesting a new one: {}",
                secret.key(),
                e
            );
            return true;
        }
    };

    if !certificate.covers(hosts) {
        info!(
            "Certificate in secret {} does not cover all hosts [{}], requesting a new one",
            secret.key(),
            hosts.join(", ")
        );
        return true;
    }

    if certificate.not_after <= now {
        info!(
            "Certificate in secret {} expired at {}, requesting a new one",
            secret.key(),
            certificate.not_after
        );
        return true;
    }

    let remaining = (certificate.not_after - now).to_std().unwrap_or_default();
    if remaining < minimum_validity {
        info!(
            "Certificate in secret {} expires at {}, within minimum validity of {:?}; renewing",
            secret.key(),
            certificate.not_after,
            minimum_validity
        );
        return true;
    }

    debug!(
        "Certificate in secret {} valid until {}",
        secret.key(),
        certificate.not_after
    );
    false
}
