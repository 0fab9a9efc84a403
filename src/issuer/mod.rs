//! # Issuer
//!
//! Certificate issuance seam.
//!
//! - `CertificateIssuer`: obtains a certificate and private key for a set of hosts
//! - `issue_with_retry`: retries an issuer with exponential backoff inside a time budget
//! - `self_signed`: issuer minting self-signed certificates locally

pub mod self_signed;

pub use self_signed::SelfSignedIssuer;

use crate::config::ControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// What to issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceRequest {
    /// Names the certificate must cover; the first is the subject
    pub hosts: Vec<String>,
    pub rsa_key_size: u32,
}

/// A freshly issued certificate
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// PEM certificate chain, leaf first
    pub certificate_pem: String,
    /// PEM private key
    pub private_key_pem: String,
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("certificate_pem", &self.certificate_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Obtains certificates from a certificate authority
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, request: &IssuanceRequest) -> Result<IssuedCertificate>;
}

/// Retry settings for a single issuance
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_elapsed_time: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            initial_interval: config.backoff_initial_interval,
            max_elapsed_time: config.backoff_max_elapsed_time,
            multiplier: config.backoff_multiplier,
        }
    }
}

/// Call `issuer` until it succeeds or the next retry would exceed the budget
///
/// The last error is returned when the budget runs out.
pub async fn issue_with_retry(
    issuer: &dyn CertificateIssuer,
    request: &IssuanceRequest,
    policy: &RetryPolicy,
) -> Result<IssuedCertificate> {
    let started = Instant::now();
    let mut backoff = ExponentialBackoff::new(
        policy.initial_interval,
        policy.max_elapsed_time,
        policy.multiplier,
    );
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match issuer.issue(request).await {
            Ok(issued) => return Ok(issued),
            Err(e) => {
                let delay = backoff.next_backoff();
                if started.elapsed().saturating_add(delay) > policy.max_elapsed_time {
                    return Err(e.context(format!(
                        "giving up on certificate for [{}] after {} attempt(s)",
                        request.hosts.join(", "),
                        attempt
                    )));
                }
                warn!(
                    "Certificate issuance for [{}] failed (attempt {}), retrying in {:?}: {:#}",
                    request.hosts.join(", "),
                    attempt,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
