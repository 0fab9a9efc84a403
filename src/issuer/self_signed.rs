//! # Self-Signed Issuer
//!
//! Mints self-signed certificates locally with `rcgen`. Keys are ECDSA
//! P-256, so the requested RSA key size is not used.

use crate::constants::SELF_SIGNED_VALIDITY_DAYS;
use crate::issuer::{CertificateIssuer, IssuanceRequest, IssuedCertificate};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rcgen::{CertificateParams, DistinguishedName, DnType, DnValue, KeyPair};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SelfSignedIssuer {
    validity_days: i64,
}

impl Default for SelfSignedIssuer {
    fn default() -> Self {
        Self::new(SELF_SIGNED_VALIDITY_DAYS)
    }
}

impl SelfSignedIssuer {
    #[must_use]
    pub fn new(validity_days: i64) -> Self {
        Self { validity_days }
    }

    fn mint(&self, hosts: &[String]) -> Result<IssuedCertificate> {
        let subject = hosts
            .first()
            .ok_or_else(|| anyhow!("cannot issue a certificate without hosts"))?;

        let mut params = CertificateParams::new(hosts.to_vec())
            .map_err(|e| anyhow!("invalid hosts [{}]: {e}", hosts.join(", ")))?;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DnValue::Utf8String(subject.clone()));
        params.distinguished_name = dn;

        let now = ::time::OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + ::time::Duration::days(self.validity_days);

        let key_pair =
            KeyPair::generate().map_err(|e| anyhow!("failed to generate key pair: {e}"))?;
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| anyhow!("failed to sign certificate: {e}"))?;

        Ok(IssuedCertificate {
            certificate_pem: cert.pem(),
            private_key_pem: key_pair.serialize_pem(),
        })
    }
}

#[async_trait]
impl CertificateIssuer for SelfSignedIssuer {
    async fn issue(&self, request: &IssuanceRequest) -> Result<IssuedCertificate> {
        debug!(
            "Minting self-signed certificate for [{}]",
            request.hosts.join(", ")
        );
        self.mint(&request.hosts)
    }
}
