//! # Secret
//!
//! Wrapper around the Secret referenced by a TLS declaration.
//!
//! A `Secret` may be a placeholder for an object that does not exist yet.
//! Certificate inspection reads the first PEM certificate in `tls.crt`.

use crate::constants::{FIELD_MANAGER, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY, TLS_SECRET_TYPE};
use crate::ingress::ResourceKey;
use crate::issuer::IssuedCertificate;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret as SecretApi;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use thiserror::Error;
use x509_parser::prelude::*;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("secret {0} does not exist")]
    Missing(ResourceKey),
    #[error("secret {secret} has no {key} entry")]
    MissingData { secret: ResourceKey, key: &'static str },
    #[error("failed to parse PEM: {0}")]
    Pem(String),
    #[error("no CERTIFICATE block found in PEM data")]
    NoCertificate,
    #[error("failed to parse certificate: {0}")]
    Parse(String),
    #[error("certificate timestamp {0} is out of range")]
    Timestamp(i64),
}

/// Validity window and names of a leaf certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// DNS subject alternative names, or the common name when the
    /// certificate carries no DNS SANs
    pub dns_names: Vec<String>,
}

impl CertificateInfo {
    /// Parse the first certificate of a PEM bundle
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, CertificateError> {
        let blocks =
            ::pem::parse_many(pem_data).map_err(|e| CertificateError::Pem(e.to_string()))?;
        let leaf = blocks
            .iter()
            .find(|block| block.tag() == "CERTIFICATE")
            .ok_or(CertificateError::NoCertificate)?;
        Self::from_der(leaf.contents())
    }

    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CertificateError::Parse(e.to_string()))?;

        let not_before = to_datetime(cert.validity().not_before.timestamp())?;
        let not_after = to_datetime(cert.validity().not_after.timestamp())?;

        let mut dns_names: Vec<String> = cert
            .subject_alternative_name()
            .map_err(|e| CertificateError::Parse(e.to_string()))?
            .map(|san| {
                san.value
                    .general_names
                    .iter()
                    .filter_map(|name| match name {
                        GeneralName::DNSName(dns) => Some(dns.to_lowercase()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if dns_names.is_empty() {
            if let Some(cn) = cert
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
            {
                dns_names.push(cn.to_lowercase());
            }
        }

        Ok(Self {
            not_before,
            not_after,
            dns_names,
        })
    }

    /// Whether every host is named by the certificate (exact, case-insensitive)
    #[must_use]
    pub fn covers(&self, hosts: &[String]) -> bool {
        hosts.iter().all(|host| {
            let host = host.to_lowercase();
            self.dns_names.iter().any(|name| *name == host)
        })
    }
}

fn to_datetime(timestamp: i64) -> Result<DateTime<Utc>, CertificateError> {
    DateTime::from_timestamp(timestamp, 0).ok_or(CertificateError::Timestamp(timestamp))
}

/// A Secret referenced by a TLS declaration, possibly not yet created
#[derive(Debug, Clone)]
pub struct Secret {
    key: ResourceKey,
    api: Option<SecretApi>,
}

impl Secret {
    #[must_use]
    pub fn new(key: ResourceKey, api: Option<SecretApi>) -> Self {
        Self { key, api }
    }

    /// A secret that has not been created yet
    #[must_use]
    pub fn placeholder(key: ResourceKey) -> Self {
        Self { key, api: None }
    }

    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.api.is_some()
    }

    fn data(&self, data_key: &'static str) -> Result<&[u8], CertificateError> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| CertificateError::Missing(self.key.clone()))?;
        api.data
            .as_ref()
            .and_then(|data| data.get(data_key))
            .map(|bytes| bytes.0.as_slice())
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| CertificateError::MissingData {
                secret: self.key.clone(),
                key: data_key,
            })
    }

    /// Inspect the certificate stored under `tls.crt`
    pub fn certificate(&self) -> Result<CertificateInfo, CertificateError> {
        CertificateInfo::from_pem(self.data(TLS_CERT_KEY)?)
    }

    /// Whether the stored certificate names every host
    pub fn tls_domains_include(&self, hosts: &[String]) -> Result<bool, CertificateError> {
        Ok(self.certificate()?.covers(hosts))
    }

    /// Desired state of this secret holding `issued`, for server-side apply
    ///
    /// Only the fields owned by the controller are set so that labels and
    /// annotations added by other managers are preserved.
    #[must_use]
    pub fn desired(&self, issued: &IssuedCertificate) -> SecretApi {
        let mut data = BTreeMap::new();
        data.insert(
            TLS_CERT_KEY.to_string(),
            ByteString(issued.certificate_pem.as_bytes().to_vec()),
        );
        data.insert(
            TLS_PRIVATE_KEY_KEY.to_string(),
            ByteString(issued.private_key_pem.as_bytes().to_vec()),
        );

        let mut labels = BTreeMap::new();
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        );

        SecretApi {
            metadata: ObjectMeta {
                name: Some(self.key.name.clone()),
                namespace: Some(self.key.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            type_: Some(TLS_SECRET_TYPE.to_string()),
            data: Some(data),
            ..Default::default()
        }
    }
}
