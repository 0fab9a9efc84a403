//! Common test utilities
//!
//! In-memory stores, issuers and providers plus helpers that mint real
//! certificates with `rcgen`.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use ingress_tls_controller::config::{create_shared_config, ControllerConfig, SharedControllerConfig};
use ingress_tls_controller::constants::{
    ANNOTATION_MANAGED, TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY, TLS_SECRET_TYPE,
};
use ingress_tls_controller::prelude::*;
use ingress_tls_controller::provider::HostRecordingProvider;
use k8s_openapi::api::core::v1::Secret as SecretApi;
use k8s_openapi::api::networking::v1::{Ingress as IngressApi, IngressSpec, IngressTLS};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use rcgen::{CertificateParams, KeyPair};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Mint a self-signed certificate for `hosts` that expires `valid_for` from now
pub fn certificate_pem(hosts: &[&str], valid_for: chrono::Duration) -> (String, String) {
    let mut params =
        CertificateParams::new(hosts.iter().map(|h| (*h).to_string()).collect::<Vec<_>>())
            .expect("valid hosts");
    let now = time::OffsetDateTime::now_utc();
    let not_after = now + time::Duration::seconds(valid_for.num_seconds());
    params.not_before = now.min(not_after) - time::Duration::days(90);
    params.not_after = not_after;
    let key_pair = KeyPair::generate().expect("key pair");
    let cert = params.self_signed(&key_pair).expect("self-signed certificate");
    (cert.pem(), key_pair.serialize_pem())
}

/// A `kubernetes.io/tls` secret holding a certificate for `hosts`
pub fn tls_secret_api(
    namespace: &str,
    name: &str,
    hosts: &[&str],
    valid_for: chrono::Duration,
) -> SecretApi {
    let (cert, key) = certificate_pem(hosts, valid_for);
    let mut data = BTreeMap::new();
    data.insert(TLS_CERT_KEY.to_string(), ByteString(cert.into_bytes()));
    data.insert(TLS_PRIVATE_KEY_KEY.to_string(), ByteString(key.into_bytes()));
    SecretApi {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        type_: Some(TLS_SECRET_TYPE.to_string()),
        data: Some(data),
        ..Default::default()
    }
}

pub fn tls_secret(
    namespace: &str,
    name: &str,
    hosts: &[&str],
    valid_for: chrono::Duration,
) -> Secret {
    Secret::new(
        ResourceKey::new(namespace, name),
        Some(tls_secret_api(namespace, name, hosts, valid_for)),
    )
}

/// Ingress object with the given annotations and `(hosts, secret)` TLS entries
pub fn ingress_api(
    namespace: &str,
    name: &str,
    annotations: &[(&str, &str)],
    tls: &[(&[&str], &str)],
) -> IngressApi {
    IngressApi {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            tls: Some(
                tls.iter()
                    .map(|(hosts, secret)| IngressTLS {
                        hosts: Some(hosts.iter().map(|h| (*h).to_string()).collect()),
                        secret_name: Some((*secret).to_string()),
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Managed ingress in namespace `default`
pub fn managed_ingress(name: &str, tls: &[(&[&str], &str)]) -> Ingress {
    Ingress::new(ingress_api(
        "default",
        name,
        &[(ANNOTATION_MANAGED, "true")],
        tls,
    ))
}

/// Configuration with short issuance retries
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        backoff_initial_interval: Duration::from_secs(1),
        backoff_max_elapsed_time: Duration::from_secs(5),
        ..ControllerConfig::default()
    }
}

#[derive(Debug, Default)]
pub struct FakeIngressStore {
    ingresses: Mutex<BTreeMap<ResourceKey, Ingress>>,
    pub fail: AtomicBool,
}

impl FakeIngressStore {
    pub fn insert(&self, ingress: Ingress) {
        self.ingresses.lock().unwrap().insert(ingress.key(), ingress);
    }

    pub fn remove(&self, key: &ResourceKey) {
        self.ingresses.lock().unwrap().remove(key);
    }
}

#[async_trait]
impl IngressStore for FakeIngressStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<Ingress>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("ingress store unavailable");
        }
        Ok(self.ingresses.lock().unwrap().get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<Ingress>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("ingress store unavailable");
        }
        Ok(self.ingresses.lock().unwrap().values().cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct FakeSecretStore {
    secrets: Mutex<BTreeMap<ResourceKey, SecretApi>>,
    applied: Mutex<Vec<SecretApi>>,
    pub get_calls: AtomicUsize,
}

impl FakeSecretStore {
    pub fn insert(&self, secret: SecretApi) {
        let key = ResourceKey::new(
            secret.metadata.namespace.clone().unwrap_or_default(),
            secret.metadata.name.clone().unwrap_or_default(),
        );
        self.secrets.lock().unwrap().insert(key, secret);
    }

    /// Names of applied secrets, in order
    pub fn applied_names(&self) -> Vec<String> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .filter_map(|secret| secret.metadata.name.clone())
            .collect()
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<Secret> {
        let key = ResourceKey::new(namespace, name);
        let api = self.secrets.lock().unwrap().get(&key).cloned();
        api.map(|api| Secret::new(key, Some(api)))
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<SecretApi>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.secrets.lock().unwrap().get(key).cloned())
    }

    async fn apply(&self, secret: &SecretApi) -> Result<()> {
        self.insert(secret.clone());
        self.applied.lock().unwrap().push(secret.clone());
        Ok(())
    }
}

/// Issuer that mints real certificates and records every request
#[derive(Debug, Default)]
pub struct RecordingIssuer {
    requests: Mutex<Vec<IssuanceRequest>>,
    pub fail: AtomicBool,
}

impl RecordingIssuer {
    pub fn requests(&self) -> Vec<IssuanceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CertificateIssuer for RecordingIssuer {
    async fn issue(&self, request: &IssuanceRequest) -> Result<IssuedCertificate> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            bail!("certificate authority unavailable");
        }
        let hosts: Vec<&str> = request.hosts.iter().map(String::as_str).collect();
        let (certificate_pem, private_key_pem) = certificate_pem(&hosts, chrono::Duration::days(90));
        Ok(IssuedCertificate {
            certificate_pem,
            private_key_pem,
        })
    }
}

/// Provider that records its lifecycle calls and can fail one phase
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    fail_phase: Option<&'static str>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            fail_phase: None,
            calls,
        }
    }

    pub fn failing(name: &str, phase: &'static str, calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            fail_phase: Some(phase),
            calls,
        }
    }

    fn record(&self, phase: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{}.{}", self.name, phase));
        if self.fail_phase == Some(phase) {
            bail!("{} {} failed", self.name, phase);
        }
        Ok(())
    }
}

#[async_trait]
impl IngressProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reset(&self) -> Result<()> {
        self.record("reset")
    }

    async fn process(&self, _ingress: &Ingress) -> Result<()> {
        self.record("process")
    }

    async fn finalize(&self) -> Result<()> {
        self.record("finalize")
    }
}

/// Registry with recording `nginx` and `gce` providers
pub fn default_providers() -> (ProviderRegistry, Arc<HostRecordingProvider>, Arc<HostRecordingProvider>) {
    let nginx = Arc::new(HostRecordingProvider::new("nginx"));
    let gce = Arc::new(HostRecordingProvider::new("gce"));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::clone(&nginx) as Arc<dyn IngressProvider>).unwrap();
    registry.register(Arc::clone(&gce) as Arc<dyn IngressProvider>).unwrap();
    (registry, nginx, gce)
}

/// A reconciler wired to in-memory collaborators
pub struct Harness {
    pub config: SharedControllerConfig,
    pub secrets: Arc<FakeSecretStore>,
    pub issuer: Arc<RecordingIssuer>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new(providers: ProviderRegistry) -> Self {
        let config = create_shared_config(test_config());
        let secrets = Arc::new(FakeSecretStore::default());
        let issuer = Arc::new(RecordingIssuer::default());
        let reconciler = Reconciler::new(
            providers,
            Arc::clone(&secrets) as Arc<dyn SecretStore>,
            Arc::clone(&issuer) as Arc<dyn CertificateIssuer>,
            Arc::clone(&config),
        );
        Self {
            config,
            secrets,
            issuer,
            reconciler,
        }
    }

    /// Controller context around this reconciler and `ingresses`
    pub async fn context(&self, ingresses: Arc<FakeIngressStore>) -> Arc<ControllerContext> {
        Arc::new(ControllerContext::new(
            Arc::clone(&self.config),
            self.reconciler.clone(),
            ingresses as Arc<dyn IngressStore>,
            CancellationToken::new(),
        ))
    }
}

/// Current time, for decision engine calls
pub fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}
