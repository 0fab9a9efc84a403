//! # Renewal Tests
//!
//! Certificate renewal decisions and TLS declaration processing.

mod common;

use chrono::Duration as ChronoDuration;
use common::{now, tls_secret, FakeSecretStore, RecordingIssuer};
use ingress_tls_controller::ingress::tls::TlsOutcome;
use ingress_tls_controller::ingress::CertificatePolicy;
use ingress_tls_controller::issuer::RetryPolicy;
use ingress_tls_controller::prelude::*;
use std::sync::atomic::Ordering;
use std::time::Duration;

const TWENTY_DAYS: Duration = Duration::from_secs(20 * 86_400);

fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| (*h).to_string()).collect()
}

fn policy() -> CertificatePolicy {
    CertificatePolicy {
        minimum_validity: TWENTY_DAYS,
        rsa_key_size: 2048,
        retry: RetryPolicy {
            initial_interval: Duration::from_secs(1),
            max_elapsed_time: Duration::from_secs(5),
            multiplier: 2.0,
        },
    }
}

#[test]
fn test_expired_certificate_needs_renewal() {
    let secret = tls_secret("default", "tls", &["das.de.de"], ChronoDuration::hours(-1));
    assert!(needs_new_certificate(&hosts(&["das.de.de"]), &secret, now(), TWENTY_DAYS));
}

#[test]
fn test_certificate_inside_minimum_validity_needs_renewal() {
    let secret = tls_secret("default", "tls", &["das.de.de"], ChronoDuration::hours(48));
    assert!(needs_new_certificate(&hosts(&["das.de.de"]), &secret, now(), TWENTY_DAYS));
}

#[test]
fn test_certificate_outside_minimum_validity_is_kept() {
    let secret = tls_secret("default", "tls", &["das.de.de"], ChronoDuration::days(30));
    assert!(!needs_new_certificate(&hosts(&["das.de.de"]), &secret, now(), TWENTY_DAYS));
}

#[test]
fn test_missing_secret_needs_certificate() {
    let secret = Secret::placeholder(ResourceKey::new("default", "tls"));
    assert!(needs_new_certificate(&hosts(&["das.de.de"]), &secret, now(), TWENTY_DAYS));
}

#[test]
fn test_uncovered_host_needs_certificate() {
    let secret = tls_secret("default", "tls", &["das.de.de"], ChronoDuration::days(60));
    assert!(needs_new_certificate(
        &hosts(&["das.de.de", "www.das.de.de"]),
        &secret,
        now(),
        TWENTY_DAYS
    ));
    // A subset of the certificate's names is fine
    let wide = tls_secret("default", "tls", &["a.de", "b.de"], ChronoDuration::days(60));
    assert!(!needs_new_certificate(&hosts(&["b.de"]), &wide, now(), TWENTY_DAYS));
}

#[test]
fn test_decision_uses_the_supplied_clock() {
    let secret = tls_secret("default", "tls", &["das.de.de"], ChronoDuration::days(30));
    let later = now() + ChronoDuration::days(15);
    assert!(needs_new_certificate(&hosts(&["das.de.de"]), &secret, later, TWENTY_DAYS));
}

#[tokio::test]
async fn test_process_keeps_valid_certificate() {
    let secrets = FakeSecretStore::default();
    secrets.insert(common::tls_secret_api(
        "default",
        "secret1",
        &["domain1"],
        ChronoDuration::days(60),
    ));
    let issuer = RecordingIssuer::default();

    let tls = TlsDeclaration::new(ResourceKey::new("default", "web"), hosts(&["domain1"]), "secret1");
    let outcome = tls.process(&secrets, &issuer, &policy()).await.unwrap();

    assert_eq!(outcome, TlsOutcome::Valid);
    assert!(issuer.requests().is_empty());
    assert!(secrets.applied_names().is_empty());
}

#[tokio::test]
async fn test_process_issues_and_stores_missing_certificate() {
    let secrets = FakeSecretStore::default();
    let issuer = RecordingIssuer::default();

    let tls = TlsDeclaration::new(
        ResourceKey::new("default", "web"),
        hosts(&["domain3", "domain4"]),
        "secret2",
    );
    let outcome = tls.process(&secrets, &issuer, &policy()).await.unwrap();

    assert_eq!(outcome, TlsOutcome::Issued);
    let requests = issuer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].hosts, hosts(&["domain3", "domain4"]));
    assert_eq!(requests[0].rsa_key_size, 2048);

    let stored = secrets.stored("default", "secret2").unwrap();
    assert!(!needs_new_certificate(&hosts(&["domain3", "domain4"]), &stored, now(), TWENTY_DAYS));
}

#[tokio::test]
async fn test_secret_is_fetched_once_per_declaration() {
    let secrets = FakeSecretStore::default();
    let tls = TlsDeclaration::new(ResourceKey::new("default", "web"), hosts(&["domain1"]), "secret1");

    tls.secret(&secrets).await.unwrap();
    tls.secret(&secrets).await.unwrap();
    assert_eq!(secrets.get_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_process_reports_issuer_failure_after_retries() {
    let secrets = FakeSecretStore::default();
    let issuer = RecordingIssuer::default();
    issuer.fail.store(true, Ordering::SeqCst);

    let tls = TlsDeclaration::new(ResourceKey::new("default", "web"), hosts(&["domain1"]), "secret1");
    let err = tls.process(&secrets, &issuer, &policy()).await.unwrap_err();

    // Attempts at 0s, 1s and 3s; the next 4s delay would exceed the 5s budget
    assert_eq!(issuer.requests().len(), 3);
    assert!(format!("{err:#}").contains("certificate authority unavailable"));
    assert!(secrets.applied_names().is_empty());
}
