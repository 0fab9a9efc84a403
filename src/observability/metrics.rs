//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `ingress_tls_reconciliations_total` - Total number of reconciliations
//! - `ingress_tls_reconciliation_errors_total` - Total number of failed reconciliations
//! - `ingress_tls_reconciliation_duration_seconds` - Duration of reconciliations
//! - `ingress_tls_queue_depth` - Keys waiting in the work queue
//! - `ingress_tls_queue_adds_total` - Keys accepted by the work queue
//! - `ingress_tls_queue_requeues_total` - Rate-limited requeues after failures
//! - `ingress_tls_certificates_issued_total` - Certificates issued and stored
//! - `ingress_tls_issuance_errors_total` - Issuances that failed after all retries
//! - `ingress_tls_provider_errors_total` - Provider failures by provider and phase
//! - `ingress_tls_secret_conflicts_total` - TLS entries skipped for sharing a secret

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ingress_tls_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ingress_tls_reconciliation_errors_total",
        "Total number of failed reconciliations",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "ingress_tls_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static QUEUE_DEPTH: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new("ingress_tls_queue_depth", "Keys waiting in the work queue")
        .expect("Failed to create QUEUE_DEPTH metric - this should never happen")
});

static QUEUE_ADDS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ingress_tls_queue_adds_total",
        "Total number of keys accepted by the work queue",
    )
    .expect("Failed to create QUEUE_ADDS_TOTAL metric - this should never happen")
});

static QUEUE_REQUEUES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ingress_tls_queue_requeues_total",
        "Total number of rate-limited requeues",
    )
    .expect("Failed to create QUEUE_REQUEUES_TOTAL metric - this should never happen")
});

static CERTIFICATES_ISSUED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ingress_tls_certificates_issued_total",
        "Total number of certificates issued and stored",
    )
    .expect("Failed to create CERTIFICATES_ISSUED_TOTAL metric - this should never happen")
});

static ISSUANCE_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ingress_tls_issuance_errors_total",
        "Total number of certificate issuances that failed after all retries",
    )
    .expect("Failed to create ISSUANCE_ERRORS_TOTAL metric - this should never happen")
});

static PROVIDER_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ingress_tls_provider_errors_total",
            "Total number of provider failures",
        ),
        &["provider", "phase"],
    )
    .expect("Failed to create PROVIDER_ERRORS_TOTAL metric - this should never happen")
});

static SECRET_CONFLICTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ingress_tls_secret_conflicts_total",
        "Total number of TLS entries skipped because their secret is shared",
    )
    .expect("Failed to create SECRET_CONFLICTS_TOTAL metric - this should never happen")
});

/// Register all metrics with the process registry
///
/// Must be called once at startup; a second call fails with a duplicate
/// registration error.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(QUEUE_DEPTH.clone()))?;
    REGISTRY.register(Box::new(QUEUE_ADDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUEUE_REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CERTIFICATES_ISSUED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ISSUANCE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRET_CONFLICTS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn set_queue_depth(depth: usize) {
    QUEUE_DEPTH.set(i64::try_from(depth).unwrap_or(i64::MAX));
}

pub fn increment_queue_adds() {
    QUEUE_ADDS_TOTAL.inc();
}

pub fn increment_requeues() {
    QUEUE_REQUEUES_TOTAL.inc();
}

pub fn increment_certificates_issued() {
    CERTIFICATES_ISSUED_TOTAL.inc();
}

pub fn increment_issuance_errors() {
    ISSUANCE_ERRORS_TOTAL.inc();
}

pub fn increment_provider_errors(provider: &str, phase: &str) {
    PROVIDER_ERRORS_TOTAL
        .with_label_values(&[provider, phase])
        .inc();
}

pub fn increment_secret_conflicts(count: u64) {
    SECRET_CONFLICTS_TOTAL.inc_by(count);
}

/// Render the process registry in the Prometheus text format
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
