//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Annotation selecting the ingress class (and by default the provider)
pub const ANNOTATION_INGRESS_CLASS: &str = "kubernetes.io/ingress.class";

/// Annotation overriding which registered provider handles the ingress
pub const ANNOTATION_INGRESS_PROVIDER: &str = "kubernetes.io/ingress.provider";

/// Annotation opting an ingress into certificate management
pub const ANNOTATION_MANAGED: &str = "kubernetes.io/tls-acme";

/// Annotation controlling HTTP to HTTPS redirects on the routing layer
pub const ANNOTATION_SSL_REDIRECT: &str = "ingress.kubernetes.io/ssl-redirect";

/// Annotation restricting client source ranges on the routing layer
pub const ANNOTATION_WHITELIST_SOURCE_RANGE: &str = "ingress.kubernetes.io/whitelist-source-range";

/// Annotations whose change forces an ingress to be reprocessed
pub const TRACKED_ANNOTATIONS: [&str; 5] = [
    ANNOTATION_INGRESS_CLASS,
    ANNOTATION_INGRESS_PROVIDER,
    ANNOTATION_MANAGED,
    ANNOTATION_SSL_REDIRECT,
    ANNOTATION_WHITELIST_SOURCE_RANGE,
];

/// Secret data key holding the PEM certificate chain
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret data key holding the PEM private key
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Secret type written for issued certificates
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// Field manager used for server-side apply of secrets
pub const FIELD_MANAGER: &str = "ingress-tls-controller";

/// Name the work queue reports in logs and metrics
pub const QUEUE_NAME: &str = "ingress-tls";

/// Default ingress class when an ingress carries no class annotation
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";

/// Default provider when no annotation selects a registered one
pub const DEFAULT_INGRESS_PROVIDER: &str = "nginx";

/// Ingress classes handled out of the box
pub const DEFAULT_SUPPORTED_INGRESS_CLASSES: &str = "nginx,gce";

/// Default minimum remaining certificate lifetime before renewal
pub const DEFAULT_MINIMUM_VALIDITY: &str = "30d";

/// Default RSA key size for issued certificates
pub const DEFAULT_RSA_KEY_SIZE: u32 = 2048;

/// Smallest RSA key size accepted
pub const MIN_RSA_KEY_SIZE: u32 = 512;

/// Default first retry interval for certificate issuance
pub const DEFAULT_BACKOFF_INITIAL_INTERVAL: &str = "30s";

/// Default budget for retrying a single certificate issuance
pub const DEFAULT_BACKOFF_MAX_ELAPSED_TIME: &str = "5m";

/// Default growth factor for every exponential backoff in the controller
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default first delay applied to a key that failed reconciliation
pub const DEFAULT_QUEUE_BASE_DELAY: &str = "10m";

/// Default ceiling for per-key requeue delays
pub const DEFAULT_QUEUE_MAX_DELAY: &str = "24h";

/// Default interval between full resyncs of every ingress
pub const DEFAULT_RESYNC_PERIOD: &str = "10m";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default delay before restarting the ingress watch after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Capacity of the channel between the informer and the event filter
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifetime of certificates minted by the self-signed issuer (days)
pub const SELF_SIGNED_VALIDITY_DAYS: i64 = 90;
