//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.
//!
//! Every value is validated: a value that does not parse is a startup error
//! rather than a silent fallback to the default.

use crate::config::duration::parse_duration;
use crate::constants;
use std::time::Duration;
use thiserror::Error;

/// Invalid controller configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Output format for controller logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Ingress class assumed when an ingress carries no class annotation
    pub default_ingress_class: String,
    /// Provider used when no annotation selects a registered provider
    pub default_ingress_provider: String,
    /// Ingress classes the controller manages (lower-case)
    pub supported_ingress_classes: Vec<String>,
    /// Minimum remaining certificate lifetime before proactive renewal
    pub minimum_validity: Duration,
    /// RSA key size requested from the issuer
    pub rsa_key_size: u32,
    /// First retry interval for a failing certificate issuance
    pub backoff_initial_interval: Duration,
    /// Total time budget for retrying one certificate issuance
    pub backoff_max_elapsed_time: Duration,
    /// Growth factor for issuance retries and per-key requeue delays
    pub backoff_multiplier: f64,
    /// First requeue delay after a failed reconciliation
    pub queue_base_delay: Duration,
    /// Ceiling for per-key requeue delays
    pub queue_max_delay: Duration,
    /// Interval between full resyncs of every ingress
    pub resync_period: Duration,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// HTTP server port for metrics and probes
    pub metrics_port: u16,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
            .expect("Failed to build default ControllerConfig - this should never happen")
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of touching the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_ingress_class = non_empty(
            "DEFAULT_INGRESS_CLASS",
            get("DEFAULT_INGRESS_CLASS"),
            constants::DEFAULT_INGRESS_CLASS,
        )?;
        let default_ingress_provider = non_empty(
            "DEFAULT_INGRESS_PROVIDER",
            get("DEFAULT_INGRESS_PROVIDER"),
            constants::DEFAULT_INGRESS_PROVIDER,
        )?;

        let supported_ingress_classes: Vec<String> = get("SUPPORTED_INGRESS_CLASSES")
            .unwrap_or_else(|| constants::DEFAULT_SUPPORTED_INGRESS_CLASSES.to_string())
            .split(',')
            .map(|class| class.trim().to_lowercase())
            .filter(|class| !class.is_empty())
            .collect();
        if supported_ingress_classes.is_empty() {
            return Err(ConfigError::invalid(
                "SUPPORTED_INGRESS_CLASSES",
                "",
                "at least one ingress class is required",
            ));
        }

        let minimum_validity = duration(
            "MINIMUM_VALIDITY",
            get("MINIMUM_VALIDITY"),
            constants::DEFAULT_MINIMUM_VALIDITY,
        )?;
        let rsa_key_size = rsa_key_size(get("RSA_KEY_SIZE"))?;
        let backoff_initial_interval = duration(
            "BACKOFF_INITIAL_INTERVAL",
            get("BACKOFF_INITIAL_INTERVAL"),
            constants::DEFAULT_BACKOFF_INITIAL_INTERVAL,
        )?;
        let backoff_max_elapsed_time = duration(
            "BACKOFF_MAX_ELAPSED_TIME",
            get("BACKOFF_MAX_ELAPSED_TIME"),
            constants::DEFAULT_BACKOFF_MAX_ELAPSED_TIME,
        )?;
        let backoff_multiplier = multiplier(get("BACKOFF_MULTIPLIER"))?;
        let queue_base_delay = duration(
            "QUEUE_BASE_DELAY",
            get("QUEUE_BASE_DELAY"),
            constants::DEFAULT_QUEUE_BASE_DELAY,
        )?;
        let queue_max_delay = duration(
            "QUEUE_MAX_DELAY",
            get("QUEUE_MAX_DELAY"),
            constants::DEFAULT_QUEUE_MAX_DELAY,
        )?;
        if queue_max_delay < queue_base_delay {
            return Err(ConfigError::invalid(
                "QUEUE_MAX_DELAY",
                &format!("{queue_max_delay:?}"),
                format!("must not be shorter than QUEUE_BASE_DELAY ({queue_base_delay:?})"),
            ));
        }
        let resync_period = duration(
            "RESYNC_PERIOD",
            get("RESYNC_PERIOD"),
            constants::DEFAULT_RESYNC_PERIOD,
        )?;

        let metrics_port = match get("METRICS_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("METRICS_PORT", &raw, e))?,
            None => constants::DEFAULT_METRICS_PORT,
        };

        let log_format = match get("LOG_FORMAT").map(|v| v.trim().to_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                return Err(ConfigError::invalid(
                    "LOG_FORMAT",
                    &v,
                    "expected 'json' or 'text'",
                ))
            }
        };

        Ok(Self {
            default_ingress_class: default_ingress_class.to_lowercase(),
            default_ingress_provider: default_ingress_provider.to_lowercase(),
            supported_ingress_classes,
            minimum_validity,
            rsa_key_size,
            backoff_initial_interval,
            backoff_max_elapsed_time,
            backoff_multiplier,
            queue_base_delay,
            queue_max_delay,
            resync_period,
            watch_namespace: get("WATCH_NAMESPACE").map(|ns| ns.trim().to_string()),
            metrics_port,
            log_format,
        })
    }

    /// RSA key size requested for new certificates
    #[must_use]
    pub fn rsa_key_size(&self) -> u32 {
        self.rsa_key_size
    }

    /// Minimum remaining lifetime before a certificate is renewed
    #[must_use]
    pub fn minimum_validity(&self) -> Duration {
        self.minimum_validity
    }

    /// Check whether `class` is one of the managed ingress classes
    #[must_use]
    pub fn is_supported_ingress_class(&self, class: &str) -> bool {
        let class = class.trim().to_lowercase();
        self.supported_ingress_classes.iter().any(|c| *c == class)
    }
}

fn non_empty(key: &'static str, value: Option<String>, default: &str) -> Result<String, ConfigError> {
    let value = value.unwrap_or_else(|| default.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid(key, &value, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn duration(key: &'static str, value: Option<String>, default: &str) -> Result<Duration, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    parse_duration(&raw).map_err(|e| ConfigError::invalid(key, &raw, e))
}

fn rsa_key_size(value: Option<String>) -> Result<u32, ConfigError> {
    let Some(raw) = value else {
        return Ok(constants::DEFAULT_RSA_KEY_SIZE);
    };
    let size = raw
        .trim()
        .parse::<u32>()
        .map_err(|e| ConfigError::invalid("RSA_KEY_SIZE", &raw, e))?;
    if size < constants::MIN_RSA_KEY_SIZE {
        return Err(ConfigError::invalid(
            "RSA_KEY_SIZE",
            &raw,
            format!("must be at least {} bits", constants::MIN_RSA_KEY_SIZE),
        ));
    }
    Ok(size)
}

fn multiplier(value: Option<String>) -> Result<f64, ConfigError> {
    let Some(raw) = value else {
        return Ok(constants::DEFAULT_BACKOFF_MULTIPLIER);
    };
    let multiplier = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| ConfigError::invalid("BACKOFF_MULTIPLIER", &raw, e))?;
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(ConfigError::invalid(
            "BACKOFF_MULTIPLIER",
            &raw,
            "must be a finite number of at least 1.0",
        ));
    }
    Ok(multiplier)
}
