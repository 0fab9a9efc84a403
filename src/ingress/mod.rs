//! # Ingress
//!
//! Typed view over `networking.k8s.io/v1` Ingress objects.
//!
//! - `ResourceKey`: namespace/name identity used by the work queue
//! - `Ingress`: annotation accessors, ignore rules and TLS extraction
//! - `secret`: certificate-bearing Secret wrapper
//! - `tls`: TLS declarations and the renewal decision

pub mod secret;
pub mod tls;

pub use secret::{CertificateError, CertificateInfo, Secret};
pub use tls::{needs_new_certificate, CertificatePolicy, TlsDeclaration};

use crate::config::ControllerConfig;
use crate::constants::{
    ANNOTATION_INGRESS_CLASS, ANNOTATION_INGRESS_PROVIDER, ANNOTATION_MANAGED,
    ANNOTATION_SSL_REDIRECT, ANNOTATION_WHITELIST_SOURCE_RANGE,
};
use k8s_openapi::api::networking::v1::{Ingress as IngressApi, IngressSpec};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Namespace/name identity of a namespaced object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid resource key {0:?}: expected <namespace>/<name> or <name>")]
pub struct InvalidResourceKey(String);

impl FromStr for ResourceKey {
    type Err = InvalidResourceKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [name] if !name.is_empty() => Ok(Self::new("", *name)),
            [namespace, name] if !name.is_empty() => Ok(Self::new(*namespace, *name)),
            _ => Err(InvalidResourceKey(s.to_string())),
        }
    }
}

/// Why an ingress is left alone by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The ingress has been deleted
    Deleted,
    /// The managed annotation is missing or not "true"
    NotManaged,
    /// The ingress class is not one of the supported classes
    UnsupportedClass(String),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Deleted => write!(f, "ingress no longer exists"),
            IgnoreReason::NotManaged => {
                write!(f, "annotation {ANNOTATION_MANAGED} is not \"true\"")
            }
            IgnoreReason::UnsupportedClass(class) => {
                write!(f, "ingress class {class:?} is not supported")
            }
        }
    }
}

/// An Ingress as observed from the cluster store
#[derive(Debug, Clone)]
pub struct Ingress {
    api: IngressApi,
    exists: bool,
}

impl Ingress {
    /// Wrap a live ingress object
    #[must_use]
    pub fn new(api: IngressApi) -> Self {
        Self { api, exists: true }
    }

    /// Wrap the last known state of an ingress that has been deleted
    #[must_use]
    pub fn deleted(api: IngressApi) -> Self {
        Self { api, exists: false }
    }

    #[must_use]
    pub fn api(&self) -> &IngressApi {
        &self.api
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.api.metadata.namespace.as_deref().unwrap_or("default")
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.api.metadata.name.as_deref().unwrap_or("unknown")
    }

    #[must_use]
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.namespace(), self.name())
    }

    #[must_use]
    pub fn spec(&self) -> Option<&IngressSpec> {
        self.api.spec.as_ref()
    }

    /// The annotation map; `None` when the object carries no map at all
    #[must_use]
    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.api.metadata.annotations.as_ref()
    }

    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }

    /// Ingress class from the annotation, lower-cased, or `default_class`
    #[must_use]
    pub fn ingress_class(&self, default_class: &str) -> String {
        self.annotation(ANNOTATION_INGRESS_CLASS)
            .map(str::trim)
            .filter(|class| !class.is_empty())
            .unwrap_or(default_class)
            .to_lowercase()
    }

    /// Provider override annotation, lower-cased
    #[must_use]
    pub fn provider_annotation(&self) -> Option<String> {
        self.annotation(ANNOTATION_INGRESS_PROVIDER)
            .map(str::trim)
            .filter(|provider| !provider.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether the ingress opted into certificate management
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.annotation(ANNOTATION_MANAGED)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    /// Whether plain HTTP should be redirected to HTTPS; defaults to true
    #[must_use]
    pub fn ssl_redirect(&self) -> bool {
        self.annotation(ANNOTATION_SSL_REDIRECT)
            .map_or(true, |value| !value.trim().eq_ignore_ascii_case("false"))
    }

    /// Client source ranges allowed to reach the ingress, empty for any
    #[must_use]
    pub fn whitelist_source_ranges(&self) -> Vec<String> {
        self.annotation(ANNOTATION_WHITELIST_SOURCE_RANGE)
            .map(|ranges| {
                ranges
                    .split(',')
                    .map(str::trim)
                    .filter(|range| !range.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Reason the controller must not touch this ingress, if any
    #[must_use]
    pub fn ignore_reason(&self, config: &ControllerConfig) -> Option<IgnoreReason> {
        if !self.exists {
            return Some(IgnoreReason::Deleted);
        }
        if !self.is_managed() {
            return Some(IgnoreReason::NotManaged);
        }
        let class = self.ingress_class(&config.default_ingress_class);
        if !config.is_supported_ingress_class(&class) {
            return Some(IgnoreReason::UnsupportedClass(class));
        }
        None
    }

    #[must_use]
    pub fn ignore(&self, config: &ControllerConfig) -> bool {
        self.ignore_reason(config).is_some()
    }

    /// TLS declarations in spec order
    ///
    /// Entries without a secret name or without hosts cannot be issued for
    /// and are skipped.
    #[must_use]
    pub fn tls(&self) -> Vec<TlsDeclaration> {
        let key = self.key();
        self.spec()
            .and_then(|spec| spec.tls.as_ref())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let secret_name = entry
                            .secret_name
                            .as_deref()
                            .map(str::trim)
                            .filter(|name| !name.is_empty());
                        let hosts: Vec<String> = entry
                            .hosts
                            .iter()
                            .flatten()
                            .map(|host| host.trim().to_string())
                            .filter(|host| !host.is_empty())
                            .collect();
                        match secret_name {
                            Some(secret_name) if !hosts.is_empty() => {
                                Some(TlsDeclaration::new(key.clone(), hosts, secret_name))
                            }
                            _ => {
                                debug!(
                                    "Skipping TLS entry of ingress {} without secret name or hosts",
                                    key
                                );
                                None
                            }
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ingress_api;
    use super::*;

    const MANAGED: (&str, &str) = (ANNOTATION_MANAGED, "true");

    #[test]
    fn test_resource_key_round_trips_through_display() {
        let key: ResourceKey = "team-a/web".parse().unwrap();
        assert_eq!(key, ResourceKey::new("team-a", "web"));
        assert_eq!(key.to_string(), "team-a/web");

        let cluster_scoped: ResourceKey = "web".parse().unwrap();
        assert_eq!(cluster_scoped.namespace, "");
        assert!("a/b/c".parse::<ResourceKey>().is_err());
        assert!("a/".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn test_tls_declarations_follow_spec_order() {
        let ingress = Ingress::new(ingress_api(
            "default",
            "web",
            None,
            &[(&["domain1", "domain2"], "secret1"), (&["domain3"], "secret2")],
        ));
        let tls = ingress.tls();
        assert_eq!(tls.len(), 2);
        assert_eq!(tls[0].secret_name(), "secret1");
        assert_eq!(tls[0].hosts(), ["domain1", "domain2"]);
        assert_eq!(tls[1].secret_name(), "secret2");
        assert_eq!(tls[1].hosts(), ["domain3"]);
        assert_eq!(tls[1].secret_key(), ResourceKey::new("default", "secret2"));
    }

    #[test]
    fn test_tls_entries_without_secret_or_hosts_are_skipped() {
        let ingress = Ingress::new(ingress_api(
            "default",
            "web",
            None,
            &[(&[], "secret1"), (&["domain3"], " ")],
        ));
        assert!(ingress.tls().is_empty());
    }

    #[test]
    fn test_ingress_class_defaults_and_lowercases() {
        let plain = Ingress::new(ingress_api("default", "web", None, &[]));
        assert_eq!(plain.ingress_class("nginx"), "nginx");

        let classed = Ingress::new(ingress_api(
            "default",
            "web",
            Some(&[(ANNOTATION_INGRESS_CLASS, "Nginx")]),
            &[],
        ));
        assert_eq!(classed.ingress_class("gce"), "nginx");
    }

    #[test]
    fn test_routing_annotations() {
        let plain = Ingress::new(ingress_api("default", "web", None, &[]));
        assert!(plain.ssl_redirect());
        assert!(plain.whitelist_source_ranges().is_empty());

        let restricted = Ingress::new(ingress_api(
            "default",
            "web",
            Some(&[
                (ANNOTATION_SSL_REDIRECT, "False"),
                (ANNOTATION_WHITELIST_SOURCE_RANGE, "10.0.0.0/8, ,192.168.0.0/16"),
            ]),
            &[],
        ));
        assert!(!restricted.ssl_redirect());
        assert_eq!(
            restricted.whitelist_source_ranges(),
            ["10.0.0.0/8", "192.168.0.0/16"]
        );
    }

    #[test]
    fn test_ignore_rules() {
        let config = ControllerConfig::default();

        let unmanaged = Ingress::new(ingress_api("default", "web", None, &[]));
        assert_eq!(unmanaged.ignore_reason(&config), Some(IgnoreReason::NotManaged));

        let managed = Ingress::new(ingress_api("default", "web", Some(&[MANAGED]), &[]));
        assert_eq!(managed.ignore_reason(&config), None);

        let custom = Ingress::new(ingress_api(
            "default",
            "web",
            Some(&[MANAGED, (ANNOTATION_INGRESS_CLASS, "customlb")]),
            &[],
        ));
        assert_eq!(
            custom.ignore_reason(&config),
            Some(IgnoreReason::UnsupportedClass("customlb".to_string()))
        );

        let deleted = Ingress::deleted(ingress_api("default", "web", Some(&[MANAGED]), &[]));
        assert!(deleted.ignore(&config));
    }
}
