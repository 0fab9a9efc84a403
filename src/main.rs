//! # Ingress TLS Controller
//!
//! A Kubernetes controller that provisions and renews TLS certificates for
//! the hostnames declared on Ingress resources.
//!
//! ## Overview
//!
//! 1. **Watching ingresses** - Observes `networking.k8s.io/v1` Ingress objects
//!    annotated with `kubernetes.io/tls-acme: "true"`
//! 2. **Routing providers** - Hands each ingress to the provider selected by
//!    its class or provider annotation
//! 3. **Certificate renewal** - Issues a certificate when the referenced
//!    Secret is missing, does not cover the hosts, or is close to expiry
//!
//! Configuration is read from environment variables; see `config`.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ingress_tls_controller::runtime::initialization::run().await
}
