//! # Initialization
//!
//! Process bootstrap: rustls setup, tracing, configuration, metrics, the
//! HTTP server, the Kubernetes client, and the controller tasks. Runs until
//! a shutdown signal arrives, then stops every task and waits for them.

use crate::config::{create_shared_config, ControllerConfig, LogFormat};
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::issuer::SelfSignedIssuer;
use crate::observability::{self, logging::init_tracing};
use crate::provider::{HostRecordingProvider, ProviderRegistry};
use crate::runtime::watch::{run_event_filter, run_ingress_watch};
use crate::runtime::worker::{run_resync_loop, run_worker};
use crate::runtime::ControllerContext;
use crate::store::{KubeIngressStore, KubeSecretStore};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Providers registered out of the box
const BUILTIN_PROVIDERS: [&str; 2] = ["gce", "nginx"];

/// Run the controller until shutdown
pub async fn run() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any other operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    let config = match ControllerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Still log the failure in the default format
            let _ = init_tracing(LogFormat::Text);
            error!("Invalid configuration: {}", e);
            return Err(e).context("Failed to load controller configuration");
        }
    };
    init_tracing(config.log_format)?;

    info!("Starting Ingress TLS Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        "Configuration: default_class={}, default_provider={}, supported_classes=[{}], minimum_validity={:?}, rsa_key_size={}",
        config.default_ingress_class,
        config.default_ingress_provider,
        config.supported_ingress_classes.join(", "),
        config.minimum_validity,
        config.rsa_key_size
    );

    observability::register_metrics()?;

    let shutdown = CancellationToken::new();
    let server_state = Arc::new(ServerState::default());
    let server_handle = tokio::spawn({
        let state = Arc::clone(&server_state);
        let shutdown = shutdown.clone();
        let port = config.metrics_port;
        async move {
            if let Err(e) = start_server(port, state, shutdown).await {
                error!("HTTP server error: {}", e);
            }
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let ingress_store = KubeIngressStore::new(client.clone(), config.watch_namespace.clone());
    let ingress_api = ingress_store.api();
    let secrets = Arc::new(KubeSecretStore::new(client));

    let mut providers = ProviderRegistry::new();
    for name in BUILTIN_PROVIDERS {
        providers.register(Arc::new(HostRecordingProvider::new(name)))?;
    }

    let shared_config = create_shared_config(config);
    let reconciler = Reconciler::new(
        providers,
        secrets,
        Arc::new(SelfSignedIssuer::default()),
        Arc::clone(&shared_config),
    );
    let ctx = Arc::new(ControllerContext::new(
        Arc::clone(&shared_config),
        reconciler,
        Arc::new(ingress_store),
        shutdown.clone(),
    ));

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    ctx.spawn(run_ingress_watch(
        ingress_api,
        events_tx,
        Arc::clone(&server_state),
        shutdown.clone(),
    ));
    ctx.spawn(run_event_filter(Arc::clone(&ctx), events_rx));
    ctx.spawn(run_resync_loop(Arc::clone(&ctx)));
    ctx.spawn(run_worker(Arc::clone(&ctx)));

    info!("Controller initialized, waiting for shutdown signal...");
    wait_for_shutdown().await;

    info!("Received shutdown signal, initiating graceful shutdown...");
    server_state.set_ready(false);
    ctx.shutdown();
    ctx.wait().await;
    if let Err(e) = server_handle.await {
        error!("HTTP server task failed: {}", e);
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            error!("Failed to install SIGTERM handler, falling back to ctrl-c: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for ctrl-c: {}", e);
            }
        }
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
    }
}
