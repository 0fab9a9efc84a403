//! # Worker
//!
//! Drains the work queue one key at a time, and periodically re-queues
//! every known ingress.

use crate::controller::reconciler::ReconcilerError;
use crate::ingress::ResourceKey;
use crate::runtime::ControllerContext;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to a dequeued key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Reconciled; backoff history cleared
    Reconciled,
    /// The ingress is gone; the key was dropped
    Dropped,
    /// Failed; the key was requeued with backoff
    Requeued,
}

/// Run until the queue shuts down
pub async fn run_worker(ctx: Arc<ControllerContext>) {
    info!("Worker started");
    while let Some(key) = ctx.queue.get().await {
        process_item(&ctx, &key).await;
        ctx.queue.done(&key);
    }
    info!("Worker stopped");
}

/// Reconcile one key and settle its place in the queue
///
/// The caller is responsible for marking the key done.
pub async fn process_item(ctx: &ControllerContext, key: &ResourceKey) -> ItemOutcome {
    debug!("Worker: begin processing {}", key);

    let ingress = match ctx.ingresses.get(key).await {
        Ok(Some(ingress)) => ingress,
        Ok(None) => {
            let err = ReconcilerError::StaleKey(key.clone());
            warn!("Worker: {}, dropping", err);
            ctx.queue.forget(key);
            return ItemOutcome::Dropped;
        }
        Err(source) => {
            let err = ReconcilerError::Transient {
                key: key.clone(),
                source,
            };
            error!("Worker: {}, requeuing after rate limit", err);
            ctx.queue.add_rate_limited(key.clone());
            return ItemOutcome::Requeued;
        }
    };

    match ctx.reconciler.reconcile(&ingress).await {
        Ok(()) => {
            ctx.queue.forget(key);
            debug!("Worker: done processing {}", key);
            ItemOutcome::Reconciled
        }
        Err(e) if !e.is_retryable() => {
            warn!("Worker: {}, dropping", e);
            ctx.queue.forget(key);
            ItemOutcome::Dropped
        }
        Err(e) => {
            error!(
                "Worker: error processing {} (attempt {}), requeuing after rate limit: {}",
                key,
                ctx.queue.num_requeues(key) + 1,
                e
            );
            ctx.queue.add_rate_limited(key.clone());
            ItemOutcome::Requeued
        }
    }
}

/// Queue every ingress through the rate limiter
pub async fn resync_all(ctx: &ControllerContext) -> Result<usize> {
    let ingresses = ctx
        .ingresses
        .list()
        .await
        .context("failed to list ingresses for resync")?;
    let count = ingresses.len();
    for ingress in ingresses {
        ctx.queue.add_rate_limited(ingress.key());
    }
    info!("Resync queued {} ingress(es)", count);
    Ok(count)
}

/// Resync every configured period until shutdown
pub async fn run_resync_loop(ctx: Arc<ControllerContext>) {
    let shutdown = ctx.shutdown_token();
    loop {
        let period = ctx.config.resync_period;
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(period) => {}
        }
        if let Err(e) = resync_all(&ctx).await {
            error!("Resync failed: {:#}", e);
        }
    }
    debug!("Resync loop stopped");
}
