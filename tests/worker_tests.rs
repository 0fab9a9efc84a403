//! # Worker Tests
//!
//! Per-item outcomes of the worker loop and full resyncs.

mod common;

use chrono::Duration as ChronoDuration;
use common::{default_providers, managed_ingress, tls_secret_api, FakeIngressStore, Harness};
use ingress_tls_controller::prelude::*;
use ingress_tls_controller::runtime::worker::{process_item, resync_all, run_worker, ItemOutcome};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn key(name: &str) -> ResourceKey {
    ResourceKey::new("default", name)
}

#[tokio::test(start_paused = true)]
async fn test_successful_item_is_forgotten() {
    let (providers, _, _) = default_providers();
    let harness = Harness::new(providers);
    let ingresses = Arc::new(FakeIngressStore::default());
    ingresses.insert(managed_ingress("web", &[(&["domain1"], "secret1")]));
    let ctx = harness.context(Arc::clone(&ingresses)).await;

    ctx.queue.add_rate_limited(key("web"));
    let item = ctx.queue.get().await.unwrap();
    assert_eq!(process_item(&ctx, &item).await, ItemOutcome::Reconciled);
    ctx.queue.done(&item);

    assert_eq!(ctx.queue.num_requeues(&key("web")), 0);
    assert_eq!(harness.secrets.applied_names(), ["secret1"]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_key_is_dropped_without_retry() {
    let (providers, _, _) = default_providers();
    let harness = Harness::new(providers);
    let ctx = harness.context(Arc::new(FakeIngressStore::default())).await;

    ctx.queue.add_rate_limited(key("gone"));
    let item = ctx.queue.get().await.unwrap();
    assert_eq!(process_item(&ctx, &item).await, ItemOutcome::Dropped);
    ctx.queue.done(&item);

    assert_eq!(ctx.queue.num_requeues(&key("gone")), 0);
    assert!(ctx.queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_item_is_requeued_with_backoff() {
    let (providers, _, _) = default_providers();
    let harness = Harness::new(providers);
    harness.issuer.fail.store(true, Ordering::SeqCst);
    let ingresses = Arc::new(FakeIngressStore::default());
    ingresses.insert(managed_ingress("web", &[(&["domain1"], "secret1")]));
    let ctx = harness.context(Arc::clone(&ingresses)).await;

    assert_eq!(process_item(&ctx, &key("web")).await, ItemOutcome::Requeued);
    assert_eq!(ctx.queue.num_requeues(&key("web")), 1);

    // Redelivered once the backoff elapses, and succeeds after the issuer recovers
    harness.issuer.fail.store(false, Ordering::SeqCst);
    let item = ctx.queue.get().await.unwrap();
    assert_eq!(process_item(&ctx, &item).await, ItemOutcome::Reconciled);
    ctx.queue.done(&item);
    assert_eq!(ctx.queue.num_requeues(&key("web")), 0);
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_is_requeued() {
    let (providers, _, _) = default_providers();
    let harness = Harness::new(providers);
    let ingresses = Arc::new(FakeIngressStore::default());
    ingresses.fail.store(true, Ordering::SeqCst);
    let ctx = harness.context(Arc::clone(&ingresses)).await;

    assert_eq!(process_item(&ctx, &key("web")).await, ItemOutcome::Requeued);
    assert_eq!(ctx.queue.num_requeues(&key("web")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resync_queues_every_ingress() {
    let (providers, _, _) = default_providers();
    let harness = Harness::new(providers);
    let ingresses = Arc::new(FakeIngressStore::default());
    ingresses.insert(managed_ingress("a", &[]));
    ingresses.insert(managed_ingress("b", &[]));
    let ctx = harness.context(Arc::clone(&ingresses)).await;

    assert_eq!(resync_all(&ctx).await.unwrap(), 2);
    assert_eq!(ctx.queue.num_requeues(&key("a")), 1);
    assert_eq!(ctx.queue.num_requeues(&key("b")), 1);

    let first = ctx.queue.get().await.unwrap();
    ctx.queue.done(&first);
    let second = ctx.queue.get().await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test(start_paused = true)]
async fn test_worker_exits_on_shutdown() {
    let (providers, _, _) = default_providers();
    let harness = Harness::new(providers);
    let ingresses = Arc::new(FakeIngressStore::default());
    harness.secrets.insert(tls_secret_api(
        "default",
        "secret1",
        &["domain1"],
        ChronoDuration::days(60),
    ));
    ingresses.insert(managed_ingress("web", &[(&["domain1"], "secret1")]));
    let ctx = harness.context(Arc::clone(&ingresses)).await;

    ctx.spawn(run_worker(Arc::clone(&ctx)));
    ctx.queue.add(key("web"));
    tokio::task::yield_now().await;

    ctx.shutdown();
    ctx.wait().await;
    assert!(ctx.is_shutting_down());
    assert!(harness.issuer.requests().is_empty());
}
