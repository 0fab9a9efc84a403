//! # Context
//!
//! Everything the controller tasks share: configuration, the work queue,
//! the reconciler, the ingress store and the shutdown plumbing.

use crate::config::SharedControllerConfig;
use crate::constants::QUEUE_NAME;
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::Reconciler;
use crate::ingress::ResourceKey;
use crate::store::IngressStore;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

pub struct ControllerContext {
    pub config: SharedControllerConfig,
    pub queue: WorkQueue<ResourceKey>,
    pub reconciler: Reconciler,
    pub ingresses: Arc<dyn IngressStore>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl std::fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("queue_len", &self.queue.len())
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ControllerContext {
    /// Build a context whose queue uses the configured backoff settings
    pub fn new(
        config: SharedControllerConfig,
        reconciler: Reconciler,
        ingresses: Arc<dyn IngressStore>,
        shutdown: CancellationToken,
    ) -> Self {
        let queue = WorkQueue::new(
            QUEUE_NAME,
            config.queue_base_delay,
            config.queue_max_delay,
            config.backoff_multiplier,
        );

        Self {
            config,
            queue,
            reconciler,
            ingresses,
            shutdown,
            tasks: TaskTracker::new(),
        }
    }

    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Spawn a task that `wait` will join
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Signal every task to stop and shut the queue down
    pub fn shutdown(&self) {
        info!("Shutting down controller tasks");
        self.shutdown.cancel();
        self.queue.shutdown();
    }

    /// Wait for every spawned task to finish
    pub async fn wait(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }
}
