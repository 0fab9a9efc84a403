//! # Controller
//!
//! Core controller modules.
//!
//! - `backoff`: exponential backoff and per-key rate limiting
//! - `events`: watch event filter
//! - `queue`: rate-limited deduplicating work queue
//! - `reconciler`: reconciliation of a single ingress
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod events;
pub mod queue;
pub mod reconciler;
pub mod server;
