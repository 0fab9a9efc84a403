//! # Runtime
//!
//! Long-running controller tasks.
//!
//! - `context`: shared state and shutdown plumbing
//! - `watch`: ingress informer and event filter task
//! - `worker`: queue worker and periodic resync
//! - `initialization`: process bootstrap

pub mod context;
pub mod initialization;
pub mod watch;
pub mod worker;

pub use context::ControllerContext;
