//! # Configuration
//!
//! Controller configuration loaded from environment variables.
//!
//! - `controller`: validated controller settings (`ControllerConfig`)
//! - `duration`: duration string parsing shared by the settings

pub mod controller;
pub mod duration;

pub use controller::{ConfigError, ControllerConfig, LogFormat};
pub use duration::parse_duration;

use std::sync::Arc;

/// Controller configuration shared between tasks; read-only after startup
pub type SharedControllerConfig = Arc<ControllerConfig>;

/// Wrap a loaded configuration for sharing between tasks
#[must_use]
pub fn create_shared_config(config: ControllerConfig) -> SharedControllerConfig {
    Arc::new(config)
}
