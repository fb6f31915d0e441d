//! Configuration for containers, logging and the demo feed.
//!
//! Loaded from TOML; every section and field has a default, so an empty or
//! missing file is valid.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{Config, ContainerConfig, DemoConfig, LoggingConfig};
