//! Configuration system for the Forge API bridge.
//!
//! Provides TOML-based configuration with:
//! - `[api]`: backend base URL, timeouts and transport retries
//! - `[auth]`: token refresh thresholds and authentication endpoint paths
//! - `[session]`: where the CLI keeps its session between invocations
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigDiscovery, ConfigLayer, ConfigSource, LayerStatus, LoadedConfig,
    load_config, read_config_file, user_config_dir,
};
pub use error::{ConfigError, Result};
pub use types::*;
