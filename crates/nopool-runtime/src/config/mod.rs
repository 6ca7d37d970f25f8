//! Configuration module for the nopool runtime.
//!
//! Loads layered configuration with figment and validates it before the
//! transport is built.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, LogFormat, LogOutput, LogRotation, LoggingConfig, NoPoolConfig, SpanEventConfig,
    TransportConfig,
};
pub use validation::validate_config;
