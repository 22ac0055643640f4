//! Shared runtime plumbing: layered configuration and logging bootstrap.

pub mod config;
pub mod logging;

pub use config::{
    default_logging_config, AppConfig, AppConfigProvider, ConfigProvider, LoggingConfig, Section,
};
pub use logging::init_logging_from_config;
