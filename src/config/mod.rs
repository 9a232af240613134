//! 部署配置加载

pub mod file;

pub use file::{Config, ConfigError, RegistryConfig, ServiceConfig, SshConfig};
