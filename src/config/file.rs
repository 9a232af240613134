//! 部署配置文件
//!
//! 从 JSON 文档加载 registry、SSH 与服务配置。流水线把配置视为
//! 已验证的可信输入，除按名称查找服务外不做 schema 校验。

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// 默认 SSH 端口
const DEFAULT_SSH_PORT: u16 = 22;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0} does not exist")]
    NotFound(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 单个服务的部署配置
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service_name: String,
    pub image_name: String,
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub build_path: String,
    pub container_name: String,
    /// 原样透传给 docker run，不做校验
    #[serde(default)]
    pub docker_run_args: String,
    /// 健康检查超时（秒）。验证步骤是一次性的，该值只随日志
    /// 输出，不影响控制流；0 表示沿用配置值不做任何处理。
    #[serde(default)]
    pub health_timeout: u64,
}

/// Registry 凭据
#[derive(Clone, Debug, Deserialize)]
pub struct RegistryConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

/// 远程主机 SSH 配置
#[derive(Clone, Debug, Deserialize)]
pub struct SshConfig {
    pub host: String,
    pub username: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub key_file: String,
}

/// 完整部署配置
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub registry: RegistryConfig,
    pub ssh: SshConfig,
    pub services: HashMap<String, ServiceConfig>,
}

impl Config {
    /// 从 JSON 文件加载配置
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let data = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&data)?;

        if config.ssh.port == 0 {
            config.ssh.port = DEFAULT_SSH_PORT;
        }

        Ok(config)
    }

    /// 已配置的服务名称（排序后）
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "registry": {
            "host": "registry.example.com",
            "username": "ci-user",
            "password": "secret"
        },
        "ssh": {
            "host": "deploy.example.com",
            "username": "deploy",
            "password": "ssh-pass",
            "key_file": ""
        },
        "services": {
            "api": {
                "image_name": "api",
                "build_path": "./api",
                "container_name": "api-container",
                "docker_run_args": "-p 8080:8080 --restart always",
                "health_timeout": 30
            }
        }
    }"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_sample_config() {
        let file = write_config(SAMPLE);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.registry.host, "registry.example.com");
        assert_eq!(config.ssh.username, "deploy");
        let api = &config.services["api"];
        assert_eq!(api.image_name, "api");
        assert_eq!(api.docker_run_args, "-p 8080:8080 --restart always");
        assert_eq!(api.health_timeout, 30);
    }

    #[test]
    fn test_ssh_port_defaults_to_22() {
        let file = write_config(SAMPLE);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ssh.port, 22);
    }

    #[test]
    fn test_explicit_ssh_port_kept() {
        let file = write_config(&SAMPLE.replace("\"username\": \"deploy\",", "\"username\": \"deploy\", \"port\": 2222,"));
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ssh.port, 2222);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/deployment.config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ not json");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_service_names_sorted() {
        let extended = SAMPLE.replace(
            "\"services\": {",
            "\"services\": { \"worker\": {\"image_name\": \"worker\", \"container_name\": \"worker-container\"},",
        );
        let file = write_config(&extended);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.service_names(), vec!["api", "worker"]);
    }
}
