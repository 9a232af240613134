//! 统一错误处理
//!
//! 部署流水线的错误分类：每一类步骤失败对应一个变体，`Step` 变体在
//! 错误向调用方传播时附加失败步骤的名称

use thiserror::Error;

/// 部署错误
#[derive(Debug, Error)]
pub enum DeployError {
    /// 配置中不存在请求的服务
    #[error("service '{0}' not found in config")]
    ServiceNotFound(String),

    /// docker build 失败
    #[error("docker build failed: {detail}")]
    Build { detail: String },

    /// docker tag 失败
    #[error("docker tag failed: {detail}")]
    Tag { detail: String },

    /// registry 登录失败（本地或远程）
    #[error("registry login failed: {detail}")]
    Auth { detail: String },

    /// docker push 失败
    #[error("docker push failed: {detail}")]
    Push { detail: String },

    /// SSH 连接失败
    #[error("SSH connection failed: {0}")]
    Connection(String),

    /// 远程命令非零退出；`command` 已脱敏
    #[error("remote command failed '{command}': {detail}")]
    RemoteCommand { command: String, detail: String },

    /// 部署后状态查询失败
    #[error("verification failed: {0}")]
    Verification(String),

    /// 包装失败步骤的名称
    #[error("step '{name}' failed: {source}")]
    Step {
        name: &'static str,
        #[source]
        source: Box<DeployError>,
    },
}

impl DeployError {
    /// 用步骤名称包装底层错误
    pub fn in_step(self, name: &'static str) -> Self {
        DeployError::Step {
            name,
            source: Box::new(self),
        }
    }
}

/// 便捷类型别名
pub type DeployResult<T> = Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_not_found_display() {
        let err = DeployError::ServiceNotFound("api".to_string());
        assert_eq!(err.to_string(), "service 'api' not found in config");
    }

    #[test]
    fn test_step_wrapper_names_step_and_cause() {
        let err = DeployError::Auth {
            detail: "unauthorized".to_string(),
        }
        .in_step("Logging into registry");
        assert_eq!(
            err.to_string(),
            "step 'Logging into registry' failed: registry login failed: unauthorized"
        );
    }

    #[test]
    fn test_remote_command_display() {
        let err = DeployError::RemoteCommand {
            command: "docker pull [HOST]/api:1.0".to_string(),
            detail: "exit status 1".to_string(),
        };
        assert!(err.to_string().contains("docker pull [HOST]/api:1.0"));
        assert!(err.to_string().contains("exit status 1"));
    }
}
