//! 能力契约
//!
//! 流水线只依赖这两个 trait，不依赖具体实现。真实实现见
//! `infra::docker` 和 `infra::ssh`，测试用的记录型假实现见
//! `services::deploy` 的测试模块。

use async_trait::async_trait;

use crate::config::SshConfig;
use crate::error::DeployResult;

/// 本地镜像构建与 registry 操作
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// 构建镜像，输出标签为 `image_name:version`。
    ///
    /// `build_path` 为空视为"无需构建"，成功返回；相对路径
    /// 相对当前工作目录解析。
    async fn build(&self, image_name: &str, version: &str, build_path: &str) -> DeployResult<()>;

    /// 给本地镜像追加 registry 引用
    async fn tag(&self, local_image: &str, registry_image: &str) -> DeployResult<()>;

    /// 登录 registry；密码不得出现在任何日志中
    async fn login(&self, host: &str, username: &str, password: &str) -> DeployResult<()>;

    /// 推送镜像；进度直接流向终端，不捕获
    async fn push(&self, registry_image: &str) -> DeployResult<()>;
}

/// 远程命令执行
///
/// 每次部署只建立一个逻辑连接；每条命令打开并关闭一个独立的
/// 传输通道，命令之间不保留 shell 状态。
#[async_trait]
pub trait RemoteExecutor: Send {
    /// 建立连接并记录会话上下文；拨号受 30 秒超时约束
    async fn connect(&mut self, target: &SshConfig) -> DeployResult<()>;

    /// 执行命令，丢弃输出；非零退出视为失败
    async fn run(&mut self, command: &str) -> DeployResult<()>;

    /// 执行命令并捕获输出。stderr 非空时以分隔符追加到结果，
    /// 但只有非零退出才算失败。
    async fn run_with_output(&mut self, command: &str) -> DeployResult<String>;
}
