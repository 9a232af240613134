//! 部署相关领域模型

use chrono::{DateTime, Utc};

/// 部署请求
///
/// 在入口处构造一次，由流水线消费一次
#[derive(Clone, Debug)]
pub struct DeploymentRequest {
    /// 要部署的服务名称
    pub service_name: String,
    /// 镜像版本标签
    pub version: String,
    /// 构建路径覆盖（可选，仅在本次部署内生效）
    pub build_path_override: Option<String>,
    /// 演练模式：只记录命令，不执行任何外部操作
    pub dry_run: bool,
}

/// 流水线的十个固定步骤
///
/// 顺序是硬性契约：后面的步骤假定前面的步骤已经完成。
/// `ALL` 是按顺序排列的步骤表。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    BuildImage,
    TagImage,
    RegistryLogin,
    PushImage,
    ConnectRemote,
    PullRemote,
    StopContainer,
    RemoveContainer,
    RunContainer,
    VerifyDeployment,
}

impl StepKind {
    /// 按执行顺序排列的完整步骤表
    pub const ALL: [StepKind; 10] = [
        StepKind::BuildImage,
        StepKind::TagImage,
        StepKind::RegistryLogin,
        StepKind::PushImage,
        StepKind::ConnectRemote,
        StepKind::PullRemote,
        StepKind::StopContainer,
        StepKind::RemoveContainer,
        StepKind::RunContainer,
        StepKind::VerifyDeployment,
    ];

    /// 显示名称
    pub fn title(self) -> &'static str {
        match self {
            StepKind::BuildImage => "Building Docker image",
            StepKind::TagImage => "Tagging image for registry",
            StepKind::RegistryLogin => "Logging into registry",
            StepKind::PushImage => "Pushing image to registry",
            StepKind::ConnectRemote => "Connecting to remote server",
            StepKind::PullRemote => "Pulling image on remote",
            StepKind::StopContainer => "Stopping existing container",
            StepKind::RemoveContainer => "Removing existing container",
            StepKind::RunContainer => "Running new container",
            StepKind::VerifyDeployment => "Verifying container mounts",
        }
    }
}

/// 步骤状态
///
/// 每个步骤一旦开始就一定执行到底，没有 Skipped 状态；
/// Failed 对整条流水线是终态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// 单个步骤的执行记录
#[derive(Clone, Debug)]
pub struct DeployStep {
    /// 步骤标识
    pub kind: StepKind,
    /// 开始时间
    pub started_at: Option<DateTime<Utc>>,
    /// 结束时间
    pub finished_at: Option<DateTime<Utc>>,
    /// 持续时间（毫秒）
    pub duration_ms: Option<i64>,
    /// 步骤状态
    pub status: StepStatus,
    /// 附加信息（失败原因）
    pub message: Option<String>,
}

impl DeployStep {
    /// 创建新的待执行步骤
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            status: StepStatus::Pending,
            message: None,
        }
    }

    /// 开始执行步骤
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
        self.status = StepStatus::Running;
    }

    /// 完成步骤
    pub fn finish(&mut self, success: bool, message: Option<String>) {
        let now = Utc::now();
        self.finished_at = Some(now);
        self.status = if success {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed
        };
        self.message = message;
        if let Some(started) = self.started_at {
            self.duration_ms = Some((now - started).num_milliseconds());
        }
    }
}
