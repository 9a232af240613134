//! 部署流水线
//!
//! 十个固定步骤按顺序执行，首个失败即中止，不做任何补偿。
//! 流水线只依赖 `ContainerEngine` 与 `RemoteExecutor` 两个契约。

pub mod progress;

use tracing::{debug, error, info};

use crate::config::Config;
use crate::domain::deploy::{DeployStep, DeploymentRequest, StepKind};
use crate::domain::interfaces::{ContainerEngine, RemoteExecutor};
use crate::error::{DeployError, DeployResult};

pub use progress::{NullSink, ProgressSink, StepEvent};

/// Remote snapshot of running containers, taken once at the end of the
/// pipeline
const PS_COMMAND: &str = "docker ps --format 'table {{.Names}}\t{{.Status}}\t{{.Ports}}'";

/// 部署编排器
pub struct Deployer<E, R> {
    engine: E,
    remote: R,
    sink: Box<dyn ProgressSink>,
}

impl<E: ContainerEngine, R: RemoteExecutor> Deployer<E, R> {
    pub fn new(engine: E, remote: R, sink: Box<dyn ProgressSink>) -> Self {
        Self {
            engine,
            remote,
            sink,
        }
    }

    /// 执行一次完整部署
    ///
    /// 服务名称解析失败立即返回，不执行任何步骤；构建路径覆盖只
    /// 作用于本次部署的本地副本，不写回配置。
    pub async fn deploy(&mut self, request: &DeploymentRequest, config: &Config) -> DeployResult<()> {
        let mut service = config
            .services
            .get(&request.service_name)
            .cloned()
            .ok_or_else(|| DeployError::ServiceNotFound(request.service_name.clone()))?;

        if let Some(ref path) = request.build_path_override {
            if !path.is_empty() {
                info!(build_path = %path, "Using custom build path");
                service.build_path = path.clone();
            }
        }

        let local_image = format!("{}:{}", service.image_name, request.version);
        let registry_image = format!(
            "{}/{}:{}",
            config.registry.host, service.image_name, request.version
        );

        info!(
            service = %request.service_name,
            version = %request.version,
            dry_run = request.dry_run,
            "Starting deployment"
        );

        let total = StepKind::ALL.len();
        for (index, kind) in StepKind::ALL.into_iter().enumerate() {
            let mut step = DeployStep::new(kind);
            step.start();
            self.emit(index, total, index * 100 / total, &step);
            info!("[{}/{}] {}", index + 1, total, kind.title());

            let result = self
                .run_step(kind, request, config, &service, &local_image, &registry_image)
                .await;

            match result {
                Ok(()) => {
                    step.finish(true, None);
                    self.emit(index, total, (index + 1) * 100 / total, &step);
                    info!(
                        duration_ms = step.duration_ms.unwrap_or(0),
                        "[{}/{}] COMPLETED: {}",
                        index + 1,
                        total,
                        kind.title()
                    );
                }
                Err(e) => {
                    step.finish(false, Some(e.to_string()));
                    self.emit(index, total, index * 100 / total, &step);
                    error!(step = kind.title(), "Step failed: {}", e);
                    return Err(e.in_step(kind.title()));
                }
            }
        }

        Ok(())
    }

    fn emit(&self, index: usize, total: usize, percent: usize, step: &DeployStep) {
        self.sink.on_step(&StepEvent {
            index,
            total,
            name: step.kind.title(),
            state: step.status,
            percent: percent as u8,
            duration_ms: step.duration_ms,
            message: step.message.clone(),
        });
    }

    async fn run_step(
        &mut self,
        kind: StepKind,
        request: &DeploymentRequest,
        config: &Config,
        service: &crate::config::ServiceConfig,
        local_image: &str,
        registry_image: &str,
    ) -> DeployResult<()> {
        match kind {
            StepKind::BuildImage => {
                self.engine
                    .build(&service.image_name, &request.version, &service.build_path)
                    .await
            }
            StepKind::TagImage => self.engine.tag(local_image, registry_image).await,
            StepKind::RegistryLogin => {
                self.engine
                    .login(
                        &config.registry.host,
                        &config.registry.username,
                        &config.registry.password,
                    )
                    .await
            }
            StepKind::PushImage => self.engine.push(registry_image).await,
            StepKind::ConnectRemote => self.remote.connect(&config.ssh).await,
            StepKind::PullRemote => {
                let login = format!(
                    "docker login {} -u {} -p {}",
                    config.registry.host, config.registry.username, config.registry.password
                );
                let pull = format!("docker pull {}", registry_image);
                self.remote.run(&login).await?;
                self.remote.run(&pull).await?;
                info!(image = %registry_image, "Image pulled on remote");
                Ok(())
            }
            StepKind::StopContainer => {
                // "|| true" keeps an absent or already-stopped container
                // from failing the step. It masks other stop failures too,
                // which matches the previous tooling.
                let cmd = format!("docker stop {} || true", service.container_name);
                self.remote.run(&cmd).await?;
                info!(container = %service.container_name, "Container stopped");
                Ok(())
            }
            StepKind::RemoveContainer => {
                let cmd = format!("docker rm {} || true", service.container_name);
                self.remote.run(&cmd).await?;
                info!(container = %service.container_name, "Container removed");
                Ok(())
            }
            StepKind::RunContainer => {
                let cmd = format!(
                    "docker run -d --name {} {} {}",
                    service.container_name, service.docker_run_args, registry_image
                );
                self.remote.run(&cmd).await?;
                info!(container = %service.container_name, "Container started");
                Ok(())
            }
            StepKind::VerifyDeployment => {
                debug!(
                    health_timeout = service.health_timeout,
                    "Capturing post-deployment snapshot"
                );

                let status = self
                    .remote
                    .run_with_output(PS_COMMAND)
                    .await
                    .map_err(|e| DeployError::Verification(e.to_string()))?;
                info!("Container status:\n{}", status);

                let mount_cmd = format!(
                    "docker inspect {} --format='{{{{range .Mounts}}}}{{{{println .Source \"->\" .Destination}}}}{{{{end}}}}'",
                    service.container_name
                );
                let mounts = self
                    .remote
                    .run_with_output(&mount_cmd)
                    .await
                    .map_err(|e| DeployError::Verification(e.to_string()))?;
                info!("Container mounts:\n{}", mounts);

                Ok(())
            }
        }
    }
}
