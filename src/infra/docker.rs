//! Local docker client operations
//!
//! Shells out to the `docker` CLI for build, tag, login and push. Every
//! operation honors the dry-run flag fixed at construction: the command is
//! echoed and nothing is executed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::domain::interfaces::ContainerEngine;
use crate::error::{DeployError, DeployResult};

/// Real `ContainerEngine` backed by the local docker CLI
pub struct DockerCli {
    dry_run: bool,
}

impl DockerCli {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

/// Resolve a build path to an absolute directory, relative paths are
/// interpreted against the current working directory.
fn resolve_build_dir(build_path: &str) -> std::io::Result<PathBuf> {
    let path = Path::new(build_path);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Combine captured stdout and stderr into one failure detail string
fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    text
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn build(&self, image_name: &str, version: &str, build_path: &str) -> DeployResult<()> {
        if build_path.is_empty() {
            warn!("No build path specified, skipping build step");
            return Ok(());
        }

        let build_dir = resolve_build_dir(build_path).map_err(|e| DeployError::Build {
            detail: format!("failed to resolve build path: {}", e),
        })?;

        let image_tag = format!("{}:{}", image_name, version);
        info!(build_dir = %build_dir.display(), "Building in: {}", build_dir.display());
        info!(">>> docker build -t {} .", image_tag);

        if self.dry_run {
            return Ok(());
        }

        let output = Command::new("docker")
            .args(["build", "-t", &image_tag, "."])
            .current_dir(&build_dir)
            .output()
            .await
            .map_err(|e| DeployError::Build {
                detail: format!("failed to run docker build: {}", e),
            })?;

        if !output.status.success() {
            let detail = combined_output(&output.stdout, &output.stderr);
            error!("Build output: {}", detail);
            return Err(DeployError::Build { detail });
        }

        info!(image = %image_tag, "Image built: {}", image_tag);
        Ok(())
    }

    async fn tag(&self, local_image: &str, registry_image: &str) -> DeployResult<()> {
        info!(">>> docker tag {} {}", local_image, registry_image);

        if self.dry_run {
            return Ok(());
        }

        let output = Command::new("docker")
            .args(["tag", local_image, registry_image])
            .output()
            .await
            .map_err(|e| DeployError::Tag {
                detail: format!("failed to run docker tag: {}", e),
            })?;

        if !output.status.success() {
            let detail = combined_output(&output.stdout, &output.stderr);
            error!("Tag output: {}", detail);
            return Err(DeployError::Tag { detail });
        }

        info!("Tagged: {} -> {}", local_image, registry_image);
        Ok(())
    }

    async fn login(&self, host: &str, username: &str, password: &str) -> DeployResult<()> {
        // The password goes only to the child process, never to a log line
        info!(">>> docker login {} -u {} -p [HIDDEN]", host, username);

        if self.dry_run {
            return Ok(());
        }

        let output = Command::new("docker")
            .args(["login", host, "-u", username, "-p", password])
            .output()
            .await
            .map_err(|e| DeployError::Auth {
                detail: format!("failed to run docker login: {}", e),
            })?;

        if !output.status.success() {
            let detail = combined_output(&output.stdout, &output.stderr);
            error!("Login output: {}", detail);
            return Err(DeployError::Auth { detail });
        }

        info!(registry = %host, "Logged into registry: {}", host);
        Ok(())
    }

    async fn push(&self, registry_image: &str) -> DeployResult<()> {
        info!(">>> docker push {}", registry_image);

        if self.dry_run {
            return Ok(());
        }

        // Push progress is high-volume and not worth retaining; stream it
        // straight to the controlling terminal instead of capturing
        let status = Command::new("docker")
            .args(["push", registry_image])
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DeployError::Push {
                detail: format!("failed to run docker push: {}", e),
            })?;

        if !status.success() {
            return Err(DeployError::Push {
                detail: format!("exit status {}", status.code().unwrap_or(-1)),
            });
        }

        info!(image = %registry_image, "Pushed: {}", registry_image);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_build_dir() {
        let dir = resolve_build_dir("/custom/path").unwrap();
        assert_eq!(dir, PathBuf::from("/custom/path"));
    }

    #[test]
    fn test_resolve_relative_build_dir() {
        let dir = resolve_build_dir("api").unwrap();
        assert_eq!(dir, std::env::current_dir().unwrap().join("api"));
    }

    #[test]
    fn test_combined_output_joins_both_streams() {
        let text = combined_output(b"step 1/4 : FROM alpine\n", b"error: no space left\n");
        assert_eq!(text, "step 1/4 : FROM alpine\nerror: no space left");
    }

    #[test]
    fn test_combined_output_stderr_only() {
        let text = combined_output(b"", b"denied: access forbidden\n");
        assert_eq!(text, "denied: access forbidden");
    }

    #[test]
    fn test_combined_output_stdout_only() {
        let text = combined_output(b"already exists\n", b"");
        assert_eq!(text, "already exists");
    }

    #[tokio::test]
    async fn test_empty_build_path_is_noop() {
        let cli = DockerCli::new(false);
        cli.build("api", "1.0.0", "").await.unwrap();
    }

    #[tokio::test]
    async fn test_dry_run_never_invokes_docker() {
        // Would fail against a real daemon: the image does not exist
        let cli = DockerCli::new(true);
        cli.build("api", "1.0.0", "./api").await.unwrap();
        cli.tag("api:1.0.0", "registry.example.com/api:1.0.0")
            .await
            .unwrap();
        cli.login("registry.example.com", "ci-user", "secret")
            .await
            .unwrap();
        cli.push("registry.example.com/api:1.0.0").await.unwrap();
    }
}
