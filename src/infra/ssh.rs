//! SSH remote execution client
//!
//! One logical connection per deployment: `connect` dials and authenticates
//! once, then every command runs on a fresh channel of that connection. No
//! shell state survives between commands.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::ChannelMsg;
use tracing::info;

use crate::config::SshConfig;
use crate::domain::interfaces::RemoteExecutor;
use crate::error::{DeployError, DeployResult};

/// Fixed bound on the dial attempt. Command execution itself is unbounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Placeholder returned by output-capturing commands in dry-run mode
pub const DRY_RUN_OUTPUT: &str = "DRY RUN: Command would be executed";

struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Host key verification follows the trust model of the deployment
        // network, same as the previous tooling
        Ok(true)
    }
}

/// Real `RemoteExecutor` backed by a russh client connection
pub struct SshSession {
    dry_run: bool,
    /// Target host recorded at connect time, used to redact log output
    host: Option<String>,
    handle: Option<Handle<ClientHandler>>,
}

impl SshSession {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            host: None,
            handle: None,
        }
    }
}

/// Redact secrets from a command before it reaches any log or error text:
/// the target host becomes `[HOST]`, and the credential in a remote
/// `docker login` becomes `[HIDDEN]`. `-p` outside a login command (port
/// mappings) is left alone.
fn redact(command: &str, host: Option<&str>) -> String {
    let mut out = command.to_string();
    if let Some(host) = host {
        if !host.is_empty() {
            out = out.replace(host, "[HOST]");
        }
    }
    if out.starts_with("docker login") {
        if let Some(pos) = out.find(" -p ") {
            let start = pos + " -p ".len();
            let end = out[start..]
                .find(' ')
                .map(|i| start + i)
                .unwrap_or(out.len());
            out.replace_range(start..end, "[HIDDEN]");
        }
    }
    out
}

#[async_trait]
impl RemoteExecutor for SshSession {
    async fn connect(&mut self, target: &SshConfig) -> DeployResult<()> {
        info!(
            port = target.port,
            "Connecting to: {}@[HOST]:{}", target.username, target.port
        );

        // Record the host for redaction before any network I/O so dry-run
        // log lines are redacted too
        self.host = Some(target.host.clone());

        if self.dry_run {
            return Ok(());
        }

        let config = Arc::new(client::Config::default());
        let mut handle = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client::connect(config, (target.host.as_str(), target.port), ClientHandler),
        )
        .await
        .map_err(|_| {
            DeployError::Connection(format!(
                "dial timed out after {}s",
                CONNECT_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| DeployError::Connection(e.to_string()))?;

        // Password auth is preferred, key file is the fallback
        let mut authenticated = false;
        if !target.password.is_empty() {
            authenticated = handle
                .authenticate_password(target.username.as_str(), target.password.as_str())
                .await
                .map_err(|e| DeployError::Connection(e.to_string()))?;
        }
        if !authenticated && !target.key_file.is_empty() {
            let key = russh_keys::load_secret_key(&target.key_file, None).map_err(|e| {
                DeployError::Connection(format!("unable to load private key: {}", e))
            })?;
            authenticated = handle
                .authenticate_publickey(target.username.as_str(), Arc::new(key))
                .await
                .map_err(|e| DeployError::Connection(e.to_string()))?;
        }
        if !authenticated {
            return Err(DeployError::Connection(
                "authentication rejected by remote host".to_string(),
            ));
        }

        self.handle = Some(handle);
        info!("SSH connection established");
        Ok(())
    }

    async fn run(&mut self, command: &str) -> DeployResult<()> {
        self.run_with_output(command).await.map(|_| ())
    }

    async fn run_with_output(&mut self, command: &str) -> DeployResult<String> {
        let redacted = redact(command, self.host.as_deref());
        info!("Remote command: {}", redacted);

        if self.dry_run {
            return Ok(DRY_RUN_OUTPUT.to_string());
        }

        let handle = self.handle.as_mut().ok_or_else(|| DeployError::RemoteCommand {
            command: redacted.clone(),
            detail: "no active SSH session".to_string(),
        })?;

        let mut channel =
            handle
                .channel_open_session()
                .await
                .map_err(|e| DeployError::RemoteCommand {
                    command: redacted.clone(),
                    detail: e.to_string(),
                })?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| DeployError::RemoteCommand {
                command: redacted.clone(),
                detail: e.to_string(),
            })?;

        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let mut exit_status: Option<u32> = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext: 1 } => stderr.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        command_result(redacted, &stdout, &stderr, exit_status)
    }
}

/// Turn the captured streams and exit status into the command result.
/// Noise on stderr is common (docker warnings); it is surfaced after a
/// separator, but only the exit status decides failure.
fn command_result(
    command: String,
    stdout: &[u8],
    stderr: &[u8],
    exit_status: Option<u32>,
) -> DeployResult<String> {
    let mut output = String::from_utf8_lossy(stdout).to_string();
    if !stderr.is_empty() {
        output.push_str("\nSTDERR: ");
        output.push_str(&String::from_utf8_lossy(stderr));
    }

    match exit_status {
        Some(0) => Ok(output),
        Some(code) => Err(DeployError::RemoteCommand {
            command,
            detail: format!("exit status {}: {}", code, output.trim()),
        }),
        None => Err(DeployError::RemoteCommand {
            command,
            detail: "channel closed without exit status".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_replaces_host() {
        let out = redact("docker pull registry.example.com/api:1.0", Some("registry.example.com"));
        assert_eq!(out, "docker pull [HOST]/api:1.0");
    }

    #[test]
    fn test_redact_masks_login_password() {
        let out = redact(
            "docker login registry.example.com -u ci-user -p s3cret",
            Some("deploy.example.com"),
        );
        assert_eq!(out, "docker login registry.example.com -u ci-user -p [HIDDEN]");
    }

    #[test]
    fn test_redact_leaves_port_mappings_alone() {
        let out = redact(
            "docker run -d --name api -p 8080:8080 img:1.0",
            Some("deploy.example.com"),
        );
        assert_eq!(out, "docker run -d --name api -p 8080:8080 img:1.0");
    }

    #[test]
    fn test_redact_without_session_context() {
        let out = redact("docker stop api || true", None);
        assert_eq!(out, "docker stop api || true");
    }

    #[test]
    fn test_stderr_is_appended_without_failing() {
        let output = command_result(
            "docker ps".to_string(),
            b"NAMES  STATUS\n",
            b"WARNING: insecure registry\n",
            Some(0),
        )
        .unwrap();
        assert!(output.starts_with("NAMES  STATUS"));
        assert!(output.contains("\nSTDERR: WARNING: insecure registry"));
    }

    #[test]
    fn test_clean_exit_returns_stdout_only() {
        let output = command_result("docker ps".to_string(), b"NAMES\n", b"", Some(0)).unwrap();
        assert_eq!(output, "NAMES\n");
    }

    #[test]
    fn test_nonzero_exit_fails_command() {
        let err = command_result(
            "docker pull [HOST]/api:1.0".to_string(),
            b"",
            b"manifest unknown\n",
            Some(1),
        )
        .unwrap_err();
        match err {
            DeployError::RemoteCommand { command, detail } => {
                assert_eq!(command, "docker pull [HOST]/api:1.0");
                assert!(detail.contains("exit status 1"));
                assert!(detail.contains("manifest unknown"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_exit_status_fails_command() {
        let err = command_result("docker ps".to_string(), b"partial", b"", None).unwrap_err();
        match err {
            DeployError::RemoteCommand { detail, .. } => {
                assert!(detail.contains("channel closed without exit status"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_dry_run_requires_no_connection() {
        let mut session = SshSession::new(true);
        session.run("docker stop api || true").await.unwrap();
        let output = session.run_with_output("docker ps").await.unwrap();
        assert_eq!(output, DRY_RUN_OUTPUT);
    }

    #[tokio::test]
    async fn test_live_run_without_connect_fails() {
        let mut session = SshSession::new(false);
        let err = session.run("docker ps").await.unwrap_err();
        match err {
            DeployError::RemoteCommand { detail, .. } => {
                assert!(detail.contains("no active SSH session"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
