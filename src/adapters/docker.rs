use crate::config::RuntimeConfig;
use crate::domain::model::ContainerSpec;
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::RuntimeError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// 透過 `docker` 指令操作本機容器執行環境
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            &config.binary,
            Duration::from_secs(config.command_timeout_secs),
        )
    }

    /// 執行指令並回傳 stdout；逾時會終止子行程
    async fn run(&self, args: &[&str]) -> Result<String, RuntimeError> {
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        tracing::debug!("Running container runtime command: {}", command);

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?,
            Err(_) => {
                return Err(RuntimeError::Timeout {
                    command,
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn published_ports(&self) -> Result<String, RuntimeError> {
        self.run(&["ps", "--format", "{{.Ports}}"]).await
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        let mapping = spec.port_mapping();
        self.run(&["run", "-d", "--name", &spec.name, "-p", &mapping, &spec.image])
            .await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(&["rm", "-f", name]).await?;
        Ok(())
    }
}
