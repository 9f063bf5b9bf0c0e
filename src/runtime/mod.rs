//! Container runtime boundary.
//!
//! Every interaction with the container runtime goes through a
//! [`CommandRunner`], which executes one external command and returns its
//! raw output. [`ProcessRunner`] is the real implementation; tests swap in a
//! scripted runner.
//!
//! [`ContainerRuntime`] knows the runtime CLI's argument vocabulary (`run`,
//! `exec`, `kill`, `image inspect`, `rmi`, `ps`, `system prune`) and
//! [`ContainerSession`] owns one disposable container.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imagescan::runtime::{ContainerRuntime, ContainerSession, ProcessRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), imagescan::ScanError> {
//!     let runtime = ContainerRuntime::new(Arc::new(ProcessRunner), "docker");
//!     let session = ContainerSession::open(&runtime, "alpine:3.19").await?;
//!     let output = session.exec(&["cat", "/etc/os-release"]).await;
//!     session.close().await;
//!     println!("{}", output?.stdout_lossy());
//!     Ok(())
//! }
//! ```

mod session;

pub use session::ContainerSession;

use crate::error::ScanError;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Raw result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Executes an external command and collects its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, waiting at most `timeout` when given.
    ///
    /// A non-zero exit status is not an error; callers inspect
    /// [`CommandOutput::exit_code`] when it matters.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::CommandExecution`] if the process cannot be
    /// spawned and [`ScanError::CommandTimeout`] if it outlives `timeout`.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, ScanError>;
}

/// Runs commands as child processes.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, ScanError> {
        tracing::trace!(program, ?args, "running command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::CommandExecution {
                program: program.to_owned(),
                reason: e.to_string(),
            })?;

        let wait = child.wait_with_output();
        let output = match timeout {
            // Dropping the timed-out future drops the child, which kills it.
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                ScanError::CommandTimeout {
                    program: program.to_owned(),
                    timeout: limit,
                }
            })?,
            None => wait.await,
        }
        .map_err(|e| ScanError::CommandExecution {
            program: program.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }
}

/// Default keep-alive for a disposable container, in seconds.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;

/// Container runtime CLI (docker or a compatible binary).
pub struct ContainerRuntime {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    keep_alive: Duration,
    exec_timeout: Option<Duration>,
    start_timeout: Option<Duration>,
}

impl ContainerRuntime {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
            exec_timeout: None,
            start_timeout: None,
        }
    }

    /// Sets how long a disposable container may live before it exits on its own.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Bounds every command run inside a container.
    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = Some(timeout);
        self
    }

    /// Bounds container start, which may include pulling the image.
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn invoke(&self, args: Vec<String>, timeout: Option<Duration>) -> Result<CommandOutput, ScanError> {
        self.runner.run(&self.binary, &args, timeout).await
    }

    /// Starts a detached, self-removing container that sleeps for the keep-alive.
    ///
    /// Returns the runtime-assigned container id.
    pub async fn run_detached(&self, image: &str) -> Result<String, ScanError> {
        let args = vec![
            "run".to_owned(),
            "-d".to_owned(),
            "--rm".to_owned(),
            "--entrypoint".to_owned(),
            "sleep".to_owned(),
            image.to_owned(),
            self.keep_alive.as_secs().to_string(),
        ];
        let output = self.invoke(args, self.start_timeout).await?;

        let id = output.stdout_lossy().trim().to_owned();
        if !output.success() || id.is_empty() {
            return Err(ScanError::SessionStart {
                image: image.to_owned(),
                reason: output.stderr_lossy().trim().to_owned(),
            });
        }
        Ok(id)
    }

    /// Runs `argv` inside a running container.
    pub async fn exec(&self, container: &str, argv: &[&str]) -> Result<CommandOutput, ScanError> {
        let mut args = vec!["exec".to_owned(), container.to_owned()];
        args.extend(argv.iter().map(|a| (*a).to_owned()));
        self.invoke(args, self.exec_timeout).await
    }

    pub async fn kill(&self, container: &str) -> Result<CommandOutput, ScanError> {
        self.invoke(vec!["kill".to_owned(), container.to_owned()], None)
            .await
    }

    pub async fn inspect_image(&self, image: &str) -> Result<CommandOutput, ScanError> {
        self.invoke(
            vec!["image".to_owned(), "inspect".to_owned(), image.to_owned()],
            None,
        )
        .await
    }

    /// Ids of running containers whose ancestor is `image`.
    pub async fn running_descendants(&self, image: &str) -> Result<Vec<String>, ScanError> {
        let args = vec![
            "ps".to_owned(),
            "--filter".to_owned(),
            format!("ancestor={image}"),
            "--quiet".to_owned(),
        ];
        let output = self.invoke(args, None).await?;
        if !output.success() {
            return Err(ScanError::CommandExecution {
                program: self.binary.clone(),
                reason: output.stderr_lossy().trim().to_owned(),
            });
        }

        Ok(output
            .stdout_lossy()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }

    pub async fn remove_image(&self, image: &str) -> Result<CommandOutput, ScanError> {
        self.invoke(
            vec!["rmi".to_owned(), image.to_owned(), "--force".to_owned()],
            None,
        )
        .await
    }

    /// Prunes stopped containers, unused networks, build cache and volumes.
    pub async fn system_prune(&self) -> Result<CommandOutput, ScanError> {
        self.invoke(
            vec![
                "system".to_owned(),
                "prune".to_owned(),
                "-af".to_owned(),
                "--volumes".to_owned(),
            ],
            None,
        )
        .await
    }
}
