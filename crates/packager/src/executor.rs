//! Command execution for the external tools the packager drives.

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;
use vmbox_common::{Error, Result};

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Working directory for the child; the parent's is never changed.
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Arguments as lossy UTF-8 strings.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Human readable command line, for logs and error messages.
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in self.args_lossy() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }
}

/// How the child's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Inherit the terminal so the user sees progress as it happens.
    Stream,
    /// Collect stdout and stderr into the returned [`CommandOutput`].
    Capture,
}

/// Result of running a command. Output fields are empty in [`OutputMode::Stream`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for command execution.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a command to completion. A nonzero exit is not an error here.
    async fn execute(&self, command: &CommandSpec, mode: OutputMode) -> Result<CommandOutput>;
}

/// Run a command and turn a nonzero exit into [`Error::CommandFailed`].
pub async fn run_checked(
    executor: &dyn Executor,
    command: &CommandSpec,
    mode: OutputMode,
) -> Result<CommandOutput> {
    let output = executor.execute(command, mode).await?;
    if !output.success() {
        return Err(Error::CommandFailed {
            cmd: command.display(),
            code: output.exit_code,
        });
    }
    Ok(output)
}

/// Executor spawning processes on the local host.
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn execute(&self, command: &CommandSpec, mode: OutputMode) -> Result<CommandOutput> {
        debug!("Local exec: {}", command.display());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());
        if let Some(ref dir) = command.current_dir {
            cmd.current_dir(dir);
        }

        let spawn_error = |e: std::io::Error| Error::CommandExecution {
            cmd: command.display(),
            reason: e.to_string(),
        };

        match mode {
            OutputMode::Stream => {
                let status = cmd
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await
                    .map_err(spawn_error)?;
                Ok(CommandOutput {
                    exit_code: status.code(),
                    ..CommandOutput::default()
                })
            }
            OutputMode::Capture => {
                let output = cmd.output().await.map_err(spawn_error)?;
                Ok(CommandOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every command instead of running it.
    pub(crate) struct RecordingExecutor {
        calls: Mutex<Vec<(CommandSpec, OutputMode)>>,
        fail_matching: Option<String>,
    }

    impl RecordingExecutor {
        pub(crate) fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_matching: None,
            }
        }

        /// Commands whose line contains `pattern` exit with status 1.
        pub(crate) fn failing_on(pattern: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_matching: Some(pattern.to_string()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<(CommandSpec, OutputMode)> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn commands(&self) -> Vec<CommandSpec> {
            self.calls().into_iter().map(|(c, _)| c).collect()
        }
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        async fn execute(&self, command: &CommandSpec, mode: OutputMode) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push((command.clone(), mode));

            let failed = self
                .fail_matching
                .as_deref()
                .is_some_and(|p| command.display().contains(p));

            Ok(CommandOutput {
                exit_code: Some(if failed { 1 } else { 0 }),
                stdout: String::new(),
                stderr: if failed { "boom".to_string() } else { String::new() },
            })
        }
    }
}
