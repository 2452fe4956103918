//! Subprocess runner for the validator and repair scripts

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::application::errors::ScriptError;
use crate::domain::traits::{ScriptInvocation, ScriptRunner};

/// Runs scripts with `tokio::process`, capturing stdout and stderr
#[derive(Debug, Clone, Default)]
pub struct ProcessScriptRunner {
    timeout: Option<Duration>,
}

impl ProcessScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill scripts that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ScriptRunner for ProcessScriptRunner {
    async fn run(&self, invocation: &ScriptInvocation) -> Result<String, ScriptError> {
        let command = invocation.command_line();
        tracing::debug!(cwd = %invocation.working_dir.display(), "Spawning {}", command);

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScriptError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    return Err(ScriptError::TimedOut {
                        command,
                        secs: limit.as_secs(),
                    })
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ScriptError::Io {
            command: command.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(ScriptError::Failed {
                command,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}
