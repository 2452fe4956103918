use std::path::PathBuf;
use std::sync::Arc;

use crate::application::messaging::replies;
use crate::domain::entities::Command;
use crate::domain::traits::{ScriptInvocation, ScriptRunner};

/// Where the external scripts live and how to start them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSettings {
    pub project_root: PathBuf,
    pub interpreter: String,
    /// Validator script, resolved against `project_root`
    pub validator: String,
    /// Repair script, passed relative to `project_root`
    pub repair: String,
}

/// Service for turning commands into script runs and reply texts
pub struct CommandService {
    runner: Arc<dyn ScriptRunner>,
    scripts: ScriptSettings,
}

impl CommandService {
    pub fn new(runner: Arc<dyn ScriptRunner>, scripts: ScriptSettings) -> Self {
        Self { runner, scripts }
    }

    /// The script call a command maps to, if any
    pub fn invocation(&self, command: &Command) -> Option<ScriptInvocation> {
        let root = &self.scripts.project_root;
        match command {
            Command::Gate { file } => {
                let validator = root.join(&self.scripts.validator);
                Some(
                    ScriptInvocation::new(&self.scripts.interpreter, root)
                        .arg(validator.display().to_string())
                        .arg(file.as_str()),
                )
            }
            Command::Repair => Some(
                ScriptInvocation::new(&self.scripts.interpreter, root).arg(self.scripts.repair.as_str()),
            ),
            Command::Unrecognized => None,
        }
    }

    /// Run the command's script and build the final reply.
    /// Script failures become failure replies; `None` means nothing to say.
    pub async fn execute(&self, command: &Command) -> Option<String> {
        let invocation = self.invocation(command)?;
        tracing::info!(command = command.name(), "Running {}", invocation);

        let result = self.runner.run(&invocation).await;
        if let Err(e) = &result {
            tracing::warn!(command = command.name(), "Script failed: {}", e);
        }

        let reply = match (command, result) {
            (Command::Gate { .. }, Ok(output)) => replies::gate_success(&output),
            (Command::Gate { .. }, Err(e)) => replies::gate_failure(&e.to_string()),
            (Command::Repair, Ok(output)) => replies::repair_success(&output),
            (Command::Repair, Err(e)) => replies::repair_failure(&e.to_string()),
            (Command::Unrecognized, _) => return None,
        };
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::ScriptError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeRunner {
        result: fn(&ScriptInvocation) -> Result<String, ScriptError>,
        calls: Mutex<Vec<ScriptInvocation>>,
    }

    #[async_trait]
    impl ScriptRunner for FakeRunner {
        async fn run(&self, invocation: &ScriptInvocation) -> Result<String, ScriptError> {
            self.calls.lock().unwrap().push(invocation.clone());
            (self.result)(invocation)
        }
    }

    fn settings() -> ScriptSettings {
        ScriptSettings {
            project_root: PathBuf::from("/srv/gate"),
            interpreter: "python3".to_string(),
            validator: "validate.py".to_string(),
            repair: "repair_loop_v3.py".to_string(),
        }
    }

    fn service(result: fn(&ScriptInvocation) -> Result<String, ScriptError>) -> (CommandService, Arc<FakeRunner>) {
        let runner = Arc::new(FakeRunner {
            result,
            calls: Mutex::new(Vec::new()),
        });
        (CommandService::new(runner.clone(), settings()), runner)
    }

    #[test]
    fn test_gate_invocation_passes_file_as_single_arg() {
        let (service, _) = service(|_| Ok(String::new()));
        let inv = service
            .invocation(&Command::Gate {
                file: "submissions/x.py".to_string(),
            })
            .unwrap();

        assert_eq!(inv.program, "python3");
        assert_eq!(inv.args, vec!["/srv/gate/validate.py", "submissions/x.py"]);
        assert_eq!(inv.working_dir, PathBuf::from("/srv/gate"));
    }

    #[test]
    fn test_repair_invocation_is_relative() {
        let (service, _) = service(|_| Ok(String::new()));
        let inv = service.invocation(&Command::Repair).unwrap();
        assert_eq!(inv.args, vec!["repair_loop_v3.py"]);
        assert_eq!(inv.working_dir, PathBuf::from("/srv/gate"));
        assert!(service.invocation(&Command::Unrecognized).is_none());
    }

    #[tokio::test]
    async fn test_gate_success_reply() {
        let (service, runner) = service(|_| Ok("OK".to_string()));
        let reply = service
            .execute(&Command::Gate {
                file: "a.py".to_string(),
            })
            .await;
        assert_eq!(reply.as_deref(), Some("🛡️ OK"));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gate_failure_reply_has_error_and_hint() {
        let (service, _) = service(|inv| {
            Err(ScriptError::Failed {
                command: inv.command_line(),
                status: Some(1),
                stderr: "SyntaxError".to_string(),
            })
        });
        let reply = service
            .execute(&Command::Gate {
                file: "a.py".to_string(),
            })
            .await
            .unwrap();
        assert!(reply.starts_with("❌ Command failed: python3 /srv/gate/validate.py a.py"));
        assert!(reply.contains("SyntaxError"));
        assert!(reply.ends_with(replies::GATE_HINT));
    }

    #[tokio::test]
    async fn test_repair_replies() {
        let (ok, _) = service(|_| Ok("fixed 3 files".to_string()));
        assert_eq!(ok.execute(&Command::Repair).await.as_deref(), Some("🔧 fixed 3 files"));

        let (failing, _) = service(|inv| {
            Err(ScriptError::Spawn {
                program: inv.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            })
        });
        let reply = failing.execute(&Command::Repair).await.unwrap();
        assert_eq!(reply, "❌ failed to spawn python3: not found");
    }

    #[tokio::test]
    async fn test_unrecognized_runs_nothing() {
        let (service, runner) = service(|_| Ok(String::new()));
        assert!(service.execute(&Command::Unrecognized).await.is_none());
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
