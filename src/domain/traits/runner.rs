use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

use crate::application::errors::ScriptError;

/// A fully-resolved external script call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ScriptInvocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Shell-like rendering used in logs and failure messages
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
                line.push('"');
                line.push_str(&arg.replace('"', "\\\""));
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for ScriptInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Runs external scripts and captures their stdout
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Stdout as text on exit code 0, an error otherwise.
    async fn run(&self, invocation: &ScriptInvocation) -> Result<String, ScriptError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_quotes_spaced_args() {
        let inv = ScriptInvocation::new("python3", "/srv")
            .arg("/srv/validate.py")
            .arg("my file.py");
        assert_eq!(inv.command_line(), "python3 /srv/validate.py \"my file.py\"");
    }
}
