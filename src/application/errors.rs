//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// External script errors. The display text is what chat users see.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out after {secs}s: {command}")]
    TimedOut { command: String, secs: u64 },

    #[error("IO error while running {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_script_message_includes_stderr() {
        let err = ScriptError::Failed {
            command: "python3 validate.py \"x.py\"".to_string(),
            status: Some(1),
            stderr: "Traceback: boom\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command failed: python3 validate.py \"x.py\"\nTraceback: boom"
        );
    }

    #[test]
    fn test_failed_script_message_without_stderr() {
        let err = ScriptError::Failed {
            command: "python3 repair_loop_v3.py".to_string(),
            status: Some(2),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "Command failed: python3 repair_loop_v3.py");
    }
}
