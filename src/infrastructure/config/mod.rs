//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::messaging::{DispatchSettings, DEFAULT_SUBMISSION};
use crate::application::services::{ReconnectPolicy, ScriptSettings};

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub session: SessionConfig,
    pub bridge: BridgeConfig,
    pub scripts: ScriptsConfig,
    pub reconnect: ReconnectConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
}

/// Which transport to use
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    /// WhatsApp Web through the sidecar bridge process
    Bridge,
    /// stdin/stdout, for local development
    Console,
}

impl std::str::FromStr for AdapterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bridge" => Ok(AdapterKind::Bridge),
            "console" => Ok(AdapterKind::Console),
            other => Err(ConfigError::InvalidValue(format!("unknown adapter: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    pub adapter: AdapterKind,
    /// Credential folder, relative paths resolve against the working directory
    pub auth_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptsConfig {
    /// Defaults to the parent of the executable's directory
    pub project_root: Option<PathBuf>,
    pub interpreter: String,
    pub validator: String,
    pub repair: String,
    pub default_submission: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DispatchConfig {
    pub max_concurrent_jobs: usize,
    pub one_job_per_sender: bool,
    pub process_whole_batch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "gate-bot".to_string(),
            },
            session: SessionConfig {
                adapter: AdapterKind::Bridge,
                auth_dir: PathBuf::from("auth_info"),
            },
            bridge: BridgeConfig {
                command: "node".to_string(),
                args: vec!["whatsapp-bot/bridge.js".to_string()],
                working_dir: None,
            },
            scripts: ScriptsConfig {
                project_root: None,
                interpreter: "python3".to_string(),
                validator: "validate.py".to_string(),
                repair: "repair_loop_v3.py".to_string(),
                default_submission: DEFAULT_SUBMISSION.to_string(),
                timeout_seconds: None,
            },
            reconnect: ReconnectConfig {
                initial_delay_ms: 500,
                max_delay_ms: 60_000,
                jitter: true,
                max_attempts: None,
            },
            dispatch: DispatchConfig {
                max_concurrent_jobs: 2,
                one_job_per_sender: true,
                process_whole_batch: false,
            },
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// File if it exists, defaults otherwise; environment overrides on top.
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GATE_BOT_*` overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(adapter) = lookup("GATE_BOT_ADAPTER") {
            self.session.adapter = adapter.parse()?;
        }
        if let Some(dir) = lookup("GATE_BOT_AUTH_DIR") {
            self.session.auth_dir = PathBuf::from(dir);
        }
        if let Some(root) = lookup("GATE_BOT_PROJECT_ROOT") {
            self.scripts.project_root = Some(PathBuf::from(root));
        }
        if let Some(interpreter) = lookup("GATE_BOT_INTERPRETER") {
            self.scripts.interpreter = interpreter;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.max_concurrent_jobs == 0 {
            return Err(ConfigError::InvalidValue(
                "dispatch.max-concurrent-jobs must be at least 1".to_string(),
            ));
        }
        if self.reconnect.initial_delay_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "reconnect.initial-delay-ms must be at least 1".to_string(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(ConfigError::InvalidValue(
                "reconnect.max-delay-ms must not be below reconnect.initial-delay-ms".to_string(),
            ));
        }
        if self.scripts.interpreter.trim().is_empty() {
            return Err(ConfigError::MissingField("scripts.interpreter".to_string()));
        }
        if self.session.adapter == AdapterKind::Bridge && self.bridge.command.trim().is_empty() {
            return Err(ConfigError::MissingField("bridge.command".to_string()));
        }
        Ok(())
    }

    /// Configured root, else the parent of the executable's directory.
    pub fn project_root(&self) -> Result<PathBuf, ConfigError> {
        if let Some(root) = &self.scripts.project_root {
            return Ok(root.clone());
        }
        let exe = std::env::current_exe()
            .map_err(|e| ConfigError::InvalidValue(format!("cannot locate executable: {}", e)))?;
        exe.parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .ok_or_else(|| ConfigError::MissingField("scripts.project-root".to_string()))
    }

    pub fn script_settings(&self) -> Result<ScriptSettings, ConfigError> {
        Ok(ScriptSettings {
            project_root: self.project_root()?,
            interpreter: self.scripts.interpreter.clone(),
            validator: self.scripts.validator.clone(),
            repair: self.scripts.repair.clone(),
        })
    }

    pub fn script_timeout(&self) -> Option<Duration> {
        self.scripts.timeout_seconds.map(Duration::from_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
            max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            jitter: self.reconnect.jitter,
            max_attempts: self.reconnect.max_attempts,
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_concurrent_jobs: self.dispatch.max_concurrent_jobs,
            one_job_per_sender: self.dispatch.one_job_per_sender,
            process_whole_batch: self.dispatch.process_whole_batch,
        }
    }
}
