//! WhatsApp Web adapter backed by a sidecar bridge process.
//!
//! The sidecar owns the chat protocol; this side spawns it, feeds it the
//! saved credentials and exchanges JSON lines over its stdin/stdout.

pub mod protocol;

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::MessageKey;
use crate::domain::traits::{Bot, BotInfo, Connection, Connector, SessionEvent};
use protocol::{decode_line, encode, Decoded, SidecarCommand, WaKey};

/// How to start the sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Exported to the sidecar as `GATE_BOT_AUTH_DIR`
    pub auth_dir: PathBuf,
}

/// Outbound side: queues `send` lines for the sidecar's stdin
pub struct BridgeBot {
    outbound: mpsc::UnboundedSender<String>,
    info: BotInfo,
}

impl BridgeBot {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            outbound,
            info: BotInfo {
                id: "whatsapp".to_string(),
                name: "gate-bot".to_string(),
                platform: "whatsapp-web".to_string(),
            },
        }
    }

    fn push(&self, command: &SidecarCommand) -> Result<(), BotError> {
        let line = encode(command)?;
        self.outbound
            .send(line)
            .map_err(|_| BotError::Connection("bridge process is gone".to_string()))
    }
}

#[async_trait]
impl Bot for BridgeBot {
    async fn send_reply(&self, to: &str, text: &str, quoted: &MessageKey) -> Result<String, BotError> {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(to, request_id = %id, "Sending reply: {}", text.chars().take(100).collect::<String>());
        self.push(&SidecarCommand::Send {
            id: id.clone(),
            jid: to.to_string(),
            text: text.to_string(),
            quoted: WaKey::from(quoted),
        })?;
        Ok(id)
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

/// A live sidecar session
pub struct BridgeConnection<R> {
    lines: Lines<R>,
    bot: Arc<BridgeBot>,
    // Held so the process lives as long as the connection; killed on drop.
    _child: Option<Child>,
}

impl<R: AsyncBufRead + Unpin + Send> BridgeConnection<R> {
    pub fn new(reader: R, bot: Arc<BridgeBot>, child: Option<Child>) -> Self {
        Self {
            lines: reader.lines(),
            bot,
            _child: child,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Connection for BridgeConnection<R> {
    async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Bridge closed its output");
                    return None;
                }
                Err(e) => {
                    tracing::warn!("Failed to read from bridge: {}", e);
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match decode_line(&line) {
                Ok(Decoded::Event(event)) => return Some(event),
                Ok(Decoded::SendResult { id, ok, error }) => {
                    if ok {
                        tracing::debug!(request_id = %id, "Reply delivered");
                    } else {
                        tracing::warn!(request_id = %id, ?error, "Reply failed");
                    }
                }
                Ok(Decoded::Nothing) => {}
                Err(e) => {
                    tracing::warn!("Skipping bridge line ({}): {}", e, line.chars().take(200).collect::<String>());
                }
            }
        }
    }

    fn bot(&self) -> Arc<dyn Bot> {
        self.bot.clone()
    }
}

/// Spawns one sidecar per session
pub struct BridgeConnector {
    settings: BridgeSettings,
}

impl BridgeConnector {
    pub fn new(settings: BridgeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for BridgeConnector {
    async fn connect(&self, creds: Option<serde_json::Value>) -> Result<Box<dyn Connection>, BotError> {
        let settings = &self.settings;
        let mut command = Command::new(&settings.command);
        command
            .args(&settings.args)
            .env("GATE_BOT_AUTH_DIR", &settings.auth_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &settings.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| {
                BotError::Connection(format!(
                    "failed to start bridge `{} {}`: {} (bridge.command must point at a JSON-lines WhatsApp sidecar)",
                    settings.command,
                    settings.args.join(" "),
                    e
                ))
            })?;
        tracing::info!(pid = ?child.id(), "Started bridge: {} {}", settings.command, settings.args.join(" "));

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BotError::Internal("bridge stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BotError::Internal("bridge stdout not captured".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!("[bridge] {}", line);
                }
            });
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = rx.recv().await {
                let written = async {
                    stdin.write_all(line.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::warn!("Failed to write to bridge: {}", e);
                    break;
                }
            }
        });

        let bot = Arc::new(BridgeBot::new(tx));
        bot.push(&SidecarCommand::Init { creds })?;

        Ok(Box::new(BridgeConnection::new(BufReader::new(stdout), bot, Some(child))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Phase;

    #[tokio::test]
    async fn test_connection_skips_noise_and_send_results() {
        let input: &[u8] = b"not json\n\
            {\"type\":\"send.result\",\"id\":\"r1\",\"ok\":true}\n\
            \n\
            {\"type\":\"connection.update\",\"connection\":\"open\"}\n";
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut conn = BridgeConnection::new(input, Arc::new(BridgeBot::new(tx)), None);

        match conn.next_event().await {
            Some(SessionEvent::ConnectionUpdate(update)) => assert_eq!(update.connection, Some(Phase::Open)),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(conn.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_reply_is_queued_as_send_line() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bot = BridgeBot::new(tx);
        let key = MessageKey::new("ABCD", "123@s.whatsapp.net").with_alt("999@lid");

        let id = bot.send_reply("999@lid", "🛡️ gatekeeper response", &key).await.unwrap();
        let line = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["type"], "send");
        assert_eq!(value["id"], id.as_str());
        assert_eq!(value["jid"], "999@lid");
        assert_eq!(value["quoted"]["remoteJidAlt"], "999@lid");
    }

    #[tokio::test]
    async fn test_reply_after_bridge_exit_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let bot = BridgeBot::new(tx);
        let key = MessageKey::new("ABCD", "123@s.whatsapp.net");
        assert!(matches!(
            bot.send_reply("123@s.whatsapp.net", "hi", &key).await,
            Err(BotError::Connection(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_connector_talks_to_spawned_process() {
        // A stand-in sidecar: answers the init line with an open + logout.
        let script = r#"read init; echo '{"type":"connection.update","connection":"open"}'; echo '{"type":"connection.update","connection":"close","lastDisconnect":{"statusCode":401}}'"#;
        let dir = tempfile::tempdir().unwrap();
        let connector = BridgeConnector::new(BridgeSettings {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: Some(dir.path().to_path_buf()),
            auth_dir: dir.path().join("auth_info"),
        });

        let mut conn = connector.connect(None).await.unwrap();
        let mut phases = Vec::new();
        while let Some(event) = conn.next_event().await {
            if let SessionEvent::ConnectionUpdate(update) = event {
                phases.push(update.connection);
            }
        }
        assert_eq!(phases, vec![Some(Phase::Open), Some(Phase::Closed)]);
    }

    #[tokio::test]
    async fn test_missing_bridge_binary_is_connection_error() {
        let connector = BridgeConnector::new(BridgeSettings {
            command: "/definitely/not/a/bridge".to_string(),
            args: Vec::new(),
            working_dir: None,
            auth_dir: PathBuf::from("auth_info"),
        });
        match connector.connect(None).await {
            Err(BotError::Connection(message)) => {
                assert!(message.contains("/definitely/not/a/bridge"));
                assert!(message.contains("bridge.command"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("spawn should fail"),
        }
    }
}
