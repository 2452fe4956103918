//! Console adapter for development/testing

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::{ConnectionUpdate, DisconnectReason, InboundMessage, MessageKey};
use crate::domain::traits::{Bot, BotInfo, Connection, Connector, SessionEvent};

/// Chat id console messages appear to come from
pub const CONSOLE_JID: &str = "console@local";

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    sender: Option<mpsc::UnboundedSender<String>>,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "gate-bot".to_string(),
                platform: "console".to_string(),
            },
            sender: None,
        }
    }

    /// Also forward every reply to `sender`
    pub fn with_sender(mut self, sender: mpsc::UnboundedSender<String>) -> Self {
        self.sender = Some(sender);
        self
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn send_reply(&self, _to: &str, text: &str, quoted: &MessageKey) -> Result<String, BotError> {
        println!("[BOT] {}", text);
        if let Some(sender) = &self.sender {
            sender
                .send(text.to_string())
                .map_err(|e| BotError::Connection(e.to_string()))?;
        }
        Ok(format!("reply-{}", quoted.id))
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

/// One console "session": open at start, one message per line, logged out at EOF
pub struct ConsoleConnection<R> {
    lines: Lines<R>,
    bot: Arc<ConsoleAdapter>,
    opened: bool,
    closed: bool,
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleConnection<R> {
    pub fn new(reader: R, bot: Arc<ConsoleAdapter>) -> Self {
        Self {
            lines: reader.lines(),
            bot,
            opened: false,
            closed: false,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Connection for ConsoleConnection<R> {
    async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.closed {
            return None;
        }
        if !self.opened {
            self.opened = true;
            return Some(SessionEvent::ConnectionUpdate(ConnectionUpdate::open()));
        }

        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let key = MessageKey::new(uuid::Uuid::new_v4().to_string(), CONSOLE_JID);
                    let msg = InboundMessage::text(key, text).with_timestamp(chrono::Utc::now());
                    return Some(SessionEvent::MessagesUpsert(vec![msg]));
                }
                Ok(None) => {
                    self.closed = true;
                    return Some(SessionEvent::ConnectionUpdate(ConnectionUpdate::closed(
                        DisconnectReason::logged_out(),
                    )));
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    self.closed = true;
                    return Some(SessionEvent::ConnectionUpdate(ConnectionUpdate::closed(
                        DisconnectReason::unknown(),
                    )));
                }
            }
        }
    }

    fn bot(&self) -> Arc<dyn Bot> {
        self.bot.clone()
    }
}

/// Connects to stdin/stdout
pub struct ConsoleConnector {
    bot: Arc<ConsoleAdapter>,
}

impl ConsoleConnector {
    pub fn new() -> Self {
        Self {
            bot: Arc::new(ConsoleAdapter::new()),
        }
    }
}

impl Default for ConsoleConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for ConsoleConnector {
    async fn connect(&self, _creds: Option<serde_json::Value>) -> Result<Box<dyn Connection>, BotError> {
        tracing::info!("Starting console bot (dev mode), type /gate <file> or /repair");
        let reader = BufReader::new(tokio::io::stdin());
        Ok(Box::new(ConsoleConnection::new(reader, self.bot.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Phase;

    fn phase(event: Option<SessionEvent>) -> Option<Phase> {
        match event {
            Some(SessionEvent::ConnectionUpdate(update)) => update.connection,
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_lines_become_messages() {
        let input: &[u8] = b"/repair\n\n/gate a.py\n";
        let mut conn = ConsoleConnection::new(input, Arc::new(ConsoleAdapter::new()));

        assert_eq!(phase(conn.next_event().await), Some(Phase::Open));

        let mut texts = Vec::new();
        for _ in 0..2 {
            match conn.next_event().await {
                Some(SessionEvent::MessagesUpsert(messages)) => {
                    assert_eq!(messages[0].sender(), CONSOLE_JID);
                    texts.push(messages[0].body_text().to_string());
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(texts, vec!["/repair", "/gate a.py"]);

        match conn.next_event().await {
            Some(SessionEvent::ConnectionUpdate(update)) => {
                assert_eq!(update.connection, Some(Phase::Closed));
                assert!(update.last_disconnect.unwrap().is_logged_out());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(conn.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_replies_are_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bot = ConsoleAdapter::new().with_sender(tx);
        let key = MessageKey::new("abc", CONSOLE_JID);

        let id = bot.send_reply(CONSOLE_JID, "🔧 done", &key).await.unwrap();
        assert_eq!(id, "reply-abc");
        assert_eq!(rx.recv().await.as_deref(), Some("🔧 done"));
    }
}
