//! JSON-lines protocol spoken with the WhatsApp sidecar.
//!
//! Inbound lines mirror the Baileys event names (`creds.update`,
//! `connection.update`, `messages.upsert`); messages keep the Baileys
//! `WAMessage` field names.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::application::errors::BotError;
use crate::domain::entities::{
    AddressingMode, ConnectionUpdate, DisconnectReason, InboundMessage, MessageBody, MessageKey, Phase,
};
use crate::domain::traits::SessionEvent;

/// Line emitted by the sidecar
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum SidecarEvent {
    #[serde(rename = "creds.update")]
    CredsUpdate { creds: Value },

    #[serde(rename = "connection.update", rename_all = "camelCase")]
    ConnectionUpdate {
        #[serde(default)]
        connection: Option<String>,
        #[serde(default)]
        last_disconnect: Option<WireDisconnect>,
        #[serde(default)]
        qr: Option<String>,
    },

    #[serde(rename = "messages.upsert")]
    MessagesUpsert {
        #[serde(default)]
        messages: Vec<WaMessage>,
    },

    #[serde(rename = "send.result", rename_all = "camelCase")]
    SendResult {
        id: String,
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDisconnect {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Line sent to the sidecar
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SidecarCommand {
    #[serde(rename = "init")]
    Init { creds: Option<Value> },

    #[serde(rename = "send")]
    Send {
        id: String,
        jid: String,
        text: String,
        quoted: WaKey,
    },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_jid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_jid_alt: Option<String>,
    /// Baileys sends `null` as well as omitting the field
    #[serde(default, deserialize_with = "null_as_false")]
    pub from_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addressing_mode: Option<String>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl From<&MessageKey> for WaKey {
    fn from(key: &MessageKey) -> Self {
        Self {
            id: Some(key.id.clone()),
            remote_jid: Some(key.remote_jid.clone()),
            remote_jid_alt: key.remote_jid_alt.clone(),
            from_me: key.from_me,
            addressing_mode: key.addressing_mode.as_ref().map(|m| m.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaContent {
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub extended_text_message: Option<WaExtendedText>,
    #[serde(default)]
    pub image_message: Option<WaImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaExtendedText {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaImage {
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaMessage {
    pub key: WaKey,
    #[serde(default)]
    pub message: Option<WaContent>,
    /// Seconds since epoch; Baileys sends a number or a numeric string
    #[serde(default)]
    pub message_timestamp: Option<Value>,
}

impl WaMessage {
    /// `None` when the key has no chat id to reply to.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let WaKey {
            id,
            remote_jid,
            remote_jid_alt,
            from_me,
            addressing_mode,
        } = self.key;

        let mut key = MessageKey::new(id.unwrap_or_default(), remote_jid?).from_me(from_me);
        key.remote_jid_alt = remote_jid_alt.filter(|alt| !alt.is_empty());
        key.addressing_mode = addressing_mode.as_deref().map(AddressingMode::parse);

        let body = self.message.map(|content| MessageBody {
            conversation: content.conversation,
            extended_text: content.extended_text_message.and_then(|m| m.text),
            image_caption: content.image_message.and_then(|m| m.caption),
        });

        let mut inbound = InboundMessage::new(key, body);
        if let Some(ts) = self.message_timestamp.as_ref().and_then(parse_timestamp) {
            inbound = inbound.with_timestamp(ts);
        }
        Some(inbound)
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    Utc.timestamp_opt(secs, 0).single()
}

/// Decoded sidecar line
#[derive(Debug, Clone)]
pub enum Decoded {
    Event(SessionEvent),
    SendResult { id: String, ok: bool, error: Option<String> },
    /// Nothing for the session (e.g. an upsert with no usable messages)
    Nothing,
}

pub fn decode_line(line: &str) -> Result<Decoded, BotError> {
    let event: SidecarEvent = serde_json::from_str(line).map_err(|e| BotError::Protocol(e.to_string()))?;

    let decoded = match event {
        SidecarEvent::CredsUpdate { creds } => Decoded::Event(SessionEvent::CredsUpdate(creds)),
        SidecarEvent::ConnectionUpdate {
            connection,
            last_disconnect,
            qr,
        } => Decoded::Event(SessionEvent::ConnectionUpdate(ConnectionUpdate {
            connection: connection.as_deref().and_then(Phase::parse),
            last_disconnect: last_disconnect.map(|d| DisconnectReason {
                status: d.status_code,
            }),
            qr: qr.filter(|code| !code.is_empty()),
        })),
        SidecarEvent::MessagesUpsert { messages } => {
            let messages: Vec<InboundMessage> = messages.into_iter().filter_map(WaMessage::into_inbound).collect();
            if messages.is_empty() {
                Decoded::Nothing
            } else {
                Decoded::Event(SessionEvent::MessagesUpsert(messages))
            }
        }
        SidecarEvent::SendResult { id, ok, error } => Decoded::SendResult { id, ok, error },
    };
    Ok(decoded)
}

pub fn encode(command: &SidecarCommand) -> Result<String, BotError> {
    serde_json::to_string(command).map_err(|e| BotError::Protocol(e.to_string()))
}
