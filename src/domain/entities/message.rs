use chrono::{DateTime, Utc};

/// How the service addressed a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    /// Phone-number addressing (`...@s.whatsapp.net`)
    Pn,
    /// Linked-device addressing (`...@lid`)
    Lid,
    Other(String),
}

impl AddressingMode {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pn" => AddressingMode::Pn,
            "lid" => AddressingMode::Lid,
            other => AddressingMode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AddressingMode::Pn => "pn",
            AddressingMode::Lid => "lid",
            AddressingMode::Other(s) => s,
        }
    }
}

/// Identifies a message and where it came from. Replies quote this key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageKey {
    pub id: String,
    pub remote_jid: String,
    pub remote_jid_alt: Option<String>,
    pub from_me: bool,
    pub addressing_mode: Option<AddressingMode>,
}

impl MessageKey {
    pub fn new(id: impl Into<String>, remote_jid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_jid: remote_jid.into(),
            remote_jid_alt: None,
            from_me: false,
            addressing_mode: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.remote_jid_alt = Some(alt.into());
        self
    }

    pub fn from_me(mut self, from_me: bool) -> Self {
        self.from_me = from_me;
        self
    }

    pub fn with_addressing_mode(mut self, mode: AddressingMode) -> Self {
        self.addressing_mode = Some(mode);
        self
    }

    /// Sent from a secondary device of the same account.
    pub fn is_linked_device(&self) -> bool {
        self.remote_jid_alt.is_some() || self.addressing_mode == Some(AddressingMode::Lid)
    }

    /// Where replies go: the alternate identifier wins when present.
    pub fn sender(&self) -> &str {
        self.remote_jid_alt.as_deref().unwrap_or(&self.remote_jid)
    }
}

/// Text-bearing parts of a message payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBody {
    pub conversation: Option<String>,
    pub extended_text: Option<String>,
    pub image_caption: Option<String>,
}

impl MessageBody {
    pub fn conversation(text: impl Into<String>) -> Self {
        Self {
            conversation: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn extended_text(text: impl Into<String>) -> Self {
        Self {
            extended_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn image_caption(caption: impl Into<String>) -> Self {
        Self {
            image_caption: Some(caption.into()),
            ..Self::default()
        }
    }

    /// First non-empty text field, or `""`.
    pub fn text(&self) -> &str {
        [&self.conversation, &self.extended_text, &self.image_caption]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// A single received chat event
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub key: MessageKey,
    pub body: Option<MessageBody>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl InboundMessage {
    pub fn new(key: MessageKey, body: Option<MessageBody>) -> Self {
        Self {
            key,
            body,
            timestamp: None,
        }
    }

    pub fn text(key: MessageKey, text: impl Into<String>) -> Self {
        Self::new(key, Some(MessageBody::conversation(text)))
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn sender(&self) -> &str {
        self.key.sender()
    }

    pub fn body_text(&self) -> &str {
        self.body.as_ref().map(MessageBody::text).unwrap_or("")
    }

    /// False for payload-less events and for the bot's own replies.
    /// Self-authored messages still count when they come from a linked device.
    pub fn should_process(&self) -> bool {
        if self.body.is_none() {
            return false;
        }
        !self.key.from_me || self.key.is_linked_device()
    }

    /// Short preview for logs
    pub fn preview(&self) -> String {
        self.body_text().chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prefers_first_non_empty_field() {
        let body = MessageBody {
            conversation: Some(String::new()),
            extended_text: Some("/gate a.py".to_string()),
            image_caption: Some("caption".to_string()),
        };
        assert_eq!(body.text(), "/gate a.py");

        assert_eq!(MessageBody::image_caption("/repair").text(), "/repair");
        assert_eq!(MessageBody::default().text(), "");
    }

    #[test]
    fn test_sender_uses_alternate_identifier() {
        let key = MessageKey::new("1", "123@s.whatsapp.net");
        assert_eq!(key.sender(), "123@s.whatsapp.net");

        let key = key.with_alt("999@lid");
        assert_eq!(key.sender(), "999@lid");
    }

    #[test]
    fn test_own_message_is_skipped() {
        let key = MessageKey::new("1", "123@s.whatsapp.net").from_me(true);
        let msg = InboundMessage::text(key, "/repair");
        assert!(!msg.should_process());
    }

    #[test]
    fn test_linked_device_message_is_processed() {
        let by_alt = MessageKey::new("1", "123@s.whatsapp.net")
            .from_me(true)
            .with_alt("999@lid");
        assert!(InboundMessage::text(by_alt, "/repair").should_process());

        let by_mode = MessageKey::new("2", "123@s.whatsapp.net")
            .from_me(true)
            .with_addressing_mode(AddressingMode::Lid);
        assert!(InboundMessage::text(by_mode, "/repair").should_process());

        let pn_mode = MessageKey::new("3", "123@s.whatsapp.net")
            .from_me(true)
            .with_addressing_mode(AddressingMode::Pn);
        assert!(!InboundMessage::text(pn_mode, "/repair").should_process());
    }

    #[test]
    fn test_message_without_body_is_skipped() {
        let msg = InboundMessage::new(MessageKey::new("1", "123@s.whatsapp.net"), None);
        assert!(!msg.should_process());
        assert_eq!(msg.body_text(), "");
    }
}
