use chrono::{DateTime, Utc};
use std::fmt;

/// Status code the service uses for an explicit logout
pub const LOGGED_OUT_STATUS: u16 = 401;

/// Connection lifecycle phase reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Open,
    Closed,
}

impl Phase {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "connecting" => Some(Phase::Connecting),
            "open" => Some(Phase::Open),
            "close" | "closed" => Some(Phase::Closed),
            _ => None,
        }
    }
}

/// Why a connection closed. `status` is the opaque code from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisconnectReason {
    pub status: Option<u16>,
}

impl DisconnectReason {
    pub fn status(code: u16) -> Self {
        Self { status: Some(code) }
    }

    pub fn unknown() -> Self {
        Self { status: None }
    }

    pub fn logged_out() -> Self {
        Self::status(LOGGED_OUT_STATUS)
    }

    pub fn is_logged_out(&self) -> bool {
        self.status == Some(LOGGED_OUT_STATUS)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(LOGGED_OUT_STATUS) => write!(f, "logged out ({})", LOGGED_OUT_STATUS),
            Some(code) => write!(f, "status {}", code),
            None => write!(f, "unknown"),
        }
    }
}

/// A `connection.update` event. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub connection: Option<Phase>,
    pub last_disconnect: Option<DisconnectReason>,
    pub qr: Option<String>,
}

impl ConnectionUpdate {
    pub fn open() -> Self {
        Self {
            connection: Some(Phase::Open),
            ..Self::default()
        }
    }

    pub fn closed(reason: DisconnectReason) -> Self {
        Self {
            connection: Some(Phase::Closed),
            last_disconnect: Some(reason),
            qr: None,
        }
    }

    pub fn qr(code: impl Into<String>) -> Self {
        Self {
            qr: Some(code.into()),
            ..Self::default()
        }
    }
}

/// One authenticated connection instance. Replaced on every reconnect.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub attempt: u32,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub last_disconnect: Option<DisconnectReason>,
}

impl Session {
    pub fn new(attempt: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            attempt,
            phase: Phase::Connecting,
            started_at: Utc::now(),
            last_disconnect: None,
        }
    }

    /// Short id for log lines
    pub fn short_id(&self) -> &str {
        &self.id[..8.min(self.id.len())]
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_out_detection() {
        assert!(DisconnectReason::logged_out().is_logged_out());
        assert!(!DisconnectReason::status(428).is_logged_out());
        assert!(!DisconnectReason::unknown().is_logged_out());
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!(Phase::parse("open"), Some(Phase::Open));
        assert_eq!(Phase::parse("close"), Some(Phase::Closed));
        assert_eq!(Phase::parse("connecting"), Some(Phase::Connecting));
        assert_eq!(Phase::parse("weird"), None);
    }

    #[test]
    fn test_new_sessions_get_fresh_ids() {
        let a = Session::new(1);
        let b = Session::new(2);
        assert_ne!(a.id, b.id);
        assert_eq!(a.phase, Phase::Connecting);
        assert_eq!(a.short_id().len(), 8);
    }
}
