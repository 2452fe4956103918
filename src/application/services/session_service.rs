//! Session supervisor - keeps one connection alive until the account logs out

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::application::messaging::SharedDispatcher;
use crate::domain::entities::{ConnectionUpdate, DisconnectReason, Phase, Session};
use crate::domain::traits::{Connection, Connector, CredentialStore, PairingDisplay, SessionEvent};

/// How long to wait between connection attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
    /// Consecutive closures without reaching `open` before giving up
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            jitter: true,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Doubling delays starting at `initial_delay`, capped at `max_delay`.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        // ExponentialBackoff starts at base * factor, so the initial delay is
        // yielded first and the strategy continues from twice that.
        let initial_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        let first = self.initial_delay.min(self.max_delay);
        let backoff = std::iter::once(first).chain(
            ExponentialBackoff::from_millis(2)
                .factor(initial_ms)
                .max_delay(self.max_delay),
        );
        if self.jitter {
            Box::new(backoff.map(jitter))
        } else {
            Box::new(backoff)
        }
    }
}

/// Lifecycle of the supervised connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    Disconnected,
    Connecting { attempt: u32 },
    Open { session_id: String },
    /// Logged out or out of attempts; nothing more will happen
    Terminal,
}

/// Why `run` returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    LoggedOut,
    GaveUp { attempts: u32 },
}

/// Next step after a connection closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Reconnect,
    Stop,
}

impl CloseDecision {
    pub fn for_reason(reason: &DisconnectReason) -> Self {
        if reason.is_logged_out() {
            CloseDecision::Stop
        } else {
            CloseDecision::Reconnect
        }
    }
}

struct SessionEnd {
    reason: DisconnectReason,
    opened: bool,
}

/// Owns the connection loop. Only the supervisor decides whether to reconnect.
pub struct SessionSupervisor {
    connector: Arc<dyn Connector>,
    store: Arc<dyn CredentialStore>,
    dispatcher: SharedDispatcher,
    pairing: Arc<dyn PairingDisplay>,
    policy: ReconnectPolicy,
    state: watch::Sender<SupervisorState>,
}

impl SessionSupervisor {
    pub fn new(
        connector: Arc<dyn Connector>,
        store: Arc<dyn CredentialStore>,
        dispatcher: SharedDispatcher,
        pairing: Arc<dyn PairingDisplay>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Disconnected);
        Self {
            connector,
            store,
            dispatcher,
            pairing,
            policy,
            state,
        }
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SupervisorState {
        self.state.borrow().clone()
    }

    /// Connect, and keep reconnecting until logged out or out of attempts.
    pub async fn run(&self) -> SessionOutcome {
        let mut delays = self.policy.delays();
        let mut failures: u32 = 0;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.set_state(SupervisorState::Connecting { attempt });
            let mut session = Session::new(attempt);
            tracing::info!(session_id = session.short_id(), attempt, "Connecting");

            let end = match self.open(&session).await {
                Some(connection) => self.drive(&mut session, connection).await,
                None => SessionEnd {
                    reason: DisconnectReason::unknown(),
                    opened: false,
                },
            };

            session.phase = Phase::Closed;
            session.last_disconnect = Some(end.reason);

            let decision = CloseDecision::for_reason(&end.reason);
            tracing::info!(
                session_id = session.short_id(),
                attempt = session.attempt,
                reason = %end.reason,
                uptime_secs = session.uptime().num_seconds(),
                "Connection closed, reconnecting? {}",
                decision == CloseDecision::Reconnect
            );

            if decision == CloseDecision::Stop {
                self.set_state(SupervisorState::Terminal);
                return SessionOutcome::LoggedOut;
            }

            if end.opened {
                delays = self.policy.delays();
                failures = 0;
            }
            failures += 1;

            if let Some(max) = self.policy.max_attempts {
                if failures > max {
                    tracing::error!(attempts = failures - 1, "Giving up on reconnecting");
                    self.set_state(SupervisorState::Terminal);
                    return SessionOutcome::GaveUp { attempts: failures - 1 };
                }
            }

            self.set_state(SupervisorState::Disconnected);
            let delay = delays.next().unwrap_or(self.policy.max_delay);
            if !delay.is_zero() {
                tracing::info!("Reconnecting in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn open(&self, session: &Session) -> Option<Box<dyn Connection>> {
        let creds = match self.store.load().await {
            Ok(creds) => creds,
            Err(e) => {
                tracing::warn!(session_id = session.short_id(), "Failed to load credentials, pairing fresh: {}", e);
                None
            }
        };
        if creds.is_none() {
            tracing::info!(session_id = session.short_id(), "No saved credentials, a pairing code will follow");
        }

        match self.connector.connect(creds).await {
            Ok(connection) => Some(connection),
            Err(e) => {
                tracing::warn!(session_id = session.short_id(), "Connect failed: {}", e);
                None
            }
        }
    }

    /// Pump one connection's events until it closes
    async fn drive(&self, session: &mut Session, mut connection: Box<dyn Connection>) -> SessionEnd {
        let bot = connection.bot();
        let info = bot.bot_info();
        tracing::info!(
            session_id = session.short_id(),
            platform = %info.platform,
            "Transport ready: {} ({})",
            info.name,
            info.id
        );
        let mut opened = false;

        while let Some(event) = connection.next_event().await {
            match event {
                SessionEvent::CredsUpdate(creds) => {
                    if let Err(e) = self.store.save(&creds).await {
                        tracing::error!(session_id = session.short_id(), "Failed to persist credentials: {}", e);
                    }
                }
                SessionEvent::ConnectionUpdate(update) => {
                    if let Some(reason) = self.on_connection_update(session, &update, &mut opened) {
                        return SessionEnd { reason, opened };
                    }
                }
                SessionEvent::MessagesUpsert(messages) => {
                    let dispatcher = self.dispatcher.clone();
                    let bot = bot.clone();
                    tokio::spawn(async move {
                        dispatcher.handle_batch(bot.as_ref(), &messages).await;
                    });
                }
            }
        }

        tracing::warn!(session_id = session.short_id(), "Event stream ended without a close event");
        SessionEnd {
            reason: DisconnectReason::unknown(),
            opened,
        }
    }

    /// Returns the disconnect reason once the connection closed.
    fn on_connection_update(
        &self,
        session: &mut Session,
        update: &ConnectionUpdate,
        opened: &mut bool,
    ) -> Option<DisconnectReason> {
        if let Some(code) = &update.qr {
            tracing::info!("📱 Scan this QR with WhatsApp → Linked Devices:");
            self.pairing.show(code);
        }

        match update.connection {
            Some(Phase::Open) => {
                *opened = true;
                session.phase = Phase::Open;
                self.set_state(SupervisorState::Open {
                    session_id: session.id.clone(),
                });
                tracing::info!(session_id = session.short_id(), "✅ Bot connected & ready for /gate /repair!");
                None
            }
            Some(Phase::Closed) => Some(update.last_disconnect.unwrap_or_default()),
            Some(Phase::Connecting) => {
                tracing::debug!(session_id = session.short_id(), "Transport connecting");
                None
            }
            None => None,
        }
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.send_replace(state);
    }
}
