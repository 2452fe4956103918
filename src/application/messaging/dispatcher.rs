//! Command dispatcher - Filters inbound messages and routes commands to scripts

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

use super::parser::CommandParser;
use super::replies;
use crate::application::errors::BotError;
use crate::application::services::CommandService;
use crate::domain::entities::{Command, InboundMessage};
use crate::domain::traits::Bot;

/// Admission control and batch handling knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Scripts allowed to run at the same time; extra commands wait
    pub max_concurrent_jobs: usize,
    /// Turn away a sender whose previous command is still running
    pub one_job_per_sender: bool,
    /// Handle every message of a batch instead of only the first
    pub process_whole_batch: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            one_job_per_sender: true,
            process_whole_batch: false,
        }
    }
}

/// What happened to one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Own message or no payload
    Ignored,
    /// Text did not contain a command
    Unrecognized,
    /// Sender already has a command running
    Busy,
    Handled(Command),
}

/// Routes inbound messages to commands. Stateless apart from admission control.
pub struct CommandDispatcher {
    parser: CommandParser,
    commands: CommandService,
    settings: DispatchSettings,
    jobs: Semaphore,
    in_flight: Mutex<HashSet<String>>,
}

impl CommandDispatcher {
    pub fn new(parser: CommandParser, commands: CommandService, settings: DispatchSettings) -> Self {
        let permits = settings.max_concurrent_jobs.max(1);
        Self {
            parser,
            commands,
            settings,
            jobs: Semaphore::new(permits),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Handle one `messages.upsert` batch. Never fails: errors are logged here.
    pub async fn handle_batch(&self, bot: &dyn Bot, messages: &[InboundMessage]) {
        if messages.is_empty() {
            return;
        }

        let selected = if self.settings.process_whole_batch {
            messages
        } else {
            if messages.len() > 1 {
                tracing::warn!(
                    dropped = messages.len() - 1,
                    "Batch has {} messages, handling only the first",
                    messages.len()
                );
            }
            &messages[..1]
        };

        for msg in selected {
            tracing::debug!(
                id = %msg.key.id,
                sender = msg.sender(),
                from_me = msg.key.from_me,
                "messages.upsert: {}",
                msg.preview()
            );
            if let Err(e) = self.handle_message(bot, msg).await {
                tracing::error!(sender = msg.sender(), "messages.upsert handler error: {}", e);
            }
        }
    }

    /// Handle a single message. Reply-send errors are returned to the caller.
    pub async fn handle_message(&self, bot: &dyn Bot, msg: &InboundMessage) -> Result<DispatchOutcome, BotError> {
        if !msg.should_process() {
            return Ok(DispatchOutcome::Ignored);
        }

        let sender = msg.sender();
        let command = self.parser.parse(msg.body_text());
        if !command.is_recognized() {
            return Ok(DispatchOutcome::Unrecognized);
        }

        let Some(_claim) = self.claim_sender(sender) else {
            tracing::info!(sender, command = command.name(), "Sender busy, turning command away");
            bot.send_reply(sender, replies::BUSY, &msg.key).await?;
            return Ok(DispatchOutcome::Busy);
        };

        if let Command::Gate { .. } = command {
            bot.send_reply(sender, replies::GATE_ACK, &msg.key).await?;
        }

        let reply = {
            let _permit = self
                .jobs
                .acquire()
                .await
                .map_err(|_| BotError::Internal("job queue closed".to_string()))?;
            self.commands.execute(&command).await
        };

        if let Some(reply) = reply {
            bot.send_reply(sender, &reply, &msg.key).await?;
        }

        Ok(DispatchOutcome::Handled(command))
    }

    fn claim_sender(&self, sender: &str) -> Option<SenderClaim<'_>> {
        if !self.settings.one_job_per_sender {
            return Some(SenderClaim {
                in_flight: &self.in_flight,
                sender: None,
            });
        }

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(sender.to_string()) {
            return None;
        }
        Some(SenderClaim {
            in_flight: &self.in_flight,
            sender: Some(sender.to_string()),
        })
    }
}

/// Marks a sender as busy until dropped
struct SenderClaim<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    sender: Option<String>,
}

impl Drop for SenderClaim<'_> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            self.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&sender);
        }
    }
}

/// Shared handle for spawning batch handlers
pub type SharedDispatcher = Arc<CommandDispatcher>;
