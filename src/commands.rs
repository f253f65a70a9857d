//! Operator command inbox

use std::collections::VecDeque;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Operator commands accepted between cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop admitting new risk; exits keep running
    Pause,
    /// Clear a manual pause; limit halts re-assert on their own
    Resume,
    /// Close every open position on one symbol
    CloseSymbol(String),
    /// Close everything
    CloseAll,
}

/// A command plus the id that makes redelivery harmless
#[derive(Debug, Clone)]
pub struct CommandEnvelope {
    pub id: Uuid,
    pub command: Command,
}

impl CommandEnvelope {
    pub fn new(command: Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            command,
        }
    }
}

/// Sender half handed to whatever surfaces operator input
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<CommandEnvelope>,
}

impl CommandSender {
    /// Queue a command; a full inbox drops it with a logged reason
    /// rather than blocking the caller.
    pub fn send(&self, envelope: CommandEnvelope) -> bool {
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                tracing::warn!(id = %envelope.id, "Command inbox full, dropping command");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Receiver half drained once at the top of every evaluation cycle.
///
/// A ring of recently seen ids guarantees at-most-once processing even
/// when a command is delivered twice.
pub struct CommandInbox {
    rx: mpsc::Receiver<CommandEnvelope>,
    seen: VecDeque<Uuid>,
    seen_capacity: usize,
}

impl CommandInbox {
    /// Pull everything queued since the last cycle, deduplicated
    pub fn drain(&mut self) -> Vec<Command> {
        let mut commands = vec![];
        while let Ok(envelope) = self.rx.try_recv() {
            if self.seen.contains(&envelope.id) {
                tracing::debug!(id = %envelope.id, "Skipping already-processed command");
                continue;
            }
            if self.seen.len() == self.seen_capacity {
                self.seen.pop_front();
            }
            self.seen.push_back(envelope.id);
            commands.push(envelope.command);
        }
        commands
    }
}

/// Build the bounded channel pair
pub fn command_channel(capacity: usize) -> (CommandSender, CommandInbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        CommandSender { tx },
        CommandInbox {
            rx,
            seen: VecDeque::new(),
            seen_capacity: capacity.max(1) * 4,
        },
    )
}
