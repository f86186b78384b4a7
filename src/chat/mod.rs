//! Chat shell: Routes incoming chat messages to the engine.
//!
//! Messages addressed to the bot are parsed as authoring commands; all other
//! messages go through the passive reaction path. Replies leave through a
//! [`ChatTransport`].

mod command;
pub mod templates;

pub use command::{help_lines, Command};

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::{ReactionEngine, TrainOutcome, UndoOutcome};
use crate::error::ReactResult;

/// Outbound side of a chat adapter.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, text: &str) -> ReactResult<()>;
}

/// A message as delivered by the chat adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub text: String,
    /// True when the message was directed at the bot (mention, DM, prefix).
    /// The adapter strips the addressing before handing the text over.
    pub addressed: bool,
}

impl IncomingMessage {
    pub fn heard(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            addressed: false,
        }
    }

    pub fn addressed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            addressed: true,
        }
    }
}

pub struct Responder {
    engine: Arc<ReactionEngine>,
}

impl Responder {
    pub fn new(engine: Arc<ReactionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ReactionEngine> {
        &self.engine
    }

    /// Handle one message and send the reply, if any. Returns what was sent.
    ///
    /// Store failures during authoring commands are returned to the caller;
    /// the passive path never fails.
    pub async fn handle(
        &self,
        message: &IncomingMessage,
        transport: &dyn ChatTransport,
    ) -> ReactResult<Option<String>> {
        let reply = if message.addressed {
            match Command::parse(&message.text) {
                Some(command) => Some(self.run(command).await?),
                None => None,
            }
        } else {
            self.engine.react(&message.text).await
        };

        if let Some(text) = &reply {
            transport.send_message(text).await?;
        }
        Ok(reply)
    }

    /// Execute an authoring command and render its reply.
    pub async fn run(&self, command: Command) -> ReactResult<String> {
        match command {
            Command::Train { term, response } => {
                Ok(match self.engine.train(&term, &response).await? {
                    TrainOutcome::Learned(record) => templates::learned(&record),
                    TrainOutcome::Rejected { term } => templates::too_trivial(&term),
                })
            }
            Command::WhatWasThat => Ok(match self.engine.what_was_that().await {
                Some(record) => templates::what_was_that(&record),
                None => templates::not_found(self.engine.random().as_ref()),
            }),
            Command::IgnoreThat => Ok(match self.engine.undo_last().await? {
                UndoOutcome::Forgotten(record) => templates::ignored(&record),
                UndoOutcome::NothingToUndo => templates::not_found(self.engine.random().as_ref()),
            }),
            Command::Help => Ok(help_lines()
                .into_iter()
                .map(|(usage, description)| format!("{usage} - {description}"))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }
}
