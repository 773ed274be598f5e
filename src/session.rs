//! The per-conversation event loop.
//!
//! [`ChatSession`] wires the pieces together for one viewer: it guards
//! submissions, assembles the [`TurnRequest`], and drives a turn's delta
//! stream strictly one event at a time (append, re-parse, reduce, notify).
//! The model service is the only source of asynchronous
//! suspension; every handler runs to completion before the next delta is
//! awaited, so the reducer never observes overlapping or out-of-order
//! updates.

use crate::conversation::{Conversation, MessageRecord, TurnAccumulator, TurnPhase};
use crate::persona::Roster;
use crate::prompt;
use crate::service::{ModelService, TranscriptEntry, TurnRequest};
use futures::StreamExt;
use tracing::info;

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of history records included in the rolling transcript
    /// window sent upstream.
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { history_window: 32 }
    }
}

/// How a [`ChatSession::run_turn`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream finished normally; all records are closed.
    Completed,
    /// The stream (or request assembly) failed; a fallback record was
    /// appended. The conversation remains usable.
    Failed,
    /// A turn was already in flight; nothing happened.
    Rejected,
}

/// A single-viewer chat session over a model-call service.
///
/// The rendering layer passes a callback to [`run_turn`](Self::run_turn) and
/// receives the full ordered history plus a turn-in-flight flag after every
/// event; open records are its cue to show a streaming indicator.
pub struct ChatSession<S: ModelService> {
    service: S,
    roster: Roster,
    config: SessionConfig,
    conversation: Conversation,
}

impl<S: ModelService> ChatSession<S> {
    /// Creates a session with default configuration.
    pub fn new(service: S, roster: Roster) -> Self {
        Self::with_config(service, roster, SessionConfig::default())
    }

    /// Creates a session with explicit configuration.
    pub fn with_config(service: S, roster: Roster, config: SessionConfig) -> Self {
        Self {
            service,
            roster,
            config,
            conversation: Conversation::new(),
        }
    }

    /// The full ordered conversation history.
    pub fn history(&self) -> &[MessageRecord] {
        self.conversation.history()
    }

    /// Phase of the latest turn.
    pub fn phase(&self) -> TurnPhase {
        self.conversation.phase()
    }

    /// True while a turn is awaiting or streaming.
    pub fn turn_in_flight(&self) -> bool {
        self.conversation.turn_in_flight()
    }

    /// The current roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Mutable roster access, available only between turns. Returns `None`
    /// while a turn is in flight: the active set is immutable mid-turn.
    pub fn roster_mut(&mut self) -> Option<&mut Roster> {
        if self.conversation.turn_in_flight() {
            None
        } else {
            Some(&mut self.roster)
        }
    }

    /// Runs one full turn: submits the user text, streams the reply, and
    /// invokes `on_update` with `(history, turn_in_flight)` after every
    /// event. Failures end in a fallback record, never in an error return;
    /// the outcome tells the embedding app what happened.
    pub async fn run_turn<F>(&mut self, user_text: impl Into<String>, mut on_update: F) -> TurnOutcome
    where
        F: FnMut(&[MessageRecord], bool),
    {
        if !self.conversation.submit(user_text).is_accepted() {
            return TurnOutcome::Rejected;
        }
        on_update(self.conversation.history(), true);

        let request = match self.build_request() {
            Ok(request) => request,
            Err(err) => {
                self.conversation.fail(&[], &err);
                on_update(self.conversation.history(), false);
                return TurnOutcome::Failed;
            }
        };

        let mut deltas = match self.service.stream_turn(request).await {
            Ok(stream) => stream,
            Err(err) => {
                self.conversation.fail(&[], &err);
                on_update(self.conversation.history(), false);
                return TurnOutcome::Failed;
            }
        };

        let mut accumulator = TurnAccumulator::new(self.roster.clone());
        while let Some(item) = deltas.next().await {
            match item {
                Ok(fragment) => {
                    let snapshot = accumulator.push_delta(&fragment);
                    self.conversation.apply_snapshot(snapshot);
                    on_update(self.conversation.history(), true);
                }
                Err(err) => {
                    // Terminal: close what already streamed, append the
                    // fallback record, keep the conversation alive.
                    let snapshot = accumulator.finish();
                    self.conversation.fail(snapshot, &err);
                    on_update(self.conversation.history(), false);
                    return TurnOutcome::Failed;
                }
            }
        }

        let raw_bytes = accumulator.raw().len();
        let snapshot = accumulator.finish();
        let records = snapshot.len();
        self.conversation.complete(snapshot);
        on_update(self.conversation.history(), false);
        info!(
            target = "chorus::session",
            records,
            raw_bytes,
            event = "turn_finished"
        );
        TurnOutcome::Completed
    }

    fn build_request(&self) -> Result<TurnRequest, prompt::PromptError> {
        let system_instruction = prompt::system_instruction(&self.roster)?;

        let history = self.conversation.history();
        let start = history.len().saturating_sub(self.config.history_window);
        let transcript = history[start..]
            .iter()
            .filter(|record| !record.open)
            .map(|record| {
                let speaker = match &record.speaker {
                    Some(id) => self.roster.display_name(id).to_string(),
                    None => "User".to_string(),
                };
                TranscriptEntry::new(speaker, record.text.clone())
            })
            .collect();

        Ok(TurnRequest {
            system_instruction,
            transcript,
        })
    }
}
