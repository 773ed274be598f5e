//! Conversation state: message records, turn accumulation, and the reducer
//! that merges live turn snapshots into a stable linear history.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │ Conversation (reducer)                                │
//! │ - history: ordered MessageRecords                     │
//! │ - phase: Idle -> Awaiting -> Streaming -> end state   │
//! │ - splices the in-flight turn's agent block wholesale  │
//! └───────────────────────────────────────────────────────┘
//!              ↑ snapshot per delta
//! ┌───────────────────────────────────────────────────────┐
//! │ TurnAccumulator                                       │
//! │ - cumulative raw buffer, re-parsed on every delta     │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! History is append-only at turn granularity: a turn contributes one closed
//! user record immediately, then an agent block that is replaced wholesale on
//! every update while the turn streams. Once a turn ends, all of its records
//! are closed and no later update touches them; at any instant at most one
//! turn's records are open.

pub mod message;
pub mod turn;

pub use message::{MessageId, MessageRecord, Role};
pub use turn::TurnAccumulator;

use crate::persona::PersonaId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Speaker id carried by the synthetic record appended on stream failure.
/// Deliberately not part of any roster; it exists only in reducer output.
pub const FALLBACK_SPEAKER_ID: &str = "system";

/// Fixed text of the synthetic record appended on stream failure.
pub const STREAM_FAILURE_NOTICE: &str =
    "Transmission was interrupted before this reply could finish.";

/// Lifecycle of the current (or most recent) turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn has run yet.
    #[default]
    Idle,
    /// User record appended; waiting for the first delta.
    Awaiting,
    /// Deltas arriving; the turn's agent block is live.
    Streaming,
    /// The stream ended normally; all records closed.
    Completed,
    /// The stream failed; partial records closed, fallback appended.
    Failed,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The user record was appended and a turn is now awaiting deltas.
    Accepted,
    /// A turn was already in flight; the submission was a no-op.
    Rejected,
}

impl SubmitOutcome {
    /// True when the submission started a turn.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Reducer merging turn snapshots into the persistent ordered history.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    history: Vec<MessageRecord>,
    phase: TurnPhase,
    // Agent block of the in-flight turn: starts right after its user record.
    splice_at: usize,
    spliced: usize,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits user input, starting a turn.
    ///
    /// Appends one closed user record synchronously, never delayed by
    /// network latency. While a turn is in `Awaiting` or `Streaming`, a
    /// second submission is rejected as a no-op; single-turn-in-flight is
    /// the one mutual-exclusion invariant of the system, enforced by this
    /// explicit guard rather than by flags in the handlers.
    pub fn submit(&mut self, user_text: impl Into<String>) -> SubmitOutcome {
        if self.turn_in_flight() {
            warn!(
                target = "chorus::conversation",
                phase = ?self.phase,
                event = "submission_rejected"
            );
            return SubmitOutcome::Rejected;
        }

        self.history.push(MessageRecord::user(user_text));
        self.splice_at = self.history.len();
        self.spliced = 0;
        self.phase = TurnPhase::Awaiting;
        SubmitOutcome::Accepted
    }

    /// Replaces the in-flight turn's agent block with a new snapshot.
    ///
    /// The first application moves the turn to `Streaming`. Outside an
    /// in-flight turn the call is ignored: a finished turn's records are
    /// permanently closed and must never be touched again.
    pub fn apply_snapshot(&mut self, records: &[MessageRecord]) {
        if !self.turn_in_flight() {
            debug!(
                target = "chorus::conversation",
                phase = ?self.phase,
                event = "snapshot_ignored"
            );
            return;
        }

        self.phase = TurnPhase::Streaming;
        self.splice(records);
    }

    /// Applies the final closed snapshot once more and completes the turn,
    /// releasing the in-flight lock. Idempotent with the last
    /// [`apply_snapshot`](Self::apply_snapshot) call.
    pub fn complete(&mut self, final_records: &[MessageRecord]) {
        if !self.turn_in_flight() {
            debug!(
                target = "chorus::conversation",
                phase = ?self.phase,
                event = "completion_ignored"
            );
            return;
        }

        self.splice(final_records);
        self.phase = TurnPhase::Completed;
        info!(
            target = "chorus::conversation",
            records = final_records.len(),
            event = "turn_completed"
        );
    }

    /// Fails the turn: splices whatever closed partial content exists (shown
    /// content is never erased), then appends one synthetic closed fallback
    /// record signaling the disruption. The cause is logged, not propagated.
    pub fn fail(&mut self, final_records: &[MessageRecord], cause: &dyn fmt::Display) {
        if !self.turn_in_flight() {
            debug!(
                target = "chorus::conversation",
                phase = ?self.phase,
                event = "failure_ignored"
            );
            return;
        }

        self.splice(final_records);
        self.history.push(MessageRecord::agent(
            MessageId::new(),
            PersonaId::new(FALLBACK_SPEAKER_ID),
            STREAM_FAILURE_NOTICE,
            false,
            message::current_unix_timestamp(),
        ));
        self.phase = TurnPhase::Failed;
        error!(
            target = "chorus::conversation",
            cause = %cause,
            partial_records = final_records.len(),
            event = "turn_failed"
        );
    }

    /// The full ordered history.
    pub fn history(&self) -> &[MessageRecord] {
        &self.history
    }

    /// Current phase of the latest turn.
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// True while a turn is awaiting or streaming.
    pub fn turn_in_flight(&self) -> bool {
        matches!(self.phase, TurnPhase::Awaiting | TurnPhase::Streaming)
    }

    fn splice(&mut self, records: &[MessageRecord]) {
        self.history.splice(
            self.splice_at..self.splice_at + self.spliced,
            records.iter().cloned(),
        );
        self.spliced = records.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::PersonaId;

    fn agent_record(speaker: &str, text: &str, open: bool) -> MessageRecord {
        MessageRecord::agent(MessageId::new(), PersonaId::new(speaker), text, open, 1)
    }

    #[test]
    fn test_submit_appends_closed_user_record() {
        let mut conversation = Conversation::new();

        assert!(conversation.submit("hello").is_accepted());
        assert_eq!(conversation.history().len(), 1);
        assert_eq!(conversation.history()[0].role, Role::User);
        assert!(!conversation.history()[0].open);
        assert_eq!(conversation.phase(), TurnPhase::Awaiting);
    }

    #[test]
    fn test_second_submit_rejected_while_in_flight() {
        let mut conversation = Conversation::new();
        conversation.submit("first");

        assert_eq!(conversation.submit("second"), SubmitOutcome::Rejected);
        assert_eq!(conversation.history().len(), 1);

        conversation.apply_snapshot(&[agent_record("a", "hi", true)]);
        assert_eq!(conversation.submit("third"), SubmitOutcome::Rejected);
    }

    #[test]
    fn test_snapshot_splice_replaces_wholesale() {
        let mut conversation = Conversation::new();
        conversation.submit("hello");

        conversation.apply_snapshot(&[agent_record("a", "h", true)]);
        assert_eq!(conversation.phase(), TurnPhase::Streaming);
        assert_eq!(conversation.history().len(), 2);

        conversation.apply_snapshot(&[
            agent_record("a", "hi", false),
            agent_record("b", "yo", true),
        ]);
        assert_eq!(conversation.history().len(), 3);
        assert_eq!(conversation.history()[1].text, "hi");
        assert_eq!(conversation.history()[2].text, "yo");
    }

    #[test]
    fn test_complete_releases_the_lock() {
        let mut conversation = Conversation::new();
        conversation.submit("hello");
        conversation.apply_snapshot(&[agent_record("a", "hi", true)]);

        conversation.complete(&[agent_record("a", "hi", false)]);
        assert_eq!(conversation.phase(), TurnPhase::Completed);
        assert!(!conversation.turn_in_flight());
        assert!(conversation.history().iter().all(|r| !r.open));

        assert!(conversation.submit("again").is_accepted());
    }

    #[test]
    fn test_failure_before_any_delta_appends_fallback_only() {
        let mut conversation = Conversation::new();
        conversation.submit("x");

        conversation.fail(&[], &"connection reset");

        let history = conversation.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "x");
        assert_eq!(
            history[1].speaker.as_ref().map(|s| s.as_str()),
            Some(FALLBACK_SPEAKER_ID)
        );
        assert_eq!(history[1].text, STREAM_FAILURE_NOTICE);
        assert!(history.iter().all(|r| !r.open));
        assert_eq!(conversation.phase(), TurnPhase::Failed);
    }

    #[test]
    fn test_failure_keeps_partial_content() {
        let mut conversation = Conversation::new();
        conversation.submit("x");
        conversation.apply_snapshot(&[agent_record("a", "partial", true)]);

        conversation.fail(&[agent_record("a", "partial", false)], &"boom");

        let history = conversation.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].text, "partial");
        assert!(!history[1].open);
        assert_eq!(history[2].text, STREAM_FAILURE_NOTICE);
    }

    #[test]
    fn test_finished_turn_is_untouchable() {
        let mut conversation = Conversation::new();
        conversation.submit("hello");
        conversation.complete(&[agent_record("a", "hi", false)]);

        let before = conversation.history().to_vec();
        conversation.apply_snapshot(&[agent_record("b", "late", true)]);
        conversation.fail(&[], &"late failure");

        assert_eq!(conversation.history(), &before[..]);
        assert_eq!(conversation.phase(), TurnPhase::Completed);
    }

    #[test]
    fn test_next_turn_splices_after_its_own_user_record() {
        let mut conversation = Conversation::new();
        conversation.submit("one");
        conversation.complete(&[agent_record("a", "first", false)]);

        conversation.submit("two");
        conversation.apply_snapshot(&[agent_record("b", "second", true)]);
        conversation.complete(&[agent_record("b", "second", false)]);

        let texts: Vec<&str> = conversation
            .history()
            .iter()
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(texts, vec!["one", "first", "two", "second"]);
    }
}
