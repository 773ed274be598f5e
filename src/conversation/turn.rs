//! Per-turn accumulation of streamed model output.
//!
//! A [`TurnAccumulator`] owns the cumulative raw text for one turn. On every
//! delta it re-parses the whole buffer and publishes the derived records as a
//! full snapshot replacement. Re-parsing from scratch instead of keeping
//! resumable parser state trades O(n²) rescans for output that is always
//! consistent with the true cumulative text; model turns are short and the
//! target runtime is a single-viewer UI, so the trade is cheap.

use super::message::{MessageId, MessageRecord, current_unix_timestamp};
use crate::persona::Roster;
use crate::stream::SpeakerParser;
use tracing::debug;

/// Accumulates one turn's deltas and derives its agent records.
#[derive(Debug)]
pub struct TurnAccumulator {
    parser: SpeakerParser,
    roster: Roster,
    buffer: String,
    // Identity per segment ordinal. Bubbles never disappear from a prefix of
    // an append-only buffer, so assigning ids by ordinal keeps every bubble's
    // identity and creation time stable across snapshot replacements.
    identities: Vec<(MessageId, u64)>,
    snapshot: Vec<MessageRecord>,
    finished: bool,
}

impl TurnAccumulator {
    /// Starts a turn with an empty buffer against a roster snapshot.
    ///
    /// The roster is cloned in: the active set is immutable for the lifetime
    /// of a turn regardless of what the session does between turns.
    pub fn new(roster: Roster) -> Self {
        Self {
            parser: SpeakerParser::new(),
            roster,
            buffer: String::new(),
            identities: Vec::new(),
            snapshot: Vec::new(),
            finished: false,
        }
    }

    /// Appends a fragment, re-parses the cumulative buffer, and returns the
    /// new snapshot. Ignored after [`finish`](Self::finish).
    pub fn push_delta(&mut self, fragment: &str) -> &[MessageRecord] {
        if self.finished {
            debug!(
                target = "chorus::turn",
                event = "delta_after_finish_ignored"
            );
            return &self.snapshot;
        }

        self.buffer.push_str(fragment);
        self.rebuild();
        &self.snapshot
    }

    /// Finalizes the turn: every record is closed, including a trailing
    /// segment the stream never terminated. Content already shown is kept,
    /// never discarded.
    pub fn finish(&mut self) -> &[MessageRecord] {
        self.finished = true;
        for record in &mut self.snapshot {
            record.close();
        }
        &self.snapshot
    }

    /// The current derived records.
    pub fn snapshot(&self) -> &[MessageRecord] {
        &self.snapshot
    }

    /// The cumulative raw text received so far.
    pub fn raw(&self) -> &str {
        &self.buffer
    }

    fn rebuild(&mut self) {
        let bubbles = self.parser.parse(&self.buffer, &self.roster);
        while self.identities.len() < bubbles.len() {
            self.identities.push((MessageId::new(), current_unix_timestamp()));
        }

        self.snapshot = bubbles
            .into_iter()
            .enumerate()
            .map(|(ordinal, bubble)| {
                let (id, created_at) = self.identities[ordinal];
                MessageRecord::agent(id, bubble.speaker, bubble.text, !bubble.closed, created_at)
            })
            .collect();
    }
}
