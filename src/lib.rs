//! `chorus` - a multi-voice streaming chat core.
//!
//! This library is the heart of a chat client in which several "active"
//! persona agents converse with one user inside a single shared thread. One
//! upstream model call produces one combined text stream; the model tags who
//! is speaking inline, and `chorus` splits that stream into discrete,
//! order-preserving message bubbles as bytes arrive, then reduces them into
//! a linear history that never flickers, duplicates, or drops content
//! between deltas.
//!
//! The moving parts, leaves first:
//!
//! - [`stream::grammar`]: the wire micro-format (`[START:<id>]` ... `[END]`)
//!   and its matching rule.
//! - [`stream::SpeakerParser`]: a pure, idempotent re-parse of the cumulative
//!   buffer into per-persona [`stream::Bubble`]s, safe on any partial input.
//! - [`conversation::TurnAccumulator`]: owns one turn's growing buffer and
//!   derives its live record snapshot after every delta.
//! - [`conversation::Conversation`]: the reducer that splices snapshots into
//!   the persistent history behind an explicit turn state machine.
//! - [`session::ChatSession`]: the event loop driving a
//!   [`service::ModelService`] delta stream through all of the above.
//! - [`note`]: clipping one finished record into a persisted [`note::Note`].
//!
//! Rendering, roster storage, note persistence, and the model call itself
//! stay outside the crate, behind the interfaces in [`service`], [`persona`],
//! and [`note`].

pub mod conversation;
pub mod note;
pub mod observability;
pub mod persona;
pub mod prompt;
pub mod service;
pub mod session;
pub mod stream;

pub use conversation::{
    Conversation, MessageId, MessageRecord, Role, SubmitOutcome, TurnAccumulator, TurnPhase,
};
pub use note::{Note, NoteError, NoteId, NoteSink};
pub use persona::{Persona, PersonaId, Roster};
pub use service::{DeltaStream, ModelService, ServiceError, TranscriptEntry, TurnRequest};
pub use session::{ChatSession, SessionConfig, TurnOutcome};
pub use stream::{Bubble, SpeakerParser};

/// Splits cumulative raw model output into ordered per-persona bubbles.
///
/// Thin convenience over [`SpeakerParser`] for callers that do not hold a
/// parser around.
///
/// # Example
///
/// ```
/// use chorus::{Persona, Roster, split_stream};
///
/// let roster = Roster::new()
///     .with_persona(Persona::new("a", "Alice", "First voice."));
///
/// let bubbles = split_stream("[START:a]hi[END]", &roster);
/// assert_eq!(bubbles.len(), 1);
/// assert_eq!(bubbles[0].text, "hi");
/// assert!(bubbles[0].closed);
/// ```
pub fn split_stream(raw: &str, roster: &Roster) -> Vec<Bubble> {
    SpeakerParser::new().parse(raw, roster)
}
