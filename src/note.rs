//! Turning finished messages into persisted notes.
//!
//! A note is clipped from exactly one closed agent record at the user's
//! request. The mapping is deterministic and side-effect free; durable
//! storage lives behind [`NoteSink`], which the embedding application owns.

use crate::conversation::MessageRecord;
use crate::persona::{PersonaId, Roster};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Unique identifier for notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(u64);

static NOTE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl NoteId {
    /// Creates a new unique note id.
    pub fn new() -> Self {
        Self(NOTE_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns the inner id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a record could not become a note, or why storage failed.
#[derive(Debug, Error)]
pub enum NoteError {
    /// User records cannot become notes.
    #[error("user-authored records cannot become notes")]
    UserAuthored,

    /// Open records are still growing and cannot be snapshotted.
    #[error("record is still streaming")]
    StillStreaming,

    /// The record's speaker is not in the roster, so the note cannot be
    /// attributed.
    #[error("unknown persona id: {0}")]
    UnknownPersona(PersonaId),

    /// The persistence sink failed.
    #[error("note storage failed: {0}")]
    Storage(String),
}

/// A persisted clipping from one closed agent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identity for removal and last-write-wins storage.
    pub id: NoteId,

    /// The record's text at clipping time.
    pub content: String,

    /// Deterministic tags: the source persona's display name, lowercased.
    pub tags: BTreeSet<String>,

    /// Creation timestamp, Unix seconds.
    pub created_at: u64,

    /// The persona that spoke the clipped record.
    pub source_persona: PersonaId,
}

impl Note {
    /// Clips a note from a closed agent record.
    ///
    /// Rejected for user records (no speaker), records that are still
    /// streaming, and speakers missing from the roster. No side effects;
    /// handing the note to a [`NoteSink`] is the caller's business.
    pub fn from_record(record: &MessageRecord, roster: &Roster) -> Result<Self, NoteError> {
        let speaker = record.speaker.as_ref().ok_or(NoteError::UserAuthored)?;
        if record.open {
            return Err(NoteError::StillStreaming);
        }
        let persona = roster
            .get(speaker)
            .ok_or_else(|| NoteError::UnknownPersona(speaker.clone()))?;

        let mut tags = BTreeSet::new();
        tags.insert(persona.name.to_lowercase());

        Ok(Self {
            id: NoteId::new(),
            content: record.text.clone(),
            tags,
            created_at: crate::conversation::message::current_unix_timestamp(),
            source_persona: speaker.clone(),
        })
    }
}

/// Durable storage boundary for notes. Last-write-wins; no transactional
/// guarantees beyond what the medium provides.
#[async_trait::async_trait]
pub trait NoteSink: Send + Sync {
    /// Stores a note.
    async fn store(&self, note: Note) -> Result<(), NoteError>;

    /// Removes a note by id. Removing an unknown id is not an error.
    async fn remove(&self, id: NoteId) -> Result<(), NoteError>;
}
