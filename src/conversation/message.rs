//! Domain model for conversation messages.
//!
//! A [`MessageRecord`] is one bubble in the rendered history. Records carry
//! an open/closed lifecycle: an open record is still receiving streamed
//! content and may change; a closed record is permanently immutable.

use crate::persona::PersonaId;
use crate::stream::grammar::{EMPTY_CLOSED_PLACEHOLDER, EMPTY_OPEN_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
pub(crate) fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time should be after UNIX_EPOCH")
        .as_secs()
}

/// Unique identifier for message records.
///
/// Uses an atomic counter for simplicity; identity only needs to be unique
/// within one process, which is all a single-viewer chat client requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

static MESSAGE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl MessageId {
    /// Creates a new unique message id.
    pub fn new() -> Self {
        Self(MESSAGE_ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns the inner id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who authored a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Typed by the user. Always created closed.
    User,
    /// Streamed from a persona (or synthesized by the reducer on failure).
    Agent,
}

/// One message bubble in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique identity, stable across snapshot replacements within a turn.
    pub id: MessageId,

    /// Author role.
    pub role: Role,

    /// Speaking persona; `None` for user records.
    pub speaker: Option<PersonaId>,

    /// Content as streamed so far (trimmed segment text for agent records).
    pub text: String,

    /// Creation timestamp, Unix seconds.
    pub created_at: u64,

    /// True while the record may still grow or change. Once false the record
    /// is immutable.
    pub open: bool,
}

impl MessageRecord {
    /// Creates a closed user record.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            speaker: None,
            text: text.into(),
            created_at: current_unix_timestamp(),
            open: false,
        }
    }

    /// Creates an agent record with an explicit identity.
    ///
    /// The accumulator re-derives the whole snapshot on every delta; passing
    /// the id and timestamp in keeps a bubble's identity stable across those
    /// replacements.
    pub fn agent(
        id: MessageId,
        speaker: PersonaId,
        text: impl Into<String>,
        open: bool,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            role: Role::Agent,
            speaker: Some(speaker),
            text: text.into(),
            created_at,
            open,
        }
    }

    /// Marks the record closed.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Text for the rendering layer: the content, or the placeholder for an
    /// empty bubble. The open/closed placeholder distinction is part of the
    /// core contract; the strings themselves are defaults.
    pub fn display_text(&self) -> &str {
        if !self.text.is_empty() {
            &self.text
        } else if self.open {
            EMPTY_OPEN_PLACEHOLDER
        } else {
            EMPTY_CLOSED_PLACEHOLDER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_uniqueness() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn test_user_record_is_closed_with_no_speaker() {
        let record = MessageRecord::user("hello");

        assert_eq!(record.role, Role::User);
        assert!(record.speaker.is_none());
        assert!(!record.open);
        assert_eq!(record.text, "hello");
    }

    #[test]
    fn test_display_text_placeholders() {
        let id = MessageId::new();
        let speaker = PersonaId::new("a");

        let open = MessageRecord::agent(id, speaker.clone(), "", true, 0);
        assert_eq!(open.display_text(), EMPTY_OPEN_PLACEHOLDER);

        let closed = MessageRecord::agent(id, speaker.clone(), "", false, 0);
        assert_eq!(closed.display_text(), EMPTY_CLOSED_PLACEHOLDER);

        let with_text = MessageRecord::agent(id, speaker, "hi", true, 0);
        assert_eq!(with_text.display_text(), "hi");
    }

    #[test]
    fn test_close_is_sticky_state() {
        let mut record =
            MessageRecord::agent(MessageId::new(), PersonaId::new("a"), "hi", true, 7);
        record.close();
        assert!(!record.open);
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let record = MessageRecord::agent(MessageId::new(), PersonaId::new("a"), "hi", false, 42);

        let json = serde_json::to_string(&record).unwrap();
        let back: MessageRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back, record);
    }
}
