//! Speaker-tagged stream handling.
//!
//! The model replies to one turn with a single combined text stream in which
//! it marks who is speaking using the wire micro-format defined in
//! [`grammar`]. The [`parser`] splits the cumulative raw text into ordered
//! per-persona bubbles, tolerating every partial state a byte stream can be
//! caught in (mid-marker, mid-id, unterminated segment).

pub mod grammar;
pub mod parser;

pub use parser::{Bubble, SpeakerParser};
