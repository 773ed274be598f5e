//! The wire micro-format for speaker-tagged model output.
//!
//! A reply stream is a flat sequence of *segments*. A segment begins with an
//! opening marker carrying a persona id and ends at the first closing marker
//! after it, or at the end of the buffer (still open). The rules:
//!
//! - An opening marker is well-formed only when the enclosed id exactly
//!   matches an active roster id (case-sensitive). Other occurrences are
//!   ignored entirely; the text they govern is never emitted.
//! - Segments do not nest. A later opening marker has no bearing on whether
//!   an earlier segment closed; only the closing marker closes a segment.
//! - Text outside any segment (preamble, trailing chatter) is discarded.

/// Prefix of an opening marker; the persona id follows, then [`OPEN_SUFFIX`].
pub const OPEN_PREFIX: &str = "[START:";

/// Terminator of an opening marker.
pub const OPEN_SUFFIX: char = ']';

/// The closing marker. Shared by all personas; the first occurrence after an
/// opening marker closes that segment.
pub const CLOSE_MARKER: &str = "[END]";

/// Default placeholder for a segment that closed without content.
pub const EMPTY_CLOSED_PLACEHOLDER: &str = "...";

/// Default placeholder for a segment that is still streaming and has no
/// content yet. The open/closed distinction is the contract; the rendering
/// layer may localize both strings.
pub const EMPTY_OPEN_PLACEHOLDER: &str = "thinking…";

/// Pattern matching one *complete* opening marker. The id capture is lazy
/// about validity on purpose: roster membership is checked by the parser, so
/// an unknown id is skipped as one whole marker occurrence. A marker whose
/// terminator has not arrived yet matches nothing at all, which is exactly
/// what keeps a half-typed id out of the output.
pub(crate) const OPENING_PATTERN: &str = r"\[START:([^\]]*)\]";

/// Formats the opening marker for an id, as the model is instructed to emit
/// it.
pub fn opening_marker(id: &str) -> String {
    format!("{OPEN_PREFIX}{id}{OPEN_SUFFIX}")
}
