//! Incremental bubble parser for speaker-tagged streams.
//!
//! [`SpeakerParser::parse`] is a pure function of the cumulative raw text and
//! the active roster: it carries no state between calls, so the accumulator
//! can simply re-run it over the whole buffer after every delta and always
//! get output consistent with the true cumulative text. The contract the
//! rest of the crate leans on:
//!
//! - **Idempotent**: identical input yields structurally identical output.
//! - **Monotonic prefix**: appending fragments never changes an already
//!   closed bubble; only the trailing open bubble (if any) may change.
//! - **Single open**: at most the last bubble is open, and only when the
//!   buffer ends inside an unterminated segment.

use super::grammar::{CLOSE_MARKER, OPEN_PREFIX, OPENING_PATTERN};
use crate::persona::{PersonaId, Roster};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One parsed segment of a reply stream: who is speaking, what has arrived
/// so far, and whether the segment has been closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    /// The roster id carried by the opening marker.
    pub speaker: PersonaId,

    /// Segment content, trimmed at both ends. May be empty.
    pub text: String,

    /// True once the matching closing marker has arrived. An open bubble may
    /// still grow or change; a closed one never does.
    pub closed: bool,
}

/// Splits cumulative raw model output into ordered per-persona bubbles.
///
/// The parser value only holds the compiled opening-marker pattern; all
/// per-call state lives on the stack, which is what keeps `parse` pure.
#[derive(Debug, Clone)]
pub struct SpeakerParser {
    opening: Regex,
}

impl SpeakerParser {
    /// Creates a parser with the compiled marker pattern.
    pub fn new() -> Self {
        Self {
            opening: Regex::new(OPENING_PATTERN).expect("opening marker pattern is valid"),
        }
    }

    /// Parses the cumulative text received so far against the active roster.
    ///
    /// Scans left to right. Each complete opening marker whose id is active
    /// begins a segment; the segment runs to the first `[END]` after it
    /// (closed) or to the end of the input (open). Markers with unknown ids
    /// are skipped whole, and the text they would govern is discarded rather
    /// than shown as a fallback bubble. Text before the first marker and
    /// between segments is discarded the same way.
    pub fn parse(&self, raw: &str, roster: &Roster) -> Vec<Bubble> {
        let mut bubbles = Vec::new();
        let mut cursor = 0;

        while let Some(marker) = self.opening.find_at(raw, cursor) {
            let id = &raw[marker.start() + OPEN_PREFIX.len()..marker.end() - 1];
            if !roster.is_active(id) {
                debug!(
                    target = "chorus::stream",
                    persona = id,
                    offset = marker.start(),
                    event = "segment_dropped"
                );
                cursor = marker.end();
                continue;
            }

            let content_start = marker.end();
            match raw[content_start..].find(CLOSE_MARKER) {
                Some(rel) => {
                    bubbles.push(Bubble {
                        speaker: PersonaId::new(id),
                        text: raw[content_start..content_start + rel].trim().to_string(),
                        closed: true,
                    });
                    cursor = content_start + rel + CLOSE_MARKER.len();
                }
                None => {
                    // Unterminated tail segment: everything to the end of the
                    // buffer belongs to it, including any half-arrived marker.
                    bubbles.push(Bubble {
                        speaker: PersonaId::new(id),
                        text: raw[content_start..].trim().to_string(),
                        closed: false,
                    });
                    break;
                }
            }
        }

        bubbles
    }
}

impl Default for SpeakerParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Persona;

    fn roster_ab() -> Roster {
        Roster::new()
            .with_persona(Persona::new("a", "Alice", "First voice."))
            .with_persona(Persona::new("b", "Bruno", "Second voice."))
    }

    fn parse(raw: &str) -> Vec<Bubble> {
        SpeakerParser::new().parse(raw, &roster_ab())
    }

    #[test]
    fn test_single_closed_segment() {
        let bubbles = parse("[START:a]hi[END]");

        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].speaker.as_str(), "a");
        assert_eq!(bubbles[0].text, "hi");
        assert!(bubbles[0].closed);
    }

    #[test]
    fn test_unterminated_segment_stays_open() {
        let bubbles = parse("[START:a]hi");

        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].text, "hi");
        assert!(!bubbles[0].closed);
    }

    #[test]
    fn test_two_segments_in_order() {
        let bubbles = parse("[START:a]hi[END][START:b]yo[END]");

        assert_eq!(bubbles.len(), 2);
        assert_eq!(bubbles[0].speaker.as_str(), "a");
        assert_eq!(bubbles[0].text, "hi");
        assert!(bubbles[0].closed);
        assert_eq!(bubbles[1].speaker.as_str(), "b");
        assert_eq!(bubbles[1].text, "yo");
        assert!(bubbles[1].closed);
    }

    #[test]
    fn test_unknown_id_yields_nothing() {
        assert!(parse("[START:c]nope[END]").is_empty());
    }

    #[test]
    fn test_preamble_and_trailing_text_discarded() {
        let bubbles = parse("random preamble [START:a]hi[END] trailing");

        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].speaker.as_str(), "a");
        assert_eq!(bubbles[0].text, "hi");
        assert!(bubbles[0].closed);
    }

    #[test]
    fn test_zero_matches_on_plain_text() {
        assert!(parse("no markers anywhere").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_content_is_trimmed() {
        let bubbles = parse("[START:a]  spaced out \n[END]");
        assert_eq!(bubbles[0].text, "spaced out");
    }

    #[test]
    fn test_empty_segments_keep_state_distinction() {
        let closed = parse("[START:a][END]");
        assert_eq!(closed[0].text, "");
        assert!(closed[0].closed);

        let open = parse("[START:a]");
        assert_eq!(open[0].text, "");
        assert!(!open[0].closed);
    }

    #[test]
    fn test_same_persona_twice_is_two_bubbles() {
        let bubbles = parse("[START:a]one[END][START:a]two[END]");

        assert_eq!(bubbles.len(), 2);
        assert_eq!(bubbles[0].text, "one");
        assert_eq!(bubbles[1].text, "two");
    }

    #[test]
    fn test_partial_marker_at_tail_is_not_a_bubble() {
        // The id is still being typed; it must not show up as a record.
        let bubbles = parse("[START:a]hi[END][START:b");
        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].speaker.as_str(), "a");

        // Once the marker completes, the second bubble appears.
        let bubbles = parse("[START:a]hi[END][START:b]");
        assert_eq!(bubbles.len(), 2);
        assert!(!bubbles[1].closed);
    }

    #[test]
    fn test_partial_marker_inside_open_segment_is_content() {
        let bubbles = parse("[START:a]hi[STA");

        assert_eq!(bubbles.len(), 1);
        assert!(!bubbles[0].closed);
        assert_eq!(bubbles[0].text, "hi[STA");
    }

    #[test]
    fn test_unknown_marker_does_not_hide_later_valid_one() {
        let bubbles = parse("[START:c]x[START:a]hi[END]");

        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].speaker.as_str(), "a");
        assert_eq!(bubbles[0].text, "hi");
    }

    #[test]
    fn test_opening_marker_does_not_close_previous_segment() {
        // Segments do not nest and a new opening marker is not a terminator:
        // an unterminated segment swallows everything to the end of input.
        let bubbles = parse("[START:a]hi[START:b]yo");

        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].text, "hi[START:b]yo");
        assert!(!bubbles[0].closed);
    }

    #[test]
    fn test_idempotent_parse() {
        let raw = "[START:a]hi[END][START:b]partial";
        let parser = SpeakerParser::new();
        let roster = roster_ab();

        assert_eq!(parser.parse(raw, &roster), parser.parse(raw, &roster));
    }

    #[test]
    fn test_only_last_bubble_may_be_open() {
        let bubbles = parse("[START:a]one[END][START:b]two[END][START:a]tail");

        let open: Vec<usize> = bubbles
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.closed)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(open, vec![bubbles.len() - 1]);
    }
}
