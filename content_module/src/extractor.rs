//! Section extraction for loosely formatted generated text.
//!
//! Raw model output is expected to follow a marker vocabulary such as
//! `Topic:` / `Passage:` / `Questions:` / `Answer Key:`. Markers are matched
//! case-insensitively as literal substrings; the first occurrence of each
//! marker wins, even when the marker text also appears inside body content.
//! When the first two markers are both absent, extraction degrades to a
//! single fallback segment covering the whole input.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ContentError;

/// One named slice of raw input bounded by two markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    pub text: String,
}

/// Result of running the extractor over one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    /// One segment per registered marker, in registry order. Markers that
    /// were not found yield empty segments.
    Matched(Vec<Segment>),
    /// The leading markers were absent; the whole input is kept verbatim so
    /// downstream code can render it as pre-formatted text.
    Fallback(String),
}

/// Split `raw` into one segment per marker.
///
/// For marker `i` the segment runs from just after its first occurrence to
/// just before the first occurrence of any later registered marker (or to
/// the end of the text). The marker's own label residue (emphasis
/// asterisks, a trailing colon) is stripped from the captured text.
pub fn extract_sections(raw: &str, markers: &[&str]) -> Segmentation {
    let located: Vec<Option<usize>> = markers
        .iter()
        .map(|marker| find_ignore_ascii_case(raw, marker))
        .collect();

    if markers.len() >= 2 && located[0].is_none() && located[1].is_none() {
        warn!(
            "{}; keeping whole input as one segment (leading markers {:?})",
            ContentError::MalformedInput,
            &markers[..2]
        );
        return Segmentation::Fallback(raw.to_string());
    }

    let mut missing = Vec::new();
    let mut segments = Vec::with_capacity(markers.len());
    for (index, marker) in markers.iter().enumerate() {
        let start = match located[index] {
            Some(start) => start,
            None => {
                missing.push(marker.to_string());
                segments.push(Segment {
                    name: marker_name(marker),
                    text: String::new(),
                });
                continue;
            }
        };
        let body_start = start + marker.len();
        let next = located[index + 1..].iter().flatten().copied().next();
        let end = match next {
            Some(pos) if pos >= body_start => pos,
            // A later marker occurred before this one; the segment between
            // them does not exist.
            Some(_) => body_start,
            None => raw.len(),
        };
        segments.push(Segment {
            name: marker_name(marker),
            text: strip_label_residue(&raw[body_start..end]),
        });
    }

    if !missing.is_empty() {
        warn!("{}", ContentError::ParseDegraded { missing });
    }
    Segmentation::Matched(segments)
}

/// Locate `needle` in `haystack` ignoring ASCII case, as a byte offset.
///
/// Byte-wise scanning keeps offsets valid on non-ASCII input, unlike
/// lowercasing the haystack first.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let hay = haystack.as_bytes();
    let ned = needle.as_bytes();
    hay.windows(ned.len())
        .position(|window| window.eq_ignore_ascii_case(ned))
}

/// The display name of a marker: the marker string without its trailing colon.
fn marker_name(marker: &str) -> String {
    marker.trim_end_matches(':').trim().to_string()
}

/// Remove what is left of the marker label at the start of a captured
/// segment: emphasis asterisks and a colon, in either order, then
/// surrounding whitespace.
fn strip_label_residue(text: &str) -> String {
    let rest = text.trim_start();
    let rest = rest.trim_start_matches('*');
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    let rest = rest.trim_start_matches('*');
    rest.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const READING_MARKERS: [&str; 4] = ["Topic:", "Passage:", "Questions:", "Answer Key:"];

    fn matched(raw: &str, markers: &[&str]) -> Vec<Segment> {
        match extract_sections(raw, markers) {
            Segmentation::Matched(segments) => segments,
            Segmentation::Fallback(_) => panic!("expected matched segmentation"),
        }
    }

    #[test]
    fn extracts_all_sections_in_order() {
        let raw = "Topic:\nFood Safety\n\nPassage:\nLine1\n\nQuestions:\n1. Q?\nA. x\n\nAnswer Key:\n1. A";
        let segments = matched(raw, &READING_MARKERS);

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].name, "Topic");
        assert_eq!(segments[0].text, "Food Safety");
        assert_eq!(segments[1].text, "Line1");
        assert!(segments[2].text.contains("1. Q?"));
        assert!(segments[2].text.contains("A. x"));
        assert_eq!(segments[3].text, "1. A");
    }

    #[test]
    fn markers_match_case_insensitively() {
        let raw = "TOPIC: Water\n\npassage: Rivers flow.\n\nquestions: none\n\nANSWER KEY: none";
        let segments = matched(raw, &READING_MARKERS);
        assert_eq!(segments[0].text, "Water");
        assert_eq!(segments[1].text, "Rivers flow.");
    }

    #[test]
    fn markers_without_colon_still_strip_the_colon() {
        let raw = "Topic:\nFood Safety\n\nPassage:\nLine1\n\nQuestions:\nnone\n\nAnswer Key:\nnone";
        let segments = matched(raw, &["Topic", "Passage", "Questions", "Answer Key"]);
        assert_eq!(segments[0].text, "Food Safety");
        assert_eq!(segments[1].text, "Line1");
    }

    #[test]
    fn emphasised_marker_labels_are_stripped() {
        let raw = "**Topic:** Cities\n\n**Passage:** Urban growth.\n\nQuestions: none\n\nAnswer Key: none";
        let segments = matched(raw, &READING_MARKERS);
        assert_eq!(segments[0].text, "Cities");
        assert_eq!(segments[1].text, "Urban growth.");
    }

    #[test]
    fn missing_non_first_marker_yields_empty_segment() {
        let raw = "Topic: Trade\n\nPassage: Ships carry goods.\n\nAnswer Key: 1. B";
        let segments = matched(raw, &READING_MARKERS);
        assert_eq!(segments[2].name, "Questions");
        assert_eq!(segments[2].text, "");
        assert_eq!(segments[1].text, "Ships carry goods.");
        assert_eq!(segments[3].text, "1. B");
    }

    #[test]
    fn missing_first_two_markers_falls_back_to_whole_input() {
        let raw = "The model ignored the requested format entirely.";
        match extract_sections(raw, &READING_MARKERS) {
            Segmentation::Fallback(text) => assert_eq!(text, raw),
            Segmentation::Matched(_) => panic!("expected fallback segmentation"),
        }
    }

    #[test]
    fn first_marker_alone_is_enough_to_stay_structured() {
        let raw = "Topic: Bees\nThey pollinate crops.";
        let segments = matched(raw, &READING_MARKERS);
        assert!(segments[0].text.contains("Bees"));
        assert_eq!(segments[1].text, "");
    }

    #[test]
    fn marker_text_inside_body_first_occurrence_wins() {
        // "Questions:" appears inside the passage body before the real
        // questions section; the first occurrence is taken as the boundary.
        let raw = "Topic: Exams\n\nPassage: Questions: about exams confuse people.\n\nQuestions: 1. Why?\n\nAnswer Key: 1. A";
        let segments = matched(raw, &READING_MARKERS);
        assert_eq!(segments[1].text, "");
        assert!(segments[2].text.starts_with("about exams"));
    }

    #[test]
    fn last_segment_runs_to_end_of_text() {
        let raw = "Topic: X\n\nPassage: Y\n\nQuestions: Z\n\nAnswer Key: 1. C\n2. D";
        let segments = matched(raw, &READING_MARKERS);
        assert_eq!(segments[3].text, "1. C\n2. D");
    }
}
