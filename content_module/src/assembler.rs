//! Per-content-type assembly of raw generated text into renderable documents.
//!
//! Each content type registers its marker vocabulary and per-section shape
//! hints. Assembly runs the extractor, translates each segment, and
//! composes a [`RenderedDocument`]. The external contract is "always
//! returns a renderable document": any degraded path falls back to one
//! escaped paragraph wrapping the original text instead of failing.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::extractor::{extract_sections, Segmentation};
use crate::markup::{escape_html, translate_segment, FormattedBlock, Shape};

/// A content type with a registered marker vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A reading passage with comprehension questions and an answer key.
    ReadingPractice,
    /// A structured explanation of a previously generated passage.
    PassageExplanation,
    /// A listening monologue with key vocabulary and questions.
    ListeningPractice,
}

/// One registered section: its marker, display title and shape hint.
/// A `None` hint lets the translator classify the segment itself.
struct SectionSpec {
    marker: &'static str,
    title: &'static str,
    hint: Option<Shape>,
}

const READING_SECTIONS: [SectionSpec; 4] = [
    SectionSpec {
        marker: "Topic:",
        title: "Topic",
        hint: Some(Shape::Plain),
    },
    SectionSpec {
        marker: "Passage:",
        title: "Reading Passage",
        hint: Some(Shape::Plain),
    },
    SectionSpec {
        marker: "Questions:",
        title: "Comprehension Questions",
        hint: Some(Shape::Plain),
    },
    SectionSpec {
        marker: "Answer Key:",
        title: "Answer Key",
        hint: Some(Shape::Plain),
    },
];

const EXPLANATION_SECTIONS: [SectionSpec; 5] = [
    SectionSpec {
        marker: "Main Idea & Purpose:",
        title: "Main Idea & Purpose",
        hint: Some(Shape::Plain),
    },
    SectionSpec {
        marker: "Paragraph Summaries:",
        title: "Paragraph Summaries",
        hint: Some(Shape::ParagraphSummary),
    },
    SectionSpec {
        marker: "Key Collocations & Vocabulary:",
        title: "Key Collocations & Vocabulary",
        hint: Some(Shape::Vocabulary),
    },
    SectionSpec {
        marker: "Implicit vs Explicit Information:",
        title: "Implicit vs Explicit Information",
        hint: Some(Shape::TwoColumnInfo),
    },
    SectionSpec {
        marker: "Question Strategy:",
        title: "Question Strategy",
        hint: Some(Shape::Strategy),
    },
];

const LISTENING_SECTIONS: [SectionSpec; 4] = [
    SectionSpec {
        marker: "Topic:",
        title: "Topic",
        hint: Some(Shape::Plain),
    },
    SectionSpec {
        marker: "Monologue:",
        title: "Monologue",
        hint: Some(Shape::Plain),
    },
    SectionSpec {
        marker: "Key Vocabulary:",
        title: "Key Vocabulary",
        hint: Some(Shape::Vocabulary),
    },
    SectionSpec {
        marker: "Comprehension Questions:",
        title: "Comprehension Questions",
        hint: Some(Shape::Plain),
    },
];

impl ContentType {
    fn sections(&self) -> &'static [SectionSpec] {
        match self {
            ContentType::ReadingPractice => &READING_SECTIONS,
            ContentType::PassageExplanation => &EXPLANATION_SECTIONS,
            ContentType::ListeningPractice => &LISTENING_SECTIONS,
        }
    }

    /// The registered marker vocabulary, in order.
    pub fn markers(&self) -> Vec<&'static str> {
        self.sections().iter().map(|spec| spec.marker).collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContentType::ReadingPractice => "reading_practice",
            ContentType::PassageExplanation => "passage_explanation",
            ContentType::ListeningPractice => "listening_practice",
        }
    }
}

/// One named group of formatted blocks in a rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSection {
    pub title: String,
    pub blocks: Vec<FormattedBlock>,
}

/// The assembled output for one piece of raw generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub content_type: ContentType,
    pub sections: Vec<RenderedSection>,
    /// True when structured extraction failed and the document is a
    /// whole-text fallback.
    pub degraded: bool,
}

/// Assemble raw generated text into a renderable document.
///
/// Never fails: when structured segmentation is impossible the whole input
/// is kept as a single escaped pre-formatted paragraph, and the degraded
/// flag is set so callers can log the condition.
pub fn assemble(raw: &str, content_type: ContentType) -> RenderedDocument {
    let markers = content_type.markers();
    match extract_sections(raw, &markers) {
        Segmentation::Matched(segments) => {
            let sections = content_type
                .sections()
                .iter()
                .zip(segments.iter())
                .map(|(spec, segment)| RenderedSection {
                    title: spec.title.to_string(),
                    blocks: translate_segment(&segment.text, spec.hint),
                })
                .collect();
            RenderedDocument {
                content_type,
                sections,
                degraded: false,
            }
        }
        Segmentation::Fallback(text) => {
            warn!(
                "structured assembly failed for {}; delivering whole-text fallback",
                content_type.name()
            );
            fallback_document(&text, content_type)
        }
    }
}

/// A single-paragraph document wrapping the escaped original text.
fn fallback_document(raw: &str, content_type: ContentType) -> RenderedDocument {
    RenderedDocument {
        content_type,
        sections: vec![RenderedSection {
            title: "Full Content".to_string(),
            blocks: vec![FormattedBlock::Paragraph {
                text: escape_html(raw),
            }],
        }],
        degraded: true,
    }
}
