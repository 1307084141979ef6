//! Prompt templates for the daily content jobs.
//!
//! Every template spells out the exact section markers the extractor is
//! registered with, so a well-behaved model produces directly parseable
//! output and a misbehaving one degrades to the whole-text fallback.

use std::collections::HashSet;

pub const READING_PRACTICE: &str = "\
Write an IELTS-style reading practice for an upper-intermediate English learner.
Use exactly these sections, each starting on its own line with the label shown:

Topic: a short title for the passage
Passage: a 4 paragraph academic passage of about 350 words
Questions: 5 multiple-choice comprehension questions with options A-D
Answer Key: the correct letter for each question with a one-line justification";

pub const LISTENING_PRACTICE: &str = "\
Write an IELTS-style listening practice script for an upper-intermediate
English learner. Use exactly these sections, each starting on its own line
with the label shown:

Topic: a short title
Monologue: a 2 minute monologue by a single speaker, everyday academic context
Key Vocabulary: 5 numbered terms, each as **term**: definition, with an
Example: sentence on the following line
Comprehension Questions: 5 short-answer questions about the monologue";

/// Prompt for explaining previously generated practice material.
pub fn explanation_prompt(practice: &str) -> String {
    format!(
        "\
Explain the following reading practice for an upper-intermediate English
learner. Use exactly these sections, each starting on its own line with the
label shown:

Main Idea & Purpose: two or three sentences
Paragraph Summaries: one **Paragraph N:** line per paragraph
Key Collocations & Vocabulary: 5 numbered items, each as **term**: definition,
with Example: and Academic usage: lines
Implicit vs Explicit Information: an **Explicit Information:** bullet list and
an **Implicit Information:** bullet list
Question Strategy: numbered **Strategy N:** lines

The practice material:

{practice}"
    )
}

/// Prompt for a batch of new collocation cards as a JSON array.
///
/// The exclusion list is sorted so the same history produces the same
/// prompt.
pub fn collocation_prompt(count: usize, excluded: &HashSet<String>) -> String {
    let mut prompt = format!(
        "\
Generate {count} English collocations useful for academic writing, as a JSON
array only, no surrounding prose. Each element must have exactly these
fields: \"collocation\", \"meaning\", \"example\", \"academic_usage\"."
    );
    if !excluded.is_empty() {
        let mut known: Vec<&str> = excluded.iter().map(String::as_str).collect();
        known.sort_unstable();
        prompt.push_str("\n\nDo not repeat any of these collocations:\n");
        for item in known {
            prompt.push_str("- ");
            prompt.push_str(item);
            prompt.push('\n');
        }
    }
    prompt
}
