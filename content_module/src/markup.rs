//! Translation of lightweight inline markup into typed formatted blocks.
//!
//! Generated text carries a markdown-lite vocabulary: `**bold**` emphasis,
//! bullet lines, numbered `**term**: definition` entries, labeled strategy
//! headers and a pair of two-column info headers. Each segment is classified
//! into exactly one [`Shape`] and handed to the matching sub-formatter.
//!
//! All raw text is HTML-escaped before any structural markup is inserted, so
//! model-supplied text cannot inject tags. Escaping leaves existing
//! character entities alone, which makes translating already-translated
//! plain text a fixed point.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One typed, renderable unit of translated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormattedBlock {
    Paragraph {
        text: String,
    },
    List {
        items: Vec<String>,
    },
    DefinitionItem {
        term: String,
        fields: Vec<(String, String)>,
    },
    TwoColumnInfo {
        left_title: String,
        left_items: Vec<String>,
        right_title: String,
        right_items: Vec<String>,
    },
    LabeledBlock {
        label: String,
        body: String,
    },
}

/// The classification of a segment, deciding which sub-formatter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Plain,
    ParagraphSummary,
    Vocabulary,
    TwoColumnInfo,
    Strategy,
}

static PARAGRAPH_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\*{0,2}paragraph\s+\d+\s*:").unwrap());

static VOCAB_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s*\*{0,2}[^:*\n]+\*{0,2}\s*:").unwrap());

static STRATEGY_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)strategy\s+\d+").unwrap());

static STRATEGY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\*{0,2}strategy\s+(\d+)\s*:?\s*\*{0,2}\s*:?\s*(.*)$").unwrap()
});

static PARAGRAPH_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\*{0,2}paragraph\s+(\d+)\s*:?\s*\*{0,2}\s*:?\s*(.*)$").unwrap()
});

static DEFINITION_HEADER_BOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+\.\s*)?\*\*([^*]+?)\s*:?\s*\*\*\s*:?\s*(.*)$").unwrap()
});

static DEFINITION_HEADER_PLAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\.\s*([^:\n]{1,60}?)\s*:\s+(.*)$").unwrap()
});

static EMPHASIS_STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

static EMPHASIS_EM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+?)\*").unwrap());

/// Field labels recognized inside a definition item.
const DEFINITION_FIELD_LABELS: [&str; 4] = [
    "Example",
    "Academic usage",
    "Vietnamese Meaning",
    "Definition & Meaning in Context",
];

const EXPLICIT_HEADER: &str = "Explicit Information";
const IMPLICIT_HEADER: &str = "Implicit Information";

/// Classify one segment into exactly one shape.
///
/// Anchors are checked in priority order; a segment that merely mentions a
/// keyword (for example the word "Strategy" in passing prose) is classified
/// by that keyword all the same. This is a known fragility of keyword
/// classification, pinned by tests rather than worked around.
pub fn classify_shape(text: &str) -> Shape {
    if PARAGRAPH_ANCHOR.is_match(text) {
        Shape::ParagraphSummary
    } else if VOCAB_ANCHOR.is_match(text) {
        Shape::Vocabulary
    } else if contains_ignore_ascii_case(text, EXPLICIT_HEADER)
        || contains_ignore_ascii_case(text, IMPLICIT_HEADER)
    {
        Shape::TwoColumnInfo
    } else if STRATEGY_ANCHOR.is_match(text) {
        Shape::Strategy
    } else {
        Shape::Plain
    }
}

/// Translate one segment into an ordered list of formatted blocks.
///
/// When `hint` is `None` the shape is classified from the text once.
pub fn translate_segment(text: &str, hint: Option<Shape>) -> Vec<FormattedBlock> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let shape = hint.unwrap_or_else(|| classify_shape(text));
    match shape {
        Shape::Plain => format_plain(text),
        Shape::ParagraphSummary => format_labeled(text, &PARAGRAPH_HEADER, "Paragraph"),
        Shape::Vocabulary => format_vocabulary(text),
        Shape::TwoColumnInfo => format_two_column(text),
        Shape::Strategy => format_labeled(text, &STRATEGY_HEADER, "Strategy"),
    }
}

/// Escape text for HTML output, then re-insert emphasis spans.
///
/// `**text**` is processed before `*text*` so the double form is never
/// double-processed.
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let mut out = String::with_capacity(escaped.len());
    let mut last = 0;
    // Strong spans are carved out first so their content is never
    // re-processed by the single-asterisk pass.
    for caps in EMPHASIS_STRONG.captures_iter(&escaped) {
        if let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) {
            out.push_str(&apply_em(&escaped[last..whole.start()]));
            out.push_str("<strong>");
            out.push_str(inner.as_str());
            out.push_str("</strong>");
            last = whole.end();
        }
    }
    out.push_str(&apply_em(&escaped[last..]));
    out
}

fn apply_em(text: &str) -> String {
    EMPHASIS_EM.replace_all(text, "<em>$1</em>").into_owned()
}

/// HTML-escape `text`, leaving existing character entities intact.
///
/// Entity preservation makes the escape idempotent: escaping
/// already-escaped text returns it unchanged, so re-translating translated
/// output does not accumulate `&amp;amp;` chains.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.char_indices().peekable();
    while let Some((index, ch)) = rest.next() {
        match ch {
            '&' => {
                if is_entity_start(&text[index..]) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Whether `text` (starting with `&`) opens a character entity like
/// `&amp;` or `&#39;`.
fn is_entity_start(text: &str) -> bool {
    let body = &text[1..];
    let semicolon = match body.find(';') {
        Some(pos) if pos > 0 && pos <= 9 => pos,
        _ => return false,
    };
    let name = &body[..semicolon];
    if let Some(digits) = name.strip_prefix('#') {
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    } else {
        name.bytes().all(|b| b.is_ascii_alphabetic())
    }
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Line starting a bullet item, if any: `•` or `-` followed by content.
fn bullet_body(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix('•')
        .or_else(|| trimmed.strip_prefix('-'))
        .map(str::trim)
        .filter(|body| !body.is_empty())
}

/// Plain shape: paragraphs separated by blank lines, with runs of bullet
/// lines collected into list blocks.
fn format_plain(text: &str) -> Vec<FormattedBlock> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut list: Vec<String> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_list(&mut blocks, &mut list);
            flush_paragraph(&mut blocks, &mut paragraph);
            continue;
        }
        if let Some(body) = bullet_body(trimmed) {
            flush_paragraph(&mut blocks, &mut paragraph);
            list.push(render_inline(body));
        } else {
            flush_list(&mut blocks, &mut list);
            paragraph.push(render_inline(trimmed));
        }
    }
    flush_list(&mut blocks, &mut list);
    flush_paragraph(&mut blocks, &mut paragraph);
    blocks
}

fn flush_paragraph(blocks: &mut Vec<FormattedBlock>, paragraph: &mut Vec<String>) {
    if !paragraph.is_empty() {
        blocks.push(FormattedBlock::Paragraph {
            text: paragraph.join("\n"),
        });
        paragraph.clear();
    }
}

fn flush_list(blocks: &mut Vec<FormattedBlock>, list: &mut Vec<String>) {
    if !list.is_empty() {
        blocks.push(FormattedBlock::List {
            items: std::mem::take(list),
        });
    }
}

/// Vocabulary shape: `<N>. **term**: description` headers open definition
/// items; recognized label lines add fields; anything else while an item is
/// open continues the most recent field.
fn format_vocabulary(text: &str) -> Vec<FormattedBlock> {
    let mut preamble: Vec<String> = Vec::new();
    let mut items: Vec<(String, Vec<(String, String)>)> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((term, description)) = definition_header(trimmed) {
            let mut fields = Vec::new();
            if !description.is_empty() {
                fields.push(("Definition".to_string(), render_inline(&description)));
            }
            items.push((escape_html(&term), fields));
            continue;
        }
        if let Some((label, value)) = definition_field(trimmed) {
            if let Some((_, fields)) = items.last_mut() {
                fields.push((label, render_inline(&value)));
                continue;
            }
        }
        match items.last_mut() {
            Some((_, fields)) => {
                // Continuation of the most recent field; never dropped.
                let rendered = render_inline(trimmed);
                match fields.last_mut() {
                    Some((_, value)) => {
                        value.push(' ');
                        value.push_str(&rendered);
                    }
                    None => fields.push(("Definition".to_string(), rendered)),
                }
            }
            None => preamble.push(trimmed.to_string()),
        }
    }

    let mut blocks = format_preamble(&preamble);
    blocks.extend(
        items
            .into_iter()
            .map(|(term, fields)| FormattedBlock::DefinitionItem { term, fields }),
    );
    blocks
}

/// Match a definition header line, returning `(term, description)`.
fn definition_header(line: &str) -> Option<(String, String)> {
    if let Some(caps) = DEFINITION_HEADER_BOLD.captures(line) {
        return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
    }
    if let Some(caps) = DEFINITION_HEADER_PLAIN.captures(line) {
        return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
    }
    None
}

/// Match a known field label line, returning `(canonical_label, value)`.
fn definition_field(line: &str) -> Option<(String, String)> {
    let stripped = line.trim().trim_start_matches('*').trim_start();
    for label in DEFINITION_FIELD_LABELS {
        if stripped.len() >= label.len()
            && stripped.as_bytes()[..label.len()].eq_ignore_ascii_case(label.as_bytes())
        {
            let rest = stripped[label.len()..]
                .trim_start_matches('*')
                .trim_start()
                .strip_prefix(':')
                .map(|value| value.trim_start_matches('*').trim())
                .unwrap_or("");
            if rest.is_empty() && !stripped[label.len()..].trim_start().starts_with(':') {
                continue;
            }
            return Some((label.to_string(), rest.to_string()));
        }
    }
    None
}

/// Two-column shape: the two known headers open their columns; lines are
/// appended as items to whichever column is open.
fn format_two_column(text: &str) -> Vec<FormattedBlock> {
    #[derive(Clone, Copy)]
    enum Column {
        Left,
        Right,
    }

    let mut preamble: Vec<String> = Vec::new();
    let mut left_items: Vec<String> = Vec::new();
    let mut right_items: Vec<String> = Vec::new();
    let mut open: Option<Column> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_column_header(trimmed, EXPLICIT_HEADER) {
            open = Some(Column::Left);
            continue;
        }
        if is_column_header(trimmed, IMPLICIT_HEADER) {
            open = Some(Column::Right);
            continue;
        }
        let item = render_inline(bullet_body(trimmed).unwrap_or(trimmed));
        match open {
            Some(Column::Left) => left_items.push(item),
            Some(Column::Right) => right_items.push(item),
            None => preamble.push(trimmed.to_string()),
        }
    }

    let mut blocks = format_preamble(&preamble);
    blocks.push(FormattedBlock::TwoColumnInfo {
        left_title: EXPLICIT_HEADER.to_string(),
        left_items,
        right_title: IMPLICIT_HEADER.to_string(),
        right_items,
    });
    blocks
}

/// Whether a line is one of the two column headers, allowing emphasis
/// asterisks and a trailing colon around the header text.
fn is_column_header(line: &str, header: &str) -> bool {
    let stripped = line
        .trim()
        .trim_matches('*')
        .trim()
        .trim_end_matches(':')
        .trim();
    stripped.eq_ignore_ascii_case(header)
}

/// Strategy and paragraph-summary shapes: `<Label> <N>:` headers open a
/// labeled block; following non-header lines extend the open block's body.
fn format_labeled(text: &str, header: &Regex, label_word: &str) -> Vec<FormattedBlock> {
    let mut preamble: Vec<String> = Vec::new();
    let mut open: Option<(String, Vec<String>)> = None;
    let mut blocks_after: Vec<FormattedBlock> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(caps) = header.captures(trimmed) {
            if let Some((label, body)) = open.take() {
                blocks_after.push(FormattedBlock::LabeledBlock {
                    label,
                    body: body.join("\n"),
                });
            }
            let label = format!("{} {}:", label_word, &caps[1]);
            let initial = caps[2].trim();
            let mut body = Vec::new();
            if !initial.is_empty() {
                body.push(render_inline(initial));
            }
            open = Some((label, body));
            continue;
        }
        match open.as_mut() {
            Some((_, body)) => body.push(render_inline(trimmed)),
            None => preamble.push(trimmed.to_string()),
        }
    }
    if let Some((label, body)) = open.take() {
        blocks_after.push(FormattedBlock::LabeledBlock {
            label,
            body: body.join("\n"),
        });
    }

    let mut blocks = format_preamble(&preamble);
    blocks.extend(blocks_after);
    blocks
}

/// Lines seen before the first structural header are rendered as plain
/// paragraphs rather than dropped.
fn format_preamble(lines: &[String]) -> Vec<FormattedBlock> {
    if lines.is_empty() {
        Vec::new()
    } else {
        format_plain(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_becomes_single_paragraph() {
        let blocks = translate_segment("Just a sentence.", None);
        assert_eq!(
            blocks,
            vec![FormattedBlock::Paragraph {
                text: "Just a sentence.".to_string()
            }]
        );
    }

    #[test]
    fn translation_is_idempotent_on_token_free_text() {
        let input = "Fish &amp; chips cost less than 5 pounds.";
        let first = translate_segment(input, None);
        let text = match &first[0] {
            FormattedBlock::Paragraph { text } => text.clone(),
            other => panic!("expected paragraph, got {:?}", other),
        };
        let second = translate_segment(&text, None);
        assert_eq!(first, second);
    }

    #[test]
    fn double_emphasis_yields_single_strong_span() {
        let blocks = translate_segment("This is **very <important>** indeed.", None);
        match &blocks[0] {
            FormattedBlock::Paragraph { text } => {
                assert_eq!(
                    text,
                    "This is <strong>very &lt;important&gt;</strong> indeed."
                );
                assert_eq!(text.matches("<strong>").count(), 1);
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn double_form_takes_precedence_over_single() {
        let rendered = render_inline("**a*b*c**");
        assert_eq!(rendered, "<strong>a*b*c</strong>");
    }

    #[test]
    fn single_emphasis_becomes_em_span() {
        assert_eq!(render_inline("an *aside* here"), "an <em>aside</em> here");
    }

    #[test]
    fn escape_leaves_existing_entities_alone() {
        assert_eq!(escape_html("&amp; &#39; & <"), "&amp; &#39; &amp; &lt;");
    }

    #[test]
    fn bullet_run_becomes_one_list_block() {
        let text = "Intro line.\n• first point\n• second point\nClosing line.";
        let blocks = translate_segment(text, Some(Shape::Plain));
        assert_eq!(blocks.len(), 3);
        match &blocks[1] {
            FormattedBlock::List { items } => {
                assert_eq!(items, &vec!["first point".to_string(), "second point".to_string()]);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn hyphen_bullets_are_recognized() {
        let blocks = translate_segment("- one\n- two", Some(Shape::Plain));
        assert_eq!(
            blocks,
            vec![FormattedBlock::List {
                items: vec!["one".to_string(), "two".to_string()]
            }]
        );
    }

    #[test]
    fn classification_priority_is_fixed() {
        assert_eq!(
            classify_shape("**Paragraph 1:** Summary with Strategy 2 mentioned."),
            Shape::ParagraphSummary
        );
        assert_eq!(
            classify_shape("1. **make a decision**: to choose"),
            Shape::Vocabulary
        );
        assert_eq!(
            classify_shape("**Explicit Information:**\n• stated fact"),
            Shape::TwoColumnInfo
        );
        assert_eq!(
            classify_shape("**Strategy 1:** Read the question first."),
            Shape::Strategy
        );
        assert_eq!(classify_shape("Nothing special here."), Shape::Plain);
    }

    #[test]
    fn passing_mention_of_strategy_still_classifies_as_strategy() {
        // Keyword classification is deliberately naive; this pins the
        // current behavior.
        assert_eq!(
            classify_shape("A good strategy 1 step at a time."),
            Shape::Strategy
        );
    }

    #[test]
    fn strategy_header_opens_labeled_block() {
        let blocks = translate_segment("**Strategy 1:** Read the question first.", None);
        assert_eq!(
            blocks,
            vec![FormattedBlock::LabeledBlock {
                label: "Strategy 1:".to_string(),
                body: "Read the question first.".to_string()
            }]
        );
    }

    #[test]
    fn strategy_bodies_extend_until_next_header() {
        let text = "**Strategy 1:** Skim first.\nThen scan for keywords.\n**Strategy 2:** Eliminate wrong options.";
        let blocks = translate_segment(text, Some(Shape::Strategy));
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            FormattedBlock::LabeledBlock { label, body } => {
                assert_eq!(label, "Strategy 1:");
                assert_eq!(body, "Skim first.\nThen scan for keywords.");
            }
            other => panic!("expected labeled block, got {:?}", other),
        }
    }

    #[test]
    fn paragraph_summary_produces_labeled_blocks() {
        let text = "**Paragraph 1:** Introduces the topic.\n**Paragraph 2:** Develops the argument.";
        let blocks = translate_segment(text, None);
        assert_eq!(blocks.len(), 2);
        match &blocks[1] {
            FormattedBlock::LabeledBlock { label, body } => {
                assert_eq!(label, "Paragraph 2:");
                assert_eq!(body, "Develops the argument.");
            }
            other => panic!("expected labeled block, got {:?}", other),
        }
    }

    #[test]
    fn definition_items_collect_known_fields() {
        let text = "1. **make a decision**: to choose between options\n*Example:* The board will make a decision.\n*Academic usage:* common in reports\nVietnamese Meaning: đưa ra quyết định";
        let blocks = translate_segment(text, None);
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            FormattedBlock::DefinitionItem { term, fields } => {
                assert_eq!(term, "make a decision");
                assert_eq!(fields[0].0, "Definition");
                assert_eq!(fields[0].1, "to choose between options");
                assert_eq!(fields[1].0, "Example");
                assert_eq!(fields[1].1, "The board will make a decision.");
                assert_eq!(fields[2].0, "Academic usage");
                assert_eq!(fields[3].0, "Vietnamese Meaning");
                assert_eq!(fields[3].1, "đưa ra quyết định");
            }
            other => panic!("expected definition item, got {:?}", other),
        }
    }

    #[test]
    fn unrecognized_line_continues_last_field() {
        let text = "1. **inventory**: goods held in stock\n*Example:* The warehouse tracks inventory.\nIt is counted quarterly.";
        let blocks = translate_segment(text, Some(Shape::Vocabulary));
        match &blocks[0] {
            FormattedBlock::DefinitionItem { fields, .. } => {
                assert_eq!(
                    fields[1].1,
                    "The warehouse tracks inventory. It is counted quarterly."
                );
            }
            other => panic!("expected definition item, got {:?}", other),
        }
    }

    #[test]
    fn colon_inside_bold_term_still_parses() {
        let text = "**supply chain:** the network of producers and carriers";
        let blocks = translate_segment(text, Some(Shape::Vocabulary));
        match &blocks[0] {
            FormattedBlock::DefinitionItem { term, fields } => {
                assert_eq!(term, "supply chain");
                assert_eq!(fields[0].1, "the network of producers and carriers");
            }
            other => panic!("expected definition item, got {:?}", other),
        }
    }

    #[test]
    fn two_column_headers_route_items() {
        let text = "**Explicit Information:**\n• stated fact one\n• stated fact two\n**Implicit Information:**\n• implied point";
        let blocks = translate_segment(text, None);
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            FormattedBlock::TwoColumnInfo {
                left_title,
                left_items,
                right_title,
                right_items,
            } => {
                assert_eq!(left_title, "Explicit Information");
                assert_eq!(left_items.len(), 2);
                assert_eq!(right_title, "Implicit Information");
                assert_eq!(right_items, &vec!["implied point".to_string()]);
            }
            other => panic!("expected two-column info, got {:?}", other),
        }
    }

    #[test]
    fn two_column_preamble_is_kept_as_paragraph() {
        let text = "The passage mixes both kinds.\n**Explicit Information:**\n• a fact";
        let blocks = translate_segment(text, Some(Shape::TwoColumnInfo));
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], FormattedBlock::Paragraph { .. }));
    }

    #[test]
    fn empty_segment_translates_to_nothing() {
        assert!(translate_segment("   \n  ", None).is_empty());
    }

    #[test]
    fn script_injection_is_escaped_before_markup() {
        let blocks = translate_segment("**<script>alert(1)</script>**", None);
        match &blocks[0] {
            FormattedBlock::Paragraph { text } => {
                assert!(!text.contains("<script>"));
                assert!(text.contains("<strong>&lt;script&gt;"));
            }
            other => panic!("expected paragraph, got {:?}", other),
        }
    }
}
