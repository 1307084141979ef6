//! HTML rendering for assembled documents.
//!
//! Block text arrives already escaped with inline `<strong>`/`<em>` markup
//! applied, so rendering only wraps blocks in structural tags and slots the
//! result into an email template.

use content_module::{escape_html, FormattedBlock, RenderedDocument, RenderedSection};

/// Built-in email shell used when no template file is configured.
/// Placeholders: `{{DATE}}`, `{{CONTENT}}`, `{{GENERATION_DATE}}`.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  body { font-family: Georgia, 'Times New Roman', serif; color: #2c3e50; max-width: 720px; margin: 0 auto; padding: 24px; }
  h1 { font-size: 22px; border-bottom: 2px solid #2c6e49; padding-bottom: 8px; }
  h2 { font-size: 18px; color: #2c6e49; margin-top: 28px; }
  p { line-height: 1.6; }
  ul { line-height: 1.6; }
  .card { background: #f6f8f7; border-left: 4px solid #2c6e49; padding: 12px 16px; margin: 12px 0; }
  .card p { margin: 4px 0; }
  .columns { width: 100%; border-collapse: collapse; }
  .columns td { vertical-align: top; width: 50%; padding: 8px 12px; border: 1px solid #d8e0dc; }
  .footer { margin-top: 32px; font-size: 12px; color: #8a9a93; }
</style>
</head>
<body>
<h1>Daily English Practice &mdash; {{DATE}}</h1>
{{CONTENT}}
<p class="footer">Generated on {{GENERATION_DATE}}.</p>
</body>
</html>
"#;

/// Render one document to an HTML fragment: an `<h2>` per section followed
/// by its blocks.
pub fn render_document(document: &RenderedDocument) -> String {
    render_sections(&document.sections)
}

/// Render a bare list of sections, for digests composed outside the
/// assembler.
pub fn render_sections(sections: &[RenderedSection]) -> String {
    let mut html = String::new();
    for section in sections {
        if section.blocks.is_empty() {
            continue;
        }
        html.push_str("<h2>");
        html.push_str(&escape_html(&section.title));
        html.push_str("</h2>\n");
        for block in &section.blocks {
            render_block(&mut html, block);
        }
    }
    html
}

fn render_block(html: &mut String, block: &FormattedBlock) {
    match block {
        FormattedBlock::Paragraph { text } => {
            html.push_str("<p>");
            html.push_str(&text.replace('\n', "<br>\n"));
            html.push_str("</p>\n");
        }
        FormattedBlock::List { items } => {
            html.push_str("<ul>\n");
            for item in items {
                html.push_str("<li>");
                html.push_str(item);
                html.push_str("</li>\n");
            }
            html.push_str("</ul>\n");
        }
        FormattedBlock::DefinitionItem { term, fields } => {
            html.push_str("<div class=\"card\">\n<p><strong>");
            html.push_str(term);
            html.push_str("</strong></p>\n");
            for (label, value) in fields {
                html.push_str("<p><em>");
                html.push_str(label);
                html.push_str(":</em> ");
                html.push_str(value);
                html.push_str("</p>\n");
            }
            html.push_str("</div>\n");
        }
        FormattedBlock::TwoColumnInfo {
            left_title,
            left_items,
            right_title,
            right_items,
        } => {
            html.push_str("<table class=\"columns\">\n<tr>");
            for title in [left_title, right_title] {
                html.push_str("<td><strong>");
                html.push_str(title);
                html.push_str("</strong></td>");
            }
            html.push_str("</tr>\n<tr>");
            for items in [left_items, right_items] {
                html.push_str("<td><ul>\n");
                for item in items {
                    html.push_str("<li>");
                    html.push_str(item);
                    html.push_str("</li>\n");
                }
                html.push_str("</ul></td>");
            }
            html.push_str("</tr>\n</table>\n");
        }
        FormattedBlock::LabeledBlock { label, body } => {
            html.push_str("<p><strong>");
            html.push_str(label);
            html.push_str("</strong> ");
            html.push_str(body);
            html.push_str("</p>\n");
        }
    }
}

/// Fill the template placeholders with the rendered content.
///
/// `template` falls back to [`DEFAULT_TEMPLATE`] when `None`. Dates are
/// substituted verbatim; the caller formats them.
pub fn build_email_html(
    template: Option<&str>,
    display_date: &str,
    content: &str,
    generation_date: &str,
) -> String {
    template
        .unwrap_or(DEFAULT_TEMPLATE)
        .replace("{{DATE}}", display_date)
        .replace("{{CONTENT}}", content)
        .replace("{{GENERATION_DATE}}", generation_date)
}
