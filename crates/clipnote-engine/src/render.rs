//! Template rendering: turning a template plus a live page into a note.

use once_cell::sync::Lazy;
use regex::Regex;

use clipnote_core::traits::PageHandle;
use clipnote_core::{NoteProperty, RenderedNote, Template};

use crate::expression::Expression;
use crate::filters;
use crate::source::ExtractionContext;

/// Non-greedy so adjacent tokens in one string stay separate.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.*?\}\}").unwrap());

/// Characters that are unsafe in note filenames.
static NAME_SANITIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());

/// Render a template against a page into a complete note.
///
/// Rendering is total: every resolution or filter failure degrades to an
/// empty substitution, so a note always comes out.
pub async fn render_note(template: &Template, page: &dyn PageHandle, url: &str) -> RenderedNote {
    let ctx = ExtractionContext::new(page, url);

    let mut properties = Vec::with_capacity(template.properties.len());
    for prop in &template.properties {
        properties.push(NoteProperty {
            name: prop.name.clone(),
            value: render_property_value(&ctx, &prop.value).await,
        });
    }

    let content = render_tokens(&ctx, &template.note_content_format).await;
    let name = sanitize_note_name(&render_tokens(&ctx, &template.note_name_format).await);
    let markdown = format!("{}{}", frontmatter(&properties), content);

    RenderedNote {
        name,
        properties,
        content,
        markdown,
    }
}

/// Substitute every `{{...}}` token in place, keeping surrounding literal
/// text.
async fn render_tokens(ctx: &ExtractionContext<'_>, input: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for m in TOKEN_RE.find_iter(input) {
        out.push_str(&input[last..m.start()]);
        out.push_str(&render_token(ctx, m.as_str()).await);
        last = m.end();
    }
    out.push_str(&input[last..]);
    out
}

/// A property string without any token renders to the empty string; the
/// declared value is a template, not a literal.
async fn render_property_value(ctx: &ExtractionContext<'_>, input: &str) -> String {
    if !TOKEN_RE.is_match(input) {
        return String::new();
    }
    render_tokens(ctx, input).await
}

async fn render_token(ctx: &ExtractionContext<'_>, token: &str) -> String {
    let expr = Expression::parse(token);
    let mut value = ctx.resolve(&expr.source).await;
    for inv in &expr.filters {
        value = filters::apply(value, inv);
    }
    value.render()
}

/// Strip filesystem-hostile characters from a note name.
pub fn sanitize_note_name(name: &str) -> String {
    let cleaned = NAME_SANITIZE_RE.replace_all(name, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "Untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Assemble the YAML frontmatter block. Multi-line values use `|` block
/// scalars with two-space indentation.
fn frontmatter(properties: &[NoteProperty]) -> String {
    if properties.is_empty() {
        return String::new();
    }
    let mut out = String::from("---\n");
    for prop in properties {
        if prop.value.contains('\n') {
            out.push_str(&prop.name);
            out.push_str(": |\n");
            for line in prop.value.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        } else {
            out.push_str(&prop.name);
            out.push_str(": ");
            out.push_str(&prop.value);
            out.push('\n');
        }
    }
    out.push_str("---\n\n");
    out
}
