//! Rich text to HTML

use super::{RichTextFragment, Span};
use crate::helpers::html_escape;

/// Render fragments to HTML. Consecutive list items are wrapped in one
/// `<ul>` or `<ol>`.
pub fn as_html(fragments: &[RichTextFragment]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&str> = None;

    for fragment in fragments {
        let list = match fragment.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        html.push_str(&render_fragment(fragment));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_fragment(fragment: &RichTextFragment) -> String {
    let kind = fragment.kind.as_str();

    if let Some(level) = heading_level(kind) {
        return format!("<h{0}>{1}</h{0}>", level, inline(fragment));
    }

    match kind {
        "preformatted" => format!(
            "<pre>{}</pre>",
            html_escape(fragment.text.as_deref().unwrap_or_default())
        ),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inline(fragment)),
        "image" => match &fragment.url {
            Some(url) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(url),
                html_escape(fragment.alt.as_deref().unwrap_or_default())
            ),
            None => String::new(),
        },
        "embed" => match (&fragment.url, &fragment.embed_html) {
            (Some(url), Some(embed)) => format!(
                r#"<div data-oembed="{}">{}</div>"#,
                html_escape(url),
                embed
            ),
            _ => String::new(),
        },
        _ => format!("<p>{}</p>", inline(fragment)),
    }
}

fn heading_level(kind: &str) -> Option<u8> {
    kind.strip_prefix("heading")
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n))
}

/// Text with spans applied; newlines become `<br />`. Span offsets are
/// UTF-16 code units. Overlapping spans are split so the tags nest.
fn inline(fragment: &RichTextFragment) -> String {
    let text = fragment.text.as_deref().unwrap_or_default();
    let len = text.encode_utf16().count();
    let spans: Vec<&Span> = fragment
        .spans
        .iter()
        .filter(|s| s.start < s.end && s.end <= len && open_tag(s).is_some())
        .collect();

    let mut html = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut pos = 0;
    let mut buf = [0u8; 4];

    for c in text.chars() {
        reconcile(&mut html, &mut open, &spans, pos);

        if c == '\n' {
            html.push_str("<br />");
        } else {
            html.push_str(&html_escape(c.encode_utf8(&mut buf)));
        }
        pos += c.len_utf16();
    }

    for span in open.iter().rev() {
        html.push_str(close_tag(span));
    }

    html
}

fn covers(span: &Span, pos: usize) -> bool {
    span.start <= pos && pos < span.end
}

/// Close the open tags that no longer cover `pos` (and everything opened
/// inside them), then open the spans that do, longest first
fn reconcile<'a>(html: &mut String, open: &mut Vec<&'a Span>, spans: &[&'a Span], pos: usize) {
    let keep = open.iter().take_while(|s| covers(s, pos)).count();
    for span in open.drain(keep..).rev() {
        html.push_str(close_tag(span));
    }

    let mut opening: Vec<&Span> = spans
        .iter()
        .copied()
        .filter(|s| covers(s, pos) && !open.iter().any(|o| std::ptr::eq(*o, *s)))
        .collect();
    opening.sort_by(|a, b| b.end.cmp(&a.end));

    for span in opening {
        if let Some(tag) = open_tag(span) {
            html.push_str(&tag);
        }
        open.push(span);
    }
}

fn open_tag(span: &Span) -> Option<String> {
    match span.kind.as_str() {
        "strong" => Some("<strong>".to_string()),
        "em" => Some("<em>".to_string()),
        "hyperlink" => span.url.as_ref().map(|url| {
            format!(
                r#"<a href="{}" target="_blank" rel="noopener">"#,
                html_escape(url)
            )
        }),
        _ => None,
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        _ => "</a>",
    }
}
