//! Post model and the projection from raw CMS documents

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::reading_time;
use crate::cms::{parse_timestamp, RawDocument};
use crate::helpers::post_path;

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Slug (the document uid)
    pub slug: String,

    /// CMS document id
    pub id: String,

    /// First publication date, absent for documents never published
    pub first_publication_date: Option<DateTime<FixedOffset>>,

    /// Last publication date
    pub last_publication_date: Option<DateTime<FixedOffset>>,

    pub title: String,

    pub subtitle: String,

    pub author: String,

    /// Banner image URL
    pub banner_url: String,

    /// Content sections in document order
    pub content: Vec<ContentBlock>,
}

/// A content section: a heading followed by rich-text fragments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<RichTextFragment>,
}

/// One rich-text element (paragraph, heading, list item, image, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichTextFragment {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
    pub spans: Vec<Span>,
    /// Image source for `image` fragments, embedded URL for `embed`
    pub url: Option<String>,
    pub alt: Option<String>,
    /// Provider markup for `embed` fragments
    pub embed_html: Option<String>,
}

/// Inline formatting over a character range of a fragment's text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    /// Link target for `hyperlink` spans
    pub url: Option<String>,
}

/// Title and slug of a neighbouring post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewLink {
    pub title: String,
    pub slug: String,
}

impl Post {
    /// Project a raw document onto the post fields.
    ///
    /// Fields that are absent or have an unexpected shape come out empty;
    /// nothing here fails.
    pub fn from_raw(raw: &RawDocument) -> Self {
        let data = &raw.data;
        let slug = raw.uid.clone().unwrap_or_default();

        Self {
            first_publication_date: timestamp(raw.first_publication_date.as_deref(), &slug),
            last_publication_date: timestamp(raw.last_publication_date.as_deref(), &slug),
            id: raw.id.clone().unwrap_or_default(),
            title: plain_text(data.get("title")),
            subtitle: plain_text(data.get("subtitle")),
            author: plain_text(data.get("author")),
            banner_url: data
                .get("banner")
                .and_then(|banner| banner.get("url"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            content: data
                .get("content")
                .and_then(Value::as_array)
                .map(|blocks| blocks.iter().map(ContentBlock::from_raw).collect())
                .unwrap_or_default(),
            slug,
        }
    }

    /// Estimated reading time in minutes
    pub fn reading_time(&self) -> u32 {
        reading_time::estimate(&self.content)
    }

    /// URL path of the post page (without root)
    pub fn path(&self) -> String {
        post_path(&self.slug)
    }

    pub fn preview_link(&self) -> PreviewLink {
        PreviewLink {
            title: self.title.clone(),
            slug: self.slug.clone(),
        }
    }
}

impl ContentBlock {
    fn from_raw(value: &Value) -> Self {
        Self {
            heading: plain_text(value.get("heading")),
            body: value
                .get("body")
                .and_then(Value::as_array)
                .map(|fragments| fragments.iter().map(RichTextFragment::from_raw).collect())
                .unwrap_or_default(),
        }
    }
}

impl RichTextFragment {
    fn from_raw(value: &Value) -> Self {
        let oembed = value.get("oembed");
        Self {
            kind: str_field(value, "type").unwrap_or("paragraph").to_string(),
            text: str_field(value, "text").map(String::from),
            spans: value
                .get("spans")
                .and_then(Value::as_array)
                .map(|spans| spans.iter().filter_map(Span::from_raw).collect())
                .unwrap_or_default(),
            url: str_field(value, "url")
                .or_else(|| oembed.and_then(|o| str_field(o, "embed_url")))
                .map(String::from),
            alt: str_field(value, "alt").map(String::from),
            embed_html: oembed.and_then(|o| str_field(o, "html")).map(String::from),
        }
    }
}

impl Span {
    fn from_raw(value: &Value) -> Option<Self> {
        let start = value.get("start")?.as_u64()? as usize;
        let end = value.get("end")?.as_u64()? as usize;

        Some(Self {
            start,
            end,
            kind: str_field(value, "type").unwrap_or_default().to_string(),
            url: value
                .get("data")
                .and_then(|data| str_field(data, "url"))
                .map(String::from),
        })
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Plain text of a field that may be a string or a rich-text array
fn plain_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(fragments)) => fragments
            .iter()
            .filter_map(|fragment| str_field(fragment, "text"))
            .collect::<Vec<_>>()
            .join(" "),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn timestamp(raw: Option<&str>, slug: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        tracing::warn!("Ignoring unparsable date {:?} on post '{}'", raw, slug);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_post() -> RawDocument {
        serde_json::from_value(json!({
            "id": "YF1",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-19T19:25:28+0000",
            "tags": ["ignored"],
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira",
                "banner": {"url": "https://images.prismic.io/banner.png", "dimensions": {}},
                "content": [
                    {
                        "heading": "Proin et varius",
                        "body": [
                            {"type": "paragraph", "text": "Lorem ipsum", "spans": []},
                            {"type": "list-item", "text": "dolor", "spans": [
                                {"start": 0, "end": 5, "type": "strong"}
                            ]}
                        ]
                    },
                    {
                        "heading": "Cras laoreet",
                        "body": [{"type": "paragraph", "text": "Nullam dolor sit amet"}]
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_projection() {
        let post = Post::from_raw(&raw_post());
        assert_eq!(post.slug, "como-utilizar-hooks");
        assert_eq!(post.id, "YF1");
        assert_eq!(post.title, "Como utilizar Hooks");
        assert_eq!(post.author, "Joseph Oliveira");
        assert_eq!(post.banner_url, "https://images.prismic.io/banner.png");
        assert!(post.first_publication_date.is_some());
        assert!(post.last_publication_date.is_some());
        assert_eq!(post.path(), "post/como-utilizar-hooks/");
    }

    #[test]
    fn test_preserves_block_and_fragment_order() {
        let post = Post::from_raw(&raw_post());
        let headings: Vec<_> = post.content.iter().map(|b| b.heading.as_str()).collect();
        assert_eq!(headings, vec!["Proin et varius", "Cras laoreet"]);

        let body = &post.content[0].body;
        assert_eq!(body[0].text.as_deref(), Some("Lorem ipsum"));
        assert_eq!(body[1].kind, "list-item");
        assert_eq!(body[1].spans[0].kind, "strong");
    }

    #[test]
    fn test_null_publication_date_stays_null() {
        let mut raw = raw_post();
        raw.first_publication_date = None;
        let post = Post::from_raw(&raw);
        assert_eq!(post.first_publication_date, None);
    }

    #[test]
    fn test_normalizing_twice_is_equal() {
        let raw = raw_post();
        assert_eq!(Post::from_raw(&raw), Post::from_raw(&raw));
    }

    #[test]
    fn test_malformed_fields_become_empty() {
        let raw: RawDocument = serde_json::from_value(json!({
            "uid": "broken",
            "first_publication_date": "not a date",
            "data": {
                "title": [{"type": "heading1", "text": "Rich"}, {"type": "heading1", "text": "Title"}],
                "banner": "nope",
                "content": [
                    {"heading": null, "body": [{"type": "paragraph"}, 42]},
                    {"body": "not a list"}
                ]
            }
        }))
        .unwrap();

        let post = Post::from_raw(&raw);
        assert_eq!(post.title, "Rich Title");
        assert_eq!(post.subtitle, "");
        assert_eq!(post.banner_url, "");
        assert_eq!(post.first_publication_date, None);
        assert_eq!(post.content.len(), 2);
        assert_eq!(post.content[0].heading, "");
        assert_eq!(post.content[0].body.len(), 2);
        assert_eq!(post.content[0].body[0].text, None);
        assert!(post.content[1].body.is_empty());
    }
}
