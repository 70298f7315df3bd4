//! Built-in site templates using the Tera template engine
//!
//! The templates are embedded in the binary; the context types below are
//! what the generator hands them.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("fallback.html", include_str!("site/fallback.html")),
            (
                "partials/style.html",
                include_str!("site/partials/style.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub language: String,
    pub root: String,
}

/// A post as shown in the listing
#[derive(Debug, Clone, Serialize)]
pub struct PostSummaryData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub date_xml: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    /// 1-based number of the listing page
    pub current: usize,
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub title: String,
    pub author: String,
    pub banner_url: String,
    pub date: String,
    pub date_xml: String,
    pub reading_time: u32,
    pub blocks: Vec<BlockData>,
}

/// A content section with its body already rendered to HTML
#[derive(Debug, Clone, Serialize)]
pub struct BlockData {
    pub heading: String,
    pub anchor: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub url: String,
}
