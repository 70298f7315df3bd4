//! Generator module - renders listing and post pages with the built-in
//! Tera templates and writes them to the public directory

use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tera::Context;

use crate::cms::ContentSource;
use crate::comments;
use crate::content::{rich_text, Post, PostLoader, PostsPagination, PreviewLink};
use crate::helpers::{
    date_xml, format_optional_date, full_url_for, listing_path, locale_for, meta_generator,
    open_graph, post_path, url_for,
};
use crate::templates::{
    BlockData, ConfigData, NavPost, PaginationData, PostPageData, PostSummaryData,
    TemplateRenderer,
};
use crate::Blog;

/// Which content a render reads and how the page presents it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderMode {
    /// Content ref; `None` reads the published content
    pub reference: Option<String>,
    /// Show the exit-preview link
    pub preview: bool,
}

impl RenderMode {
    pub fn published() -> Self {
        Self::default()
    }

    /// Read content at a fixed ref, rendered like published pages
    pub fn at_ref(reference: Option<String>) -> Self {
        Self {
            reference,
            preview: false,
        }
    }

    pub fn preview(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            preview: true,
        }
    }
}

/// What a full generation wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub listing_pages: usize,
    pub posts: usize,
}

/// Static site generator using Tera templates
pub struct Generator<S> {
    blog: Blog,
    source: Arc<S>,
    renderer: TemplateRenderer,
    tz: Tz,
    locale: Locale,
}

impl<S: ContentSource> Generator<S> {
    /// Create a new generator
    pub fn new(blog: &Blog, source: Arc<S>) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;

        Ok(Self {
            tz: blog.config.tz(),
            locale: locale_for(&blog.config.language),
            blog: blog.clone(),
            source,
            renderer,
        })
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn loader(&self, mode: &RenderMode) -> PostLoader<'_, S> {
        PostLoader::new(self.source.as_ref(), &self.blog.config.cms.document_type)
            .with_reference(mode.reference.clone())
    }

    /// Generate the listing pages and every prebuilt post page
    pub async fn generate(&self, mode: &RenderMode) -> Result<GenerateReport> {
        fs::create_dir_all(&self.blog.public_dir)?;

        let listing_pages = self.generate_listing_pages(mode).await?;

        let slugs = self
            .loader(mode)
            .static_paths(self.blog.config.prebuild_paths)
            .await?;
        for slug in &slugs {
            let html = self.render_post(slug, mode).await?;
            let path = self.write_post(slug, &html)?;
            tracing::debug!("Generated: {:?}", path);
        }

        Ok(GenerateReport {
            listing_pages,
            posts: slugs.len(),
        })
    }

    /// Render and write the page of one post, as on-demand generation does
    pub async fn generate_post(&self, slug: &str) -> Result<PathBuf> {
        let html = self.render_post(slug, &RenderMode::published()).await?;
        let path = self.write_post(slug, &html)?;
        tracing::info!("Generated on demand: {:?}", path);
        Ok(path)
    }

    /// Listing page N holds the first page plus N-1 loaded follow-ups
    async fn generate_listing_pages(&self, mode: &RenderMode) -> Result<usize> {
        let mut pagination = self
            .loader(mode)
            .first_page(self.blog.config.per_page)
            .await?;
        let mut page = 1;

        loop {
            let html = self.render_listing_page(&pagination, page, mode)?;
            let output_path = self
                .blog
                .public_dir
                .join(listing_path(page))
                .join("index.html");
            write_file(&output_path, &html)?;
            tracing::debug!("Generated: {:?}", output_path);

            if !pagination.has_more() {
                break;
            }
            pagination.load_more(self.source.as_ref()).await?;
            page += 1;
        }

        Ok(page)
    }

    /// Render listing page `page` (1-based) without writing it
    pub async fn render_listing(&self, page: usize, mode: &RenderMode) -> Result<String> {
        let page = page.max(1);
        let mut pagination = self
            .loader(mode)
            .first_page(self.blog.config.per_page)
            .await?;

        for _ in 1..page {
            pagination.load_more(self.source.as_ref()).await?;
        }

        self.render_listing_page(&pagination, page, mode)
    }

    fn render_listing_page(
        &self,
        pagination: &PostsPagination,
        page: usize,
        mode: &RenderMode,
    ) -> Result<String> {
        let config = &self.blog.config;

        let posts: Vec<PostSummaryData> = pagination
            .results()
            .iter()
            .map(|post| self.build_summary(post))
            .collect();

        let next_link = pagination
            .has_more()
            .then(|| url_for(config, &listing_path(page + 1)));

        let mut context = self.create_base_context(mode);
        context.insert("head_meta", &meta_generator());
        context.insert("posts", &posts);
        context.insert(
            "pagination",
            &PaginationData {
                current: page,
                next_link,
            },
        );

        self.renderer.render("index.html", &context)
    }

    /// Render the page of one post without writing it
    pub async fn render_post(&self, slug: &str, mode: &RenderMode) -> Result<String> {
        let loader = self.loader(mode);
        let post = loader.get_by_uid(slug).await?;
        let adjacent = loader.adjacent(&post).await?;
        let config = &self.blog.config;

        let url = url_for(config, &post.path());
        let head_meta = format!(
            "{}\n{}",
            meta_generator(),
            open_graph(
                &post.title,
                &post.subtitle,
                &full_url_for(config, &post.path()),
                Some(post.banner_url.as_str()),
                &config.title,
            )
        );
        let comments = config
            .comments
            .widget()
            .map(|widget| comments::render(&widget, &url));

        let mut context = self.create_base_context(mode);
        context.insert("head_meta", &head_meta);
        context.insert("post", &self.build_post_page(&post));
        context.insert("prev_post", &adjacent.prev.map(|p| self.nav_post(&p)));
        context.insert("next_post", &adjacent.next.map(|p| self.nav_post(&p)));
        context.insert("comments", &comments);

        self.renderer.render("post.html", &context)
    }

    /// Placeholder served while a post is generated on demand
    pub fn render_fallback(&self, mode: &RenderMode) -> Result<String> {
        let mut context = self.create_base_context(mode);
        context.insert("head_meta", &meta_generator());
        self.renderer.render("fallback.html", &context)
    }

    /// Output file of a post page
    pub fn post_file(&self, slug: &str) -> Result<PathBuf> {
        if slug.is_empty() || slug == "." || slug == ".." || slug.contains(['/', '\\']) {
            bail!("Invalid post slug '{}'", slug);
        }
        Ok(self
            .blog
            .public_dir
            .join("post")
            .join(slug)
            .join("index.html"))
    }

    fn write_post(&self, slug: &str, html: &str) -> Result<PathBuf> {
        let path = self.post_file(slug)?;
        write_file(&path, html)?;
        Ok(path)
    }

    fn create_base_context(&self, mode: &RenderMode) -> Context {
        let config = &self.blog.config;

        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: config.title.clone(),
                subtitle: config.subtitle.clone(),
                description: config.description.clone(),
                language: config.language.clone(),
                root: url_for(config, ""),
            },
        );
        context.insert("preview", &mode.preview);
        context.insert("exit_preview_path", &config.preview.exit_path);
        context
    }

    fn build_summary(&self, post: &Post) -> PostSummaryData {
        let (date, date_xml) = self.dates(post.first_publication_date.as_ref());
        PostSummaryData {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date,
            date_xml,
            url: url_for(&self.blog.config, &post.path()),
        }
    }

    fn build_post_page(&self, post: &Post) -> PostPageData {
        let (date, date_xml) = self.dates(post.first_publication_date.as_ref());
        PostPageData {
            title: post.title.clone(),
            author: post.author.clone(),
            banner_url: post.banner_url.clone(),
            date,
            date_xml,
            reading_time: post.reading_time(),
            blocks: post
                .content
                .iter()
                .map(|block| BlockData {
                    anchor: slug::slugify(&block.heading),
                    heading: block.heading.clone(),
                    html: rich_text::as_html(&block.body),
                })
                .collect(),
        }
    }

    fn nav_post(&self, link: &PreviewLink) -> NavPost {
        NavPost {
            title: link.title.clone(),
            url: url_for(&self.blog.config, &post_path(&link.slug)),
        }
    }

    /// Display and machine-readable forms of a date in the site timezone
    fn dates(&self, date: Option<&DateTime<FixedOffset>>) -> (String, String) {
        let local = date.map(|d| d.with_timezone(&self.tz));
        let display = format_optional_date(
            local.as_ref(),
            &self.blog.config.date_format,
            self.locale,
        );
        let xml = local.as_ref().map(date_xml).unwrap_or_default();
        (display, xml)
    }
}

fn write_file(path: &std::path::Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{FixtureSource, RawDocument};
    use crate::config::SiteConfig;
    use crate::error::BlogError;
    use serde_json::json;

    fn fixture() -> FixtureSource {
        let documents = (1..=6)
            .map(|i| RawDocument {
                id: Some(format!("id-{}", i)),
                uid: Some(format!("post-{}", i)),
                doc_type: Some("post".to_string()),
                first_publication_date: Some(format!("2021-0{}-01T10:00:00+0000", i)),
                last_publication_date: None,
                data: json!({
                    "title": format!("Post {}", i),
                    "subtitle": "Sobre o universo",
                    "author": "Joseph Oliveira",
                    "banner": { "url": "https://images.prismic.io/banner.png" },
                    "content": [{
                        "heading": "Proin et varius",
                        "body": [{ "type": "paragraph", "text": "Lorem ipsum dolor sit amet", "spans": [] }]
                    }]
                }),
            })
            .collect();
        FixtureSource::new(documents)
    }

    fn generator(dir: &std::path::Path) -> Generator<FixtureSource> {
        let blog = Blog::with_config(dir.to_path_buf(), SiteConfig::default());
        Generator::new(&blog, Arc::new(fixture())).unwrap()
    }

    #[tokio::test]
    async fn test_generate_writes_listing_and_posts() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path());

        let report = generator.generate(&RenderMode::published()).await.unwrap();
        assert_eq!(report, GenerateReport { listing_pages: 2, posts: 6 });

        let public = dir.path().join("public");
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("Post 6"));
        assert!(!index.contains("Post 1"));
        assert!(index.contains(r#"href="/page/2/""#));
        assert!(index.contains("Carregar mais posts"));

        let second = fs::read_to_string(public.join("page/2/index.html")).unwrap();
        assert!(second.contains("Post 6"));
        assert!(second.contains("Post 1"));
        assert!(!second.contains("Carregar mais posts"));

        for i in 1..=6 {
            assert!(public.join(format!("post/post-{}/index.html", i)).exists());
        }
    }

    #[tokio::test]
    async fn test_render_post() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path());

        let html = generator
            .render_post("post-3", &RenderMode::published())
            .await
            .unwrap();
        assert!(html.contains("<h1>Post 3</h1>"));
        assert!(html.contains("1 mar 2021"));
        assert!(html.contains("<li>0 min</li>"));
        assert!(html.contains(r#"<h2 id="proin-et-varius">"#));
        assert!(html.contains("<p>Lorem ipsum dolor sit amet</p>"));
        assert!(html.contains(r#"href="/post/post-4/""#));
        assert!(html.contains(r#"href="/post/post-2/""#));
        assert!(html.contains(r#"<div id="commentsBox"><script"#));
        assert!(!html.contains("Sair do modo Preview"));
    }

    #[tokio::test]
    async fn test_render_missing_post() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path());

        let err = generator
            .render_post("missing", &RenderMode::published())
            .await
            .unwrap_err();
        let blog_err = err.downcast_ref::<BlogError>().unwrap();
        assert!(blog_err.is_not_found());
    }

    #[tokio::test]
    async fn test_preview_listing() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path());

        let html = generator
            .render_listing(1, &RenderMode::preview("preview-ref"))
            .await
            .unwrap();
        assert!(html.contains("Sair do modo Preview"));
        assert!(!dir.path().join("public/index.html").exists());

        let err = generator
            .render_listing(3, &RenderMode::published())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BlogError>(),
            Some(BlogError::NoMorePages)
        ));
    }

    #[tokio::test]
    async fn test_generate_post_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let generator = generator(dir.path());

        let path = generator.generate_post("post-5").await.unwrap();
        assert_eq!(path, dir.path().join("public/post/post-5/index.html"));
        assert!(path.exists());

        assert!(generator.post_file("../etc").is_err());
        assert!(generator.post_file("..").is_err());
    }

    #[test]
    fn test_render_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let html = generator(dir.path())
            .render_fallback(&RenderMode::published())
            .unwrap();
        assert!(html.contains("Carregando..."));
    }
}
