//! List the posts of the site

use anyhow::Result;

use crate::cms::ContentSource;
use crate::content::{Post, PostLoader};
use crate::helpers::format_optional_date;
use crate::helpers::locale_for;
use crate::Blog;

/// Print every post, newest first
pub async fn run(blog: &Blog) -> Result<()> {
    let source = blog.content_source()?;
    let posts = load_all(blog, &source).await?;
    let locale = locale_for(&blog.config.language);
    let tz = blog.config.tz();

    println!("Posts ({}):", posts.len());
    for post in posts {
        let date = post.first_publication_date.map(|d| d.with_timezone(&tz));
        println!(
            "  {} - {} ({} min) [{}]",
            format_optional_date(date.as_ref(), &blog.config.date_format, locale),
            post.title,
            post.reading_time(),
            post.slug
        );
    }

    Ok(())
}

/// Follow the listing cursors until every post is loaded
pub async fn load_all<S: ContentSource>(blog: &Blog, source: &S) -> Result<Vec<Post>> {
    let loader = PostLoader::new(source, &blog.config.cms.document_type);
    let mut pagination = loader.first_page(blog.config.per_page).await?;

    while pagination.has_more() {
        pagination.load_more(source).await?;
    }

    Ok(pagination.results().to_vec())
}
