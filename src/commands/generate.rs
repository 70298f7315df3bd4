//! Generate static files

use anyhow::Result;
use std::sync::Arc;

use crate::generator::{Generator, RenderMode};
use crate::Blog;

/// Generate the listing pages and the prebuilt post pages. With a
/// `reference` the content is read at that ref instead of the published one.
pub async fn run(blog: &Blog, reference: Option<String>) -> Result<()> {
    let start = std::time::Instant::now();

    let source = blog.content_source()?;
    let generator = Generator::new(blog, Arc::new(source))?;

    if let Some(reference) = &reference {
        tracing::info!("Reading content at ref {}", reference);
    }
    let report = generator.generate(&RenderMode::at_ref(reference)).await?;

    tracing::info!(
        "Generated {} listing pages and {} posts in {:.2}s",
        report.listing_pages,
        report.posts,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
