//! Previous/next post lookup

use serde::Serialize;

use super::{Post, PreviewLink};
use crate::cms::{ContentSource, Ordering, Predicate, Query, DOCUMENT_TYPE, FIRST_PUBLICATION_DATE};
use crate::error::Result;

/// Neighbours of a post in the newest-first listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Adjacent {
    /// The post listed just before (published later)
    pub prev: Option<PreviewLink>,
    /// The post listed just after (published earlier)
    pub next: Option<PreviewLink>,
}

/// Look up the neighbours of `post` with two single-result queries that
/// start after the post's document, one per publication order. Ties on
/// equal timestamps are resolved by the source.
pub async fn adjacent_posts<S: ContentSource>(
    source: &S,
    doc_type: &str,
    reference: Option<&str>,
    post: &Post,
) -> Result<Adjacent> {
    if post.id.is_empty() {
        tracing::debug!("Post '{}' has no document id, skipping navigation", post.slug);
        return Ok(Adjacent::default());
    }

    let prev = neighbour(source, doc_type, reference, post, Ordering::asc(FIRST_PUBLICATION_DATE)).await?;
    let next = neighbour(source, doc_type, reference, post, Ordering::desc(FIRST_PUBLICATION_DATE)).await?;

    Ok(Adjacent { prev, next })
}

async fn neighbour<S: ContentSource>(
    source: &S,
    doc_type: &str,
    reference: Option<&str>,
    post: &Post,
    ordering: Ordering,
) -> Result<Option<PreviewLink>> {
    let query = Query::new()
        .predicate(Predicate::at(DOCUMENT_TYPE, doc_type))
        .order_by(ordering)
        .after(post.id.clone())
        .page_size(1)
        .fetch([format!("{}.title", doc_type)])
        .reference(reference.map(String::from));

    let page = source.query(&query).await?;
    Ok(page
        .results
        .first()
        .map(|raw| Post::from_raw(raw).preview_link()))
}
