//! Post loader - the queries the pages need, on top of a content source

use super::navigation::{adjacent_posts, Adjacent};
use super::{Post, PostsPagination};
use crate::cms::{
    ContentSource, Ordering, Predicate, Query, DOCUMENT_ID, DOCUMENT_TYPE, FIRST_PUBLICATION_DATE,
};
use crate::error::{BlogError, Result};

/// Fields of a post document the pages render
const POST_FIELDS: &[&str] = &["title", "subtitle", "author", "banner", "content"];

/// Loads posts of one document type, optionally at a preview ref
pub struct PostLoader<'a, S> {
    source: &'a S,
    doc_type: String,
    reference: Option<String>,
}

impl<'a, S: ContentSource> PostLoader<'a, S> {
    /// Create a loader reading published content
    pub fn new(source: &'a S, doc_type: &str) -> Self {
        Self {
            source,
            doc_type: doc_type.to_string(),
            reference: None,
        }
    }

    /// Read content at the given ref instead of the published one
    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    pub fn is_preview(&self) -> bool {
        self.reference.is_some()
    }

    fn base_query(&self) -> Query {
        Query::new()
            .predicate(Predicate::at(DOCUMENT_TYPE, self.doc_type.as_str()))
            .fetch(POST_FIELDS.iter().map(|f| format!("{}.{}", self.doc_type, f)))
            .reference(self.reference.clone())
    }

    /// First listing page, newest first
    pub async fn first_page(&self, page_size: usize) -> Result<PostsPagination> {
        let query = self
            .base_query()
            .order_by(Ordering::desc(FIRST_PUBLICATION_DATE))
            .page_size(page_size);

        let page = self.source.query(&query).await?;
        tracing::debug!(
            "First page: {} of {} posts",
            page.results.len(),
            page.total_results_size
        );
        Ok(PostsPagination::from_page(page))
    }

    /// Slugs generated ahead of time; others are generated on demand
    pub async fn static_paths(&self, limit: usize) -> Result<Vec<String>> {
        let query = self
            .base_query()
            .order_by(Ordering::desc(FIRST_PUBLICATION_DATE))
            .page_size(limit);

        let page = self.source.query(&query).await?;
        Ok(page
            .results
            .into_iter()
            .filter_map(|doc| doc.uid)
            .filter(|uid| !uid.is_empty())
            .collect())
    }

    /// Fetch a single post by slug
    pub async fn get_by_uid(&self, uid: &str) -> Result<Post> {
        let path = format!("my.{}.uid", self.doc_type);
        self.single(Predicate::at(path, uid), uid).await
    }

    /// Fetch a single post by document id
    pub async fn get_by_id(&self, id: &str) -> Result<Post> {
        self.single(Predicate::at(DOCUMENT_ID, id), id).await
    }

    async fn single(&self, predicate: Predicate, key: &str) -> Result<Post> {
        let query = self.base_query().predicate(predicate).page_size(1);
        let page = self.source.query(&query).await?;

        page.results
            .first()
            .map(Post::from_raw)
            .ok_or_else(|| BlogError::not_found(&self.doc_type, key))
    }

    /// Previous and next posts around `post`
    pub async fn adjacent(&self, post: &Post) -> Result<Adjacent> {
        adjacent_posts(
            self.source,
            &self.doc_type,
            self.reference.as_deref(),
            post,
        )
        .await
    }
}
