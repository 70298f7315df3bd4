//! Listing pagination: accumulate pages behind opaque cursors

use serde::Serialize;

use super::Post;
use crate::cms::{ContentSource, RawPage};
use crate::error::{BlogError, Result};

/// Posts shown on a listing plus the cursor of the next page.
///
/// Results only grow, in the order pages arrive. The cursor is `None`
/// exactly when there is nothing left to load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostsPagination {
    results: Vec<Post>,
    next_page: Option<String>,
    #[serde(skip)]
    loading: bool,
}

/// Ticket for an outstanding page load, handed out by
/// [`PostsPagination::begin_load`]
#[derive(Debug)]
#[must_use = "a started load must be completed"]
pub struct PageLoad {
    cursor: String,
}

impl PageLoad {
    pub fn cursor(&self) -> &str {
        &self.cursor
    }
}

impl PostsPagination {
    pub fn new(results: Vec<Post>, next_page: Option<String>) -> Self {
        Self {
            results,
            next_page,
            loading: false,
        }
    }

    /// Build the initial state from the first page of a search
    pub fn from_page(page: RawPage) -> Self {
        let (results, next_page) = normalize_page(page);
        Self::new(results, next_page)
    }

    pub fn results(&self) -> &[Post] {
        &self.results
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether a "load more" action should be offered
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Mark a load as outstanding and hand out the cursor to fetch.
    ///
    /// Fails with [`BlogError::LoadInProgress`] while another load is
    /// outstanding and with [`BlogError::NoMorePages`] when there is no cursor.
    pub fn begin_load(&mut self) -> Result<PageLoad> {
        if self.loading {
            return Err(BlogError::LoadInProgress);
        }
        let cursor = self.next_page.clone().ok_or(BlogError::NoMorePages)?;
        self.loading = true;
        Ok(PageLoad { cursor })
    }

    /// Finish a load. On success the page is appended and the cursor
    /// replaced; on failure nothing but the in-flight flag changes.
    pub fn complete_load(
        &mut self,
        load: PageLoad,
        outcome: Result<(Vec<Post>, Option<String>)>,
    ) -> Result<usize> {
        self.loading = false;

        let (posts, next_page) = outcome.map_err(|e| {
            tracing::warn!("Loading more posts from {} failed: {}", load.cursor, e);
            e
        })?;

        let loaded = posts.len();
        self.results.extend(posts);
        self.next_page = next_page;
        tracing::debug!(
            "Loaded {} more posts ({} total, more: {})",
            loaded,
            self.results.len(),
            self.has_more()
        );
        Ok(loaded)
    }

    /// Fetch the next page and append it. Returns the number of new posts.
    pub async fn load_more<S: ContentSource>(&mut self, source: &S) -> Result<usize> {
        let load = self.begin_load()?;
        let outcome = fetch_more(source, load.cursor()).await;
        self.complete_load(load, outcome)
    }
}

/// Fetch the page behind `cursor` and normalize its documents
pub async fn fetch_more<S: ContentSource>(
    source: &S,
    cursor: &str,
) -> Result<(Vec<Post>, Option<String>)> {
    let page = source.fetch_page(cursor).await?;
    Ok(normalize_page(page))
}

/// Normalize every document of a page, keeping the page's order
pub fn normalize_page(page: RawPage) -> (Vec<Post>, Option<String>) {
    let posts = page.results.iter().map(Post::from_raw).collect();
    (posts, page.next_page)
}
