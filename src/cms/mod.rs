//! Content source access
//!
//! Posts come from a headless CMS speaking the Prismic REST protocol, or
//! from a local fixture file that answers the same queries offline.

mod fixture;
mod prismic;
mod query;
mod types;

use std::future::Future;

pub use fixture::FixtureSource;
pub use prismic::PrismicClient;
pub use query::{
    Ordering, Predicate, Query, DOCUMENT_ID, DOCUMENT_TYPE, FIRST_PUBLICATION_DATE,
    LAST_PUBLICATION_DATE,
};
pub use types::{parse_timestamp, ApiInfo, ApiRef, RawDocument, RawPage};

use crate::error::Result;

/// Anything that can answer search queries and follow page cursors
pub trait ContentSource: Send + Sync {
    /// Run a search query and return the first matching page
    fn query(&self, query: &Query) -> impl Future<Output = Result<RawPage>> + Send;

    /// Fetch the page behind an opaque `next_page` cursor
    fn fetch_page(&self, cursor: &str) -> impl Future<Output = Result<RawPage>> + Send;
}

/// The content source selected by the site configuration
pub enum Backend {
    Prismic(PrismicClient),
    Fixture(FixtureSource),
}

impl ContentSource for Backend {
    async fn query(&self, query: &Query) -> Result<RawPage> {
        match self {
            Backend::Prismic(client) => client.query(query).await,
            Backend::Fixture(fixture) => fixture.query(query).await,
        }
    }

    async fn fetch_page(&self, cursor: &str) -> Result<RawPage> {
        match self {
            Backend::Prismic(client) => client.fetch_page(cursor).await,
            Backend::Fixture(fixture) => fixture.fetch_page(cursor).await,
        }
    }
}
