//! Offline content source backed by a JSON file of raw documents

use anyhow::Result as AnyResult;
use reqwest::Url;
use serde::Deserialize;
use std::cmp::Ordering as CmpOrdering;
use std::fs;
use std::path::Path;

use super::query::{Ordering, Predicate, Query, DOCUMENT_ID, DOCUMENT_TYPE};
use super::types::{parse_timestamp, RawDocument, RawPage};
use super::ContentSource;
use crate::error::{BlogError, Result};

/// Base of the cursors handed out by the fixture source
const CURSOR_BASE: &str = "fixture:/documents/search";

/// Page size the API uses when a query gives none
const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Documents(Vec<RawDocument>),
    Page(RawPage),
}

/// Evaluates search queries in memory
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    documents: Vec<RawDocument>,
}

impl FixtureSource {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self { documents }
    }

    /// Load documents from a JSON file holding either an array of documents
    /// or a saved search response
    pub fn load<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let documents = match serde_json::from_str(&content)? {
            FixtureFile::Documents(documents) => documents,
            FixtureFile::Page(page) => page.results,
        };
        tracing::debug!(
            "Loaded {} fixture documents from {:?}",
            documents.len(),
            path.as_ref()
        );
        Ok(Self::new(documents))
    }

    pub fn documents(&self) -> &[RawDocument] {
        &self.documents
    }

    fn evaluate(&self, query: &Query) -> Result<RawPage> {
        let mut matches: Vec<&RawDocument> = self
            .documents
            .iter()
            .filter(|doc| query.predicates.iter().all(|p| matches_predicate(doc, p)))
            .collect();

        matches.sort_by(|a, b| compare_documents(a, b, &query.orderings));

        if let Some(after) = &query.after {
            matches = match matches.iter().position(|d| d.id.as_deref() == Some(after)) {
                Some(pos) => matches.split_off(pos + 1),
                None => Vec::new(),
            };
        }

        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = query.page.unwrap_or(1).max(1);
        let total = matches.len();
        let total_pages = total.div_ceil(page_size);

        let start = ((page - 1) * page_size).min(total);
        let end = (start + page_size).min(total);
        let results: Vec<RawDocument> = matches[start..end].iter().map(|d| (*d).clone()).collect();

        let next_page = if page < total_pages {
            Some(cursor_for(&query.clone().page(page + 1))?)
        } else {
            None
        };
        let prev_page = if page > 1 {
            Some(cursor_for(&query.clone().page(page - 1))?)
        } else {
            None
        };

        Ok(RawPage {
            page,
            results_per_page: page_size,
            results_size: results.len(),
            total_results_size: total,
            total_pages,
            next_page,
            prev_page,
            results,
        })
    }
}

impl ContentSource for FixtureSource {
    async fn query(&self, query: &Query) -> Result<RawPage> {
        self.evaluate(query)
    }

    async fn fetch_page(&self, cursor: &str) -> Result<RawPage> {
        let url = Url::parse(cursor).map_err(|e| BlogError::fetch(cursor, e))?;
        if url.scheme() != "fixture" {
            return Err(BlogError::fetch(cursor, "not a fixture cursor"));
        }
        self.evaluate(&Query::from_url(&url))
    }
}

fn cursor_for(query: &Query) -> Result<String> {
    let base = Url::parse(CURSOR_BASE).map_err(|e| BlogError::fetch(CURSOR_BASE, e))?;
    Ok(query.to_url(&base).to_string())
}

fn matches_predicate(doc: &RawDocument, predicate: &Predicate) -> bool {
    let Predicate::At { path, value } = predicate;

    match path.as_str() {
        DOCUMENT_TYPE => doc.doc_type.as_deref() == Some(value),
        DOCUMENT_ID => doc.id.as_deref() == Some(value),
        _ => {
            // my.<type>.<field>
            let mut parts = path.splitn(3, '.');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("my"), Some(doc_type), Some(field)) => {
                    doc.doc_type.as_deref() == Some(doc_type)
                        && match field {
                            "uid" => doc.uid.as_deref() == Some(value),
                            _ => doc.data.get(field).and_then(|v| v.as_str()) == Some(value),
                        }
                }
                _ => false,
            }
        }
    }
}

fn compare_documents(a: &RawDocument, b: &RawDocument, orderings: &[Ordering]) -> CmpOrdering {
    for ordering in orderings {
        let field = ordering
            .field
            .strip_prefix("document.")
            .unwrap_or(&ordering.field);
        let key = |doc: &RawDocument| {
            let raw = match field {
                "first_publication_date" => doc.first_publication_date.as_deref(),
                "last_publication_date" => doc.last_publication_date.as_deref(),
                _ => None,
            };
            raw.and_then(parse_timestamp)
        };

        let order = key(a).cmp(&key(b));
        let order = if ordering.descending {
            order.reverse()
        } else {
            order
        };
        if order != CmpOrdering::Equal {
            return order;
        }
    }
    CmpOrdering::Equal
}
