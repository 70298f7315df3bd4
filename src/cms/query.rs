//! Predicate queries against the content source
//!
//! A [`Query`] renders to the search parameters of a Prismic-style
//! `documents/search` endpoint (`q`, `orderings`, `pageSize`, `page`,
//! `after`, `fetch`, `ref`) and can be read back from such a URL. The
//! fixture source relies on the round trip to encode its page cursors.

use reqwest::Url;
use std::fmt;

/// Predicate path for the document type
pub const DOCUMENT_TYPE: &str = "document.type";

/// Predicate path for the document id
pub const DOCUMENT_ID: &str = "document.id";

/// Ordering field for the first publication date
pub const FIRST_PUBLICATION_DATE: &str = "document.first_publication_date";

/// Ordering field for the last publication date
pub const LAST_PUBLICATION_DATE: &str = "document.last_publication_date";

/// A single query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `at(path, "value")`: exact match on a field
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Parse one bracketed predicate such as `[at(document.type, "post")]`
    pub fn parse(s: &str) -> Option<Self> {
        let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
        let args = inner.strip_prefix("at(")?.strip_suffix(')')?;
        let (path, value) = args.split_once(',')?;
        let value = value.trim().strip_prefix('"')?.strip_suffix('"')?;

        Some(Predicate::at(path.trim(), value.replace("\\\"", "\"")))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => {
                write!(f, "[at({}, \"{}\")]", path, value.replace('"', "\\\""))
            }
        }
    }
}

/// Sort directive on a document field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "{} desc", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

/// A search query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub orderings: Vec<Ordering>,
    pub page_size: Option<usize>,
    pub page: Option<usize>,
    pub after: Option<String>,
    pub fetch: Vec<String>,
    pub reference: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn fetch<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.fetch.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    /// Search parameters in the order the API documents them
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(reference) = &self.reference {
            pairs.push(("ref", reference.clone()));
        }
        if !self.predicates.is_empty() {
            let q: String = self.predicates.iter().map(|p| p.to_string()).collect();
            pairs.push(("q", format!("[{}]", q)));
        }
        if !self.orderings.is_empty() {
            let orderings: Vec<String> = self.orderings.iter().map(|o| o.to_string()).collect();
            pairs.push(("orderings", format!("[{}]", orderings.join(","))));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("pageSize", page_size.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if !self.fetch.is_empty() {
            pairs.push(("fetch", self.fetch.join(",")));
        }

        pairs
    }

    /// Append the search parameters to a base URL
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.to_pairs() {
                query.append_pair(key, &value);
            }
        }
        url
    }

    /// Read a query back from search parameters. Unknown parameters are ignored.
    pub fn from_url(url: &Url) -> Self {
        let mut query = Query::new();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "ref" => query.reference = Some(value.into_owned()),
                "q" => query.predicates = parse_predicates(&value),
                "orderings" => query.orderings = parse_orderings(&value),
                "pageSize" => query.page_size = value.parse().ok(),
                "page" => query.page = value.parse().ok(),
                "after" => query.after = Some(value.into_owned()),
                "fetch" => {
                    query.fetch = value
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(String::from)
                        .collect()
                }
                _ => {}
            }
        }

        query
    }
}

/// Split `[[at(..)][at(..)]]` into predicates, skipping ones that do not parse
fn parse_predicates(q: &str) -> Vec<Predicate> {
    let inner = q
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or("");

    let mut predicates = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0usize;

    for (i, c) in inner.char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(predicate) = Predicate::parse(&inner[start..=i]) {
                        predicates.push(predicate);
                    }
                }
            }
            _ => {}
        }
    }

    predicates
}

fn parse_orderings(s: &str) -> Vec<Ordering> {
    s.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| match o.strip_suffix(" desc") {
            Some(field) => Ordering::desc(field.trim()),
            None => Ordering::asc(o.trim_end_matches(" asc").trim()),
        })
        .collect()
}
