//! HTTP client for a Prismic-style REST API

use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::query::Query;
use super::types::{ApiInfo, RawPage};
use super::ContentSource;
use crate::error::{BlogError, Result};

const USER_AGENT: &str = concat!("galaxy-explorer/", env!("CARGO_PKG_VERSION"));

/// Client for one repository endpoint, e.g. `https://my-blog.cdn.prismic.io/api/v2`
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    search: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    /// Create a client for the given API endpoint
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            BlogError::MalformedContent(format!("invalid API endpoint {}: {}", endpoint, e))
        })?;
        let search = Url::parse(&format!(
            "{}/documents/search",
            endpoint.as_str().trim_end_matches('/')
        ))
        .map_err(|e| BlogError::MalformedContent(format!("invalid search URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BlogError::fetch(endpoint.as_str(), e))?;

        Ok(Self {
            http,
            endpoint,
            search,
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    /// The ref of the published content, read from the API root. Publishing
    /// moves the master ref, so it is looked up again for every query.
    pub async fn master_ref(&self) -> Result<String> {
        let info: ApiInfo = self.get_json(self.with_token(self.endpoint.clone())).await?;
        let reference = info.master_ref().map(String::from).ok_or_else(|| {
            BlogError::MalformedContent("API root lists no master ref".to_string())
        })?;
        tracing::debug!("Resolved master ref {}", reference);
        Ok(reference)
    }

    fn with_token(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| BlogError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlogError::fetch(url.as_str(), format!("HTTP {}", status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BlogError::fetch(url.as_str(), e))
    }
}

impl ContentSource for PrismicClient {
    async fn query(&self, query: &Query) -> Result<RawPage> {
        let reference = match &query.reference {
            Some(reference) => reference.clone(),
            None => self.master_ref().await?,
        };
        let query = query.clone().reference(Some(reference));
        let url = self.with_token(query.to_url(&self.search));

        self.get_json(url).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<RawPage> {
        // next_page cursors already carry ref and access_token
        let url = Url::parse(cursor).map_err(|e| BlogError::fetch(cursor, e))?;
        self.get_json(url).await
    }
}
