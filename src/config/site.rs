//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::comments::{IssueMapping, WidgetConfig, UTTERANCES_SRC};

/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Listing
    pub per_page: usize,
    pub prebuild_paths: usize,

    // Date format
    pub date_format: String,

    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Galaxy Explorer".to_string(),
            subtitle: String::new(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            per_page: 4,
            prebuild_paths: 10,

            date_format: "D MMM YYYY".to_string(),

            cms: CmsConfig::default(),
            comments: CommentsConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_access_token(std::env::var(ACCESS_TOKEN_ENV).ok());
    }

    fn apply_access_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            tracing::debug!("Using CMS access token from {}", ACCESS_TOKEN_ENV);
            self.cms.access_token = Some(token);
        }
    }

    /// Site timezone; unknown or empty names fall back to UTC
    pub fn tz(&self) -> Tz {
        if self.timezone.is_empty() {
            return Tz::UTC;
        }
        self.timezone.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone '{}', using UTC", self.timezone);
            Tz::UTC
        })
    }
}

/// Content source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API endpoint, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Read documents from a local JSON file instead of the API
    pub fixture: Option<String>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "post".to_string(),
            fixture: None,
        }
    }
}

/// Comment widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enable: bool,
    pub repo: String,
    pub theme: String,
    pub issue_term: String,
    /// Takes precedence over `issue_term` when set
    pub issue_number: Option<u64>,
    pub label: Option<String>,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        let widget = WidgetConfig::default();
        Self {
            enable: true,
            repo: widget.repo,
            theme: widget.theme,
            issue_term: "pathname".to_string(),
            issue_number: None,
            label: None,
        }
    }
}

impl CommentsConfig {
    /// The widget this configuration embeds, if comments are enabled
    pub fn widget(&self) -> Option<WidgetConfig> {
        if !self.enable {
            return None;
        }

        let issue = match self.issue_number {
            Some(number) => IssueMapping::Number(number),
            None => IssueMapping::Term(self.issue_term.clone()),
        };

        Some(WidgetConfig {
            src: UTTERANCES_SRC.to_string(),
            repo: self.repo.clone(),
            theme: self.theme.clone(),
            issue,
            label: self.label.clone(),
        })
    }
}

/// Preview mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub exit_path: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            exit_path: "/api/exit-preview".to_string(),
        }
    }
}
