//! galaxy-explorer: a static blog generator backed by a headless CMS
//!
//! Posts are read from a Prismic repository (or a local fixture), rendered
//! with embedded Tera templates, and written to a public directory. A
//! development server serves the output, generates unbuilt posts on demand
//! and hosts the preview-mode routes.

pub mod cms;
pub mod commands;
pub mod comments;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use cms::{Backend, FixtureSource, PrismicClient};

/// The main blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Blog {
    /// Create a new blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a blog instance from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        Self {
            config,
            base_dir,
            public_dir,
        }
    }

    /// The content source named by the configuration: the fixture file if
    /// one is set, the CMS endpoint otherwise
    pub fn content_source(&self) -> Result<Backend> {
        let cms = &self.config.cms;

        if let Some(fixture) = &cms.fixture {
            let path = self.base_dir.join(fixture);
            tracing::debug!("Reading posts from fixture {:?}", path);
            return Ok(Backend::Fixture(FixtureSource::load(&path)?));
        }

        if cms.endpoint.is_empty() {
            anyhow::bail!("No content source configured: set cms.endpoint or cms.fixture in _config.yml");
        }

        tracing::debug!("Reading posts from {}", cms.endpoint);
        let client = PrismicClient::new(&cms.endpoint, cms.access_token.clone())
            .with_context(|| format!("Invalid CMS endpoint '{}'", cms.endpoint))?;
        Ok(Backend::Prismic(client))
    }

    /// Generate the static site
    pub async fn generate(&self, reference: Option<String>) -> Result<()> {
        commands::generate::run(self, reference).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.public_dir, dir.path().join("public"));
        assert!(blog.content_source().is_err());
    }

    #[test]
    fn test_fixture_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("_config.yml"), "cms:\n  fixture: posts.json\n").unwrap();
        std::fs::write(dir.path().join("posts.json"), "[]").unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        assert!(matches!(blog.content_source().unwrap(), Backend::Fixture(_)));
    }

    #[test]
    fn test_prismic_source() {
        let mut config = config::SiteConfig::default();
        config.cms.endpoint = "https://blog.cdn.prismic.io/api/v2".to_string();
        let blog = Blog::with_config(PathBuf::from("."), config);
        assert!(matches!(blog.content_source().unwrap(), Backend::Prismic(_)));
    }
}
