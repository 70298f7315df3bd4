//! Initialize a new blog

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# galaxy-explorer configuration

# Site
title: Galaxy Explorer
subtitle: ''
description: ''
author: ''
language: pt-BR
timezone: America/Sao_Paulo

# URL
url: http://localhost:3000
root: /

# Directory
public_dir: public

# Listing
per_page: 4
prebuild_paths: 10

# Date format
date_format: D MMM YYYY

# Content source
## Set `endpoint` (and `access_token`, or the PRISMIC_ACCESS_TOKEN
## environment variable) to read from a Prismic repository, and remove
## `fixture`.
cms:
  endpoint: ''
  document_type: post
  fixture: posts.json

# Comments (utterances)
comments:
  enable: true
  repo: Eduardo-H/galaxy-explorer-comments
  theme: github-dark
  issue_term: pathname

# Preview
preview:
  exit_path: /api/exit-preview
"#;

const SAMPLE_POSTS: &str = r#"[
  {
    "id": "YF1dLREAACMAT4Pn",
    "uid": "hello-galaxy",
    "type": "post",
    "first_publication_date": "2021-03-25T19:25:28+0000",
    "last_publication_date": "2021-03-25T19:25:28+0000",
    "data": {
      "title": "Olá, galáxia",
      "subtitle": "Seu primeiro post",
      "author": "Galaxy Explorer",
      "banner": { "url": "" },
      "content": [
        {
          "heading": "Primeiros passos",
          "body": [
            {
              "type": "paragraph",
              "text": "Edite posts.json ou configure um endpoint do Prismic em _config.yml.",
              "spans": [{ "start": 6, "end": 16, "type": "strong" }]
            }
          ]
        }
      ]
    }
  }
]
"#;

/// Initialize a new blog in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    fs::write(&config_path, CONFIG)?;
    fs::write(target_dir.join("posts.json"), SAMPLE_POSTS)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::FixtureSource;
    use crate::config::SiteConfig;

    #[test]
    fn test_init_site() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();

        let config = SiteConfig::load(dir.path().join("_config.yml")).unwrap();
        assert_eq!(config.cms.fixture.as_deref(), Some("posts.json"));
        assert_eq!(config.per_page, 4);

        let fixture = FixtureSource::load(dir.path().join("posts.json")).unwrap();
        assert_eq!(fixture.documents().len(), 1);

        // refuses to overwrite
        assert!(init_site(dir.path()).is_err());
    }
}
