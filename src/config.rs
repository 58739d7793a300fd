//! Application configuration.
//!
//! One `AppConfig` is constructed in `main` (from a TOML file or defaults) and
//! passed by reference into the sync orchestrator, the renderer and the CLI
//! commands. There is no process-global configuration lookup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Working root; everything else is resolved relative to it.
    pub root_dir: PathBuf,
    /// Directory (under the root) holding the mirrored Markdown tree.
    pub content_dir: String,
    /// Directory (under the root) holding the page index and lock files.
    pub store_dir: String,
    /// Collection name the index is keyed by.
    pub collection: String,

    /// Upstream repository URL used by `init`.
    pub repository_url: Option<String>,
    /// Git remote name.
    pub remote: String,
    /// Upstream branch the content tree tracks.
    pub branch: String,

    /// Snippet name to replacement body.
    pub snippets: BTreeMap<String, String>,
    /// Opening snippet placeholder token.
    pub snippet_open: String,
    /// Closing snippet placeholder token.
    pub snippet_close: String,

    /// Generate a table of contents when a page has enough sections.
    pub generate_toc: bool,
    /// Leave front matter in place when rendering (debug aid).
    pub keep_frontmatter: bool,

    /// URL prefix wikilink anchors point at.
    pub base_url: String,
    /// URL prefix for image sources.
    pub images_url: String,
    /// Directory (under the root) probed for intrinsic image dimensions.
    pub images_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            content_dir: "content".to_string(),
            store_dir: ".mdpages".to_string(),
            collection: "pages".to_string(),
            repository_url: None,
            remote: "origin".to_string(),
            branch: "master".to_string(),
            snippets: BTreeMap::new(),
            snippet_open: "((".to_string(),
            snippet_close: "))".to_string(),
            generate_toc: true,
            keep_frontmatter: false,
            base_url: "/".to_string(),
            images_url: "/images".to_string(),
            images_dir: "images".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn content_root(&self) -> PathBuf {
        self.root_dir.join(&self.content_dir)
    }

    pub fn store_root(&self) -> PathBuf {
        self.root_dir.join(&self.store_dir)
    }

    pub fn collection_root(&self) -> PathBuf {
        self.store_root().join(&self.collection)
    }

    pub fn images_root(&self) -> PathBuf {
        self.root_dir.join(&self.images_dir)
    }
}
