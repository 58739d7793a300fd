//! Per-file indexing.
//!
//! Turns Markdown files under the content root into page records:
//!
//! - content filter (`*.md`, `README` excluded)
//! - URL derivation from the relative path
//! - full walk for first-time indexing
//! - change-set driven re-indexing during sync

use crate::config::AppConfig;
use crate::core::meta;
use crate::store::{Page, PageStore};
use crate::vcs::ChangedPath;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Drives page records out of the content tree.
pub struct Indexer<'a> {
    config: &'a AppConfig,
    store: &'a PageStore,
}

/// True for files the index is authoritative over: `.md` extension and a stem
/// that is not exactly `README`.
pub fn matches_filter(rel_path: &str) -> bool {
    let Some(stem) = rel_path.strip_suffix(".md") else {
        return false;
    };
    let stem = stem.rsplit('/').next().unwrap_or(stem);
    stem != "README"
}

/// Derive the page URL from a path relative to the content root.
///
/// The `.md` extension is stripped and nothing else changes: `a/b/c.md`
/// becomes `a/b/c`, `index.md` at the root becomes `index`.
pub fn derive_url(rel_path: &str) -> String {
    rel_path
        .strip_suffix(".md")
        .unwrap_or(rel_path)
        .to_string()
}

impl<'a> Indexer<'a> {
    pub fn new(config: &'a AppConfig, store: &'a PageStore) -> Self {
        Self { config, store }
    }

    /// Index one file, replacing its record wholesale.
    pub fn index_file(&self, rel_path: &str) -> Result<IndexOutcome> {
        if !matches_filter(rel_path) {
            return Ok(IndexOutcome::Skipped);
        }

        let full = self.config.content_root().join(rel_path);
        let raw = std::fs::read_to_string(&full)
            .with_context(|| format!("Failed to read {:?}", full))?;

        let metadata = meta::parse_meta(&raw)
            .with_context(|| format!("Failed to parse front matter of {}", rel_path))?;

        let url = derive_url(rel_path);
        let mut page = Page::new(url.clone(), rel_path);
        for (key, value) in metadata {
            page.set(&key, value);
        }
        page.updated = Some(chrono::Utc::now());

        self.store.upsert(&page)?;
        debug!(file = %rel_path, %url, "indexed page");
        Ok(IndexOutcome::Indexed { url })
    }

    /// Remove the record for a file deleted upstream.
    pub fn remove_file(&self, rel_path: &str) -> Result<IndexOutcome> {
        if !matches_filter(rel_path) {
            return Ok(IndexOutcome::Skipped);
        }
        self.store.delete_by_file(rel_path)?;
        Ok(IndexOutcome::Removed)
    }

    /// Walk the whole content tree and index every matching file.
    ///
    /// Per-file failures are collected into the summary; the walk continues.
    pub fn index_all(&self) -> Result<IndexSummary> {
        let root = self.config.content_root();
        let mut summary = IndexSummary::default();

        for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&root) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if rel.starts_with(".git/") {
                continue;
            }

            match self.index_file(&rel) {
                Ok(outcome) => summary.add(outcome),
                Err(e) => summary.errors.push((rel, format!("{:#}", e))),
            }
        }

        self.warn_duplicate_urls()?;
        info!(
            indexed = summary.indexed,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "full index pass complete"
        );
        Ok(summary)
    }

    /// Index exactly the files named in a sync change set.
    pub fn index_changed(&self, changes: &[ChangedPath]) -> Result<IndexSummary> {
        let mut summary = IndexSummary::default();

        for change in changes {
            let result = if change.deleted {
                self.remove_file(&change.path)
            } else {
                self.index_file(&change.path)
            };
            match result {
                Ok(outcome) => summary.add(outcome),
                Err(e) => summary.errors.push((change.path.clone(), format!("{:#}", e))),
            }
        }

        self.warn_duplicate_urls()?;
        info!(
            indexed = summary.indexed,
            removed = summary.removed,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "change-set index pass complete"
        );
        Ok(summary)
    }

    /// One pass over the finished batch to flag ambiguous URLs.
    ///
    /// Duplicate URLs make wikilink resolution ambiguous. Both records stay
    /// in the store (the `file` key is unique) and lookups resolve to the
    /// first match in `file` order; the conflict is only flagged.
    fn warn_duplicate_urls(&self) -> Result<()> {
        let mut seen: HashMap<String, String> = HashMap::new();
        for page in self.store.all_pages()? {
            match seen.get(&page.url) {
                Some(first) => {
                    warn!(
                        url = %page.url,
                        file = %page.file,
                        conflicting_file = %first,
                        "duplicate page url; wikilinks will resolve to the first match"
                    );
                }
                None => {
                    seen.insert(page.url.clone(), page.file.clone());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    /// The file matched the filter and its record was replaced.
    Indexed { url: String },
    /// The file does not participate in the index.
    Skipped,
    /// The file's record was removed.
    Removed,
}

/// Counts for one indexing pass. Errors are isolated per file.
#[derive(Debug, Default)]
pub struct IndexSummary {
    pub indexed: usize,
    pub skipped: usize,
    pub removed: usize,
    pub errors: Vec<(String, String)>,
}

impl IndexSummary {
    pub fn add(&mut self, outcome: IndexOutcome) {
        match outcome {
            IndexOutcome::Indexed { .. } => self.indexed += 1,
            IndexOutcome::Skipped => self.skipped += 1,
            IndexOutcome::Removed => self.removed += 1,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PageLookup;
    use std::fs;
    use tempfile::TempDir;

    fn setup(temp: &TempDir) -> (AppConfig, PageStore) {
        let mut config = AppConfig::default();
        config.root_dir = temp.path().to_path_buf();
        fs::create_dir_all(config.content_root()).unwrap();
        let store = PageStore::open(&config.collection_root()).unwrap();
        (config, store)
    }

    #[test]
    fn test_matches_filter() {
        assert!(matches_filter("index.md"));
        assert!(matches_filter("a/b/c.md"));
        assert!(!matches_filter("README.md"));
        assert!(!matches_filter("docs/README.md"));
        assert!(!matches_filter("image.png"));
        // README prefix on a different stem still matches
        assert!(matches_filter("README-extras.md"));
    }

    #[test]
    fn test_derive_url() {
        assert_eq!(derive_url("a/b/c.md"), "a/b/c");
        assert_eq!(derive_url("index.md"), "index");
        assert_eq!(derive_url("guide.md"), "guide");
    }

    #[test]
    fn test_index_file_with_metadata() {
        let temp = TempDir::new().unwrap();
        let (config, store) = setup(&temp);
        fs::write(
            config.content_root().join("guide.md"),
            "<!--\ntitle: Guide\nauthor: moe\n-->\n# Guide\n",
        )
        .unwrap();

        let indexer = Indexer::new(&config, &store);
        let outcome = indexer.index_file("guide.md").unwrap();
        assert_eq!(
            outcome,
            IndexOutcome::Indexed {
                url: "guide".to_string()
            }
        );

        let page = store.query().all().unwrap().remove(0);
        assert_eq!(page.url, "guide");
        assert_eq!(page.file, "guide.md");
        assert_eq!(page.title.as_deref(), Some("Guide"));
        assert!(page.field("author").is_some());
        assert!(page.updated.is_some());
    }

    #[test]
    fn test_reindex_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let (config, store) = setup(&temp);
        fs::write(
            config.content_root().join("guide.md"),
            "<!-- title: Guide -->\nbody",
        )
        .unwrap();

        let indexer = Indexer::new(&config, &store);
        indexer.index_file("guide.md").unwrap();
        indexer.index_file("guide.md").unwrap();

        let pages = store.query().all().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].file, "guide.md");
        assert_eq!(pages[0].title.as_deref(), Some("Guide"));
    }

    #[test]
    fn test_readme_is_never_indexed() {
        let temp = TempDir::new().unwrap();
        let (config, store) = setup(&temp);
        fs::write(config.content_root().join("README.md"), "# Readme").unwrap();

        let indexer = Indexer::new(&config, &store);
        assert_eq!(
            indexer.index_file("README.md").unwrap(),
            IndexOutcome::Skipped
        );
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_index_all() {
        let temp = TempDir::new().unwrap();
        let (config, store) = setup(&temp);
        let root = config.content_root();
        fs::write(root.join("index.md"), "# Home").unwrap();
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::write(root.join("blog/first.md"), "# First").unwrap();
        fs::write(root.join("README.md"), "# Readme").unwrap();
        fs::write(root.join("logo.png"), [0u8; 4]).unwrap();

        let indexer = Indexer::new(&config, &store);
        let summary = indexer.index_all().unwrap();

        assert_eq!(summary.indexed, 2);
        assert_eq!(summary.skipped, 2);
        assert!(!summary.has_errors());

        let page = store.query().all().unwrap();
        let urls: Vec<_> = page.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["blog/first", "index"]);
    }

    #[test]
    fn test_duplicate_urls_survive_a_batch_pass() {
        let temp = TempDir::new().unwrap();
        let (config, store) = setup(&temp);
        fs::write(config.content_root().join("guide.md"), "# Guide").unwrap();
        // A record claiming the same url under a different file key.
        store
            .upsert(&Page::new("guide", "copies/guide-copy.md"))
            .unwrap();

        let indexer = Indexer::new(&config, &store);
        let summary = indexer.index_all().unwrap();

        assert_eq!(summary.indexed, 1);
        assert_eq!(store.len().unwrap(), 2);
        // Resolution stays deterministic: first match in file order wins.
        assert_eq!(
            store.find_by_url("guide").unwrap().file,
            "copies/guide-copy.md"
        );
    }

    #[test]
    fn test_malformed_front_matter_is_isolated() {
        let temp = TempDir::new().unwrap();
        let (config, store) = setup(&temp);
        let root = config.content_root();
        fs::write(root.join("good.md"), "<!-- title: Good -->\nbody").unwrap();
        fs::write(root.join("bad.md"), "<!-- title: broken\nno close").unwrap();

        let indexer = Indexer::new(&config, &store);
        let summary = indexer.index_all().unwrap();

        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].0, "bad.md");
        assert!(store.find_by_url("good").is_some());
        assert!(store.find_by_url("bad").is_none());
    }

    #[test]
    fn test_index_changed_with_deletion() {
        let temp = TempDir::new().unwrap();
        let (config, store) = setup(&temp);
        let root = config.content_root();
        fs::write(root.join("keep.md"), "# Keep").unwrap();

        let indexer = Indexer::new(&config, &store);
        indexer.index_file("keep.md").unwrap();
        indexer.index_file("gone.md").ok();
        store.upsert(&Page::new("gone", "gone.md")).unwrap();

        let changes = vec![
            ChangedPath {
                path: "keep.md".to_string(),
                deleted: false,
            },
            ChangedPath {
                path: "gone.md".to_string(),
                deleted: true,
            },
            ChangedPath {
                path: "assets/logo.png".to_string(),
                deleted: false,
            },
        ];
        let summary = indexer.index_changed(&changes).unwrap();

        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.skipped, 1);
        assert!(store.find_by_url("keep").is_some());
        assert!(store.find_by_url("gone").is_none());
    }
}
