//! Durable page index.
//!
//! One pretty-printed JSON document per record, in a directory keyed by the
//! collection name. Record filenames are derived from the `file` key, which is
//! unique per record, so a re-index of the same file always lands on the same
//! document.
//!
//! There is exactly one writer system-wide (the sync lock guarantees it);
//! concurrent readers may observe the one record currently being replaced as
//! transiently absent, which is accepted.

pub mod page;
pub mod query;

pub use page::Page;
pub use query::{Op, Query, SortDir};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lookup capability the rendering engine depends on.
///
/// Resolution failures degrade (wikilinks fall back to literal text), so the
/// trait deliberately has no error channel.
pub trait PageLookup {
    fn find_by_url(&self, url: &str) -> Option<Page>;
}

pub struct PageStore {
    dir: PathBuf,
}

impl PageStore {
    /// Open (creating if necessary) the store directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create page store at {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Insert a record, replacing any existing record for the same `file`.
    ///
    /// Always a full replace, never a partial merge; last write wins.
    /// Duplicate URLs are allowed here (the `file` key stays unique); the
    /// indexer flags them once per batch.
    pub fn upsert(&self, page: &Page) -> Result<()> {
        self.delete_by_file(&page.file)?;

        let path = self.record_path(&page.file);
        let json = serde_json::to_string_pretty(page)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write page record {:?}", path))?;
        debug!(file = %page.file, url = %page.url, "stored page record");
        Ok(())
    }

    /// Remove the record whose `file` equals `file`, if any.
    pub fn delete_by_file(&self, file: &str) -> Result<bool> {
        let path = self.record_path(file);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete page record {:?}", path))?;
            debug!(%file, "deleted page record");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Load every record, sorted by `file` for deterministic iteration.
    pub fn all_pages(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read page store at {:?}", self.dir))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read page record {:?}", path))?;
            let page: Page = serde_json::from_str(&raw)
                .with_context(|| format!("Corrupt page record {:?}", path))?;
            pages.push(page);
        }
        pages.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(pages)
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.all_pages()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn record_path(&self, file: &str) -> PathBuf {
        let digest = Sha256::digest(file.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl PageLookup for PageStore {
    fn find_by_url(&self, url: &str) -> Option<Page> {
        match self.query().filter("url", Op::Eq, url).first() {
            Ok(page) => page,
            Err(e) => {
                warn!(%url, error = %e, "page lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upsert_and_lookup() {
        let temp = TempDir::new().unwrap();
        let store = PageStore::open(&temp.path().join("pages")).unwrap();

        let mut page = Page::new("guide", "guide.md");
        page.set("title", "Guide".to_string());
        store.upsert(&page).unwrap();

        let found = store.find_by_url("guide").unwrap();
        assert_eq!(found.title.as_deref(), Some("Guide"));
        assert!(store.find_by_url("nope").is_none());
    }

    #[test]
    fn test_upsert_replaces_wholesale() {
        let temp = TempDir::new().unwrap();
        let store = PageStore::open(&temp.path().join("pages")).unwrap();

        let mut first = Page::new("guide", "guide.md");
        first.set("title", "Old".to_string());
        first.set("author", "moe".to_string());
        store.upsert(&first).unwrap();

        // No partial merge: the replacement drops fields it does not carry.
        let mut second = Page::new("guide", "guide.md");
        second.set("title", "New".to_string());
        store.upsert(&second).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let found = store.find_by_url("guide").unwrap();
        assert_eq!(found.title.as_deref(), Some("New"));
        assert!(found.field("author").is_none());
    }

    #[test]
    fn test_delete_by_file() {
        let temp = TempDir::new().unwrap();
        let store = PageStore::open(&temp.path().join("pages")).unwrap();

        store.upsert(&Page::new("guide", "guide.md")).unwrap();
        assert!(store.delete_by_file("guide.md").unwrap());
        assert!(!store.delete_by_file("guide.md").unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("pages");
        {
            let store = PageStore::open(&dir).unwrap();
            store.upsert(&Page::new("guide", "guide.md")).unwrap();
        }
        let store = PageStore::open(&dir).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.find_by_url("guide").is_some());
    }

    #[test]
    fn test_duplicate_url_keeps_both_records() {
        let temp = TempDir::new().unwrap();
        let store = PageStore::open(&temp.path().join("pages")).unwrap();

        store.upsert(&Page::new("guide", "a/guide.md")).unwrap();
        store.upsert(&Page::new("guide", "b/guide.md")).unwrap();

        // Both files keep their record; resolution picks the first by file.
        assert_eq!(store.len().unwrap(), 2);
        let found = store.find_by_url("guide").unwrap();
        assert_eq!(found.file, "a/guide.md");
    }
}
