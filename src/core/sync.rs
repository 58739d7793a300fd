//! Sync orchestration.
//!
//! Ties the version-control collaborator, the indexer and the page store
//! together into the three entry points the CLI exposes: `init` (first
//! clone plus full index), `update` (pull and re-index what changed) and
//! `reindex` (rebuild the index from the tree on disk).
//!
//! Every entry point runs under a named lock so concurrent invocations of
//! the same command fail fast instead of corrupting the index.

use crate::config::AppConfig;
use crate::core::indexer::{IndexSummary, Indexer};
use crate::core::lock::NamedLock;
use crate::error::Error;
use crate::store::PageStore;
use crate::vcs::VersionControl;
use anyhow::{bail, Result};
use tracing::info;

/// What an `update` run did.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The content directory does not exist; nothing to update.
    NoContent,
    /// Upstream had nothing new. Carries the (empty) fetch log.
    NoChanges { log: String },
    /// Changes were pulled and indexed.
    Indexed { log: String, summary: IndexSummary },
}

pub struct Syncer<'a> {
    config: &'a AppConfig,
    store: &'a PageStore,
    vcs: &'a dyn VersionControl,
}

impl<'a> Syncer<'a> {
    pub fn new(config: &'a AppConfig, store: &'a PageStore, vcs: &'a dyn VersionControl) -> Self {
        Self { config, store, vcs }
    }

    /// Clone the content repository and build the index from scratch.
    ///
    /// Refuses to run when the content directory already exists.
    pub fn init(&self, url: &str) -> Result<(String, IndexSummary)> {
        let content = self.config.content_root();
        if content.exists() {
            bail!(
                "Content directory {:?} already exists; refusing to clone over it",
                content
            );
        }

        let _lock = NamedLock::acquire(&self.config.store_root(), "init")?;

        let log = self.vcs.clone_to(url, &content)?;
        let indexer = Indexer::new(self.config, self.store);
        let summary = indexer.index_all()?;

        info!(indexed = summary.indexed, "initialized content repository");
        Ok((log, summary))
    }

    /// Pull upstream changes and re-index exactly the files that changed.
    pub fn update(&self) -> Result<SyncOutcome> {
        let content = self.config.content_root();
        if !content.exists() {
            return Ok(SyncOutcome::NoContent);
        }

        let _lock = NamedLock::acquire(&self.config.store_root(), "update")?;

        let (changed, log) = self.vcs.has_remote_changes(&content)?;
        if !changed {
            return Ok(SyncOutcome::NoChanges { log });
        }

        // The change set is computed against the fetched tip before the
        // working tree moves, so it matches what apply checks out.
        let changes = self.vcs.changed_paths(&content)?;
        let (_, apply_log) = self.vcs.apply_remote_changes(&content)?;

        let indexer = Indexer::new(self.config, self.store);
        let summary = indexer.index_changed(&changes)?;

        info!(
            changed = changes.len(),
            indexed = summary.indexed,
            removed = summary.removed,
            "update complete"
        );
        Ok(SyncOutcome::Indexed {
            log: format!("{}{}", log, apply_log),
            summary,
        })
    }

    /// Rebuild the whole index from the content tree on disk, no fetching.
    pub fn reindex(&self) -> Result<IndexSummary> {
        let content = self.config.content_root();
        if !content.exists() {
            return Err(Error::MissingContentRoot(content).into());
        }

        let _lock = NamedLock::acquire(&self.config.store_root(), "update")?;

        let indexer = Indexer::new(self.config, self.store);
        indexer.index_all()
    }
}
