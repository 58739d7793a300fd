//! Version-control collaborator.
//!
//! The sync orchestrator only ever talks to the [`VersionControl`] trait:
//! "are there remote changes", "which paths changed", "apply them", each with
//! a human-readable log. [`Git`] implements it with libgit2 (git2 crate).

use anyhow::{Context, Result};
use git2::build::CheckoutBuilder;
use git2::{Delta, Oid, Repository};
use std::path::Path;
use tracing::info;

/// One entry of the name-only diff between the local head and the upstream
/// branch tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    /// Path relative to the content root, forward slashes.
    pub path: String,
    /// True when the file no longer exists upstream.
    pub deleted: bool,
}

pub trait VersionControl {
    /// Clone the upstream repository into `dest`, returning a log string.
    fn clone_to(&self, url: &str, dest: &Path) -> Result<String>;

    /// Fetch and report whether the upstream branch is ahead of the local
    /// head, with a log of the incoming commits.
    fn has_remote_changes(&self, root: &Path) -> Result<(bool, String)>;

    /// Name-only diff of the local head against the last fetched upstream
    /// tip. Call after [`has_remote_changes`](Self::has_remote_changes).
    fn changed_paths(&self, root: &Path) -> Result<Vec<ChangedPath>>;

    /// Fast-forward the local branch to the fetched upstream tip and check
    /// the working tree out. Returns whether anything was applied.
    fn apply_remote_changes(&self, root: &Path) -> Result<(bool, String)>;
}

/// git2-backed implementation.
pub struct Git {
    remote: String,
    branch: String,
}

impl Git {
    pub fn new(remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    fn open(&self, root: &Path) -> Result<Repository> {
        Repository::open(root).with_context(|| format!("Failed to open git repo at {:?}", root))
    }

    fn fetch(&self, repo: &Repository) -> Result<()> {
        let mut remote = repo
            .find_remote(&self.remote)
            .with_context(|| format!("No remote named `{}`", self.remote))?;
        // An empty refspec list uses the remote's configured refspecs, which
        // keeps the remote-tracking branches up to date.
        remote
            .fetch(&[] as &[&str], None, None)
            .with_context(|| format!("Failed to fetch from `{}`", self.remote))?;
        Ok(())
    }

    fn local_oid(&self, repo: &Repository) -> Result<Oid> {
        Ok(repo
            .head()
            .context("Repository has no HEAD")?
            .peel_to_commit()
            .context("HEAD does not point at a commit")?
            .id())
    }

    fn upstream_oid(&self, repo: &Repository) -> Result<Oid> {
        let refname = format!("refs/remotes/{}/{}", self.remote, self.branch);
        repo.refname_to_id(&refname)
            .with_context(|| format!("No upstream branch `{}`", refname))
    }

    fn incoming_log(&self, repo: &Repository, local: Oid, upstream: Oid) -> Result<String> {
        let mut revwalk = repo.revwalk()?;
        revwalk.push(upstream)?;
        revwalk.hide(local)?;

        let mut log = String::new();
        for oid in revwalk {
            let oid = oid?;
            let commit = repo.find_commit(oid)?;
            let short = &oid.to_string()[..7];
            log.push_str(&format!(
                "{} {}\n",
                short,
                commit.summary().unwrap_or("(no message)")
            ));
        }
        Ok(log)
    }
}

impl VersionControl for Git {
    fn clone_to(&self, url: &str, dest: &Path) -> Result<String> {
        Repository::clone(url, dest)
            .with_context(|| format!("Failed to clone {} into {:?}", url, dest))?;
        info!(%url, ?dest, "cloned content repository");
        Ok(format!("Cloned {} into {}\n", url, dest.display()))
    }

    fn has_remote_changes(&self, root: &Path) -> Result<(bool, String)> {
        let repo = self.open(root)?;
        self.fetch(&repo)?;

        let local = self.local_oid(&repo)?;
        let upstream = self.upstream_oid(&repo)?;
        if local == upstream {
            return Ok((false, String::new()));
        }

        let log = self.incoming_log(&repo, local, upstream)?;
        Ok((!log.is_empty(), log))
    }

    fn changed_paths(&self, root: &Path) -> Result<Vec<ChangedPath>> {
        let repo = self.open(root)?;
        let local_tree = repo.find_commit(self.local_oid(&repo)?)?.tree()?;
        let upstream_tree = repo.find_commit(self.upstream_oid(&repo)?)?.tree()?;

        let diff = repo.diff_tree_to_tree(Some(&local_tree), Some(&upstream_tree), None)?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            let deleted = delta.status() == Delta::Deleted;
            let file = if deleted {
                delta.old_file()
            } else {
                delta.new_file()
            };
            if let Some(path) = file.path() {
                changes.push(ChangedPath {
                    path: path.to_string_lossy().replace('\\', "/"),
                    deleted,
                });
            }
        }
        Ok(changes)
    }

    fn apply_remote_changes(&self, root: &Path) -> Result<(bool, String)> {
        let repo = self.open(root)?;
        let local = self.local_oid(&repo)?;
        let upstream = self.upstream_oid(&repo)?;
        if local == upstream {
            return Ok((false, "Already up to date\n".to_string()));
        }

        let refname = format!("refs/heads/{}", self.branch);
        let mut reference = repo
            .find_reference(&refname)
            .with_context(|| format!("No local branch `{}`", self.branch))?;
        reference.set_target(upstream, "mdpages: fast-forward")?;
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::new().force()))
            .context("Failed to check out the updated tree")?;

        info!(branch = %self.branch, oid = %upstream, "fast-forwarded content tree");
        Ok((
            true,
            format!(
                "Fast-forwarded {} to {}\n",
                self.branch,
                &upstream.to_string()[..7]
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn commit_all(root: &Path, message: &str) {
        let repo = Repository::open(root).unwrap();
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree_oid = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    fn upstream_with(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let upstream = temp.path().join("upstream");
        let repo = Repository::init(&upstream).unwrap();
        // Pin the branch name so the test does not depend on host git config.
        repo.set_head("refs/heads/master").unwrap();
        for (path, content) in files {
            let full = upstream.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        commit_all(&upstream, "initial content");
        (temp, upstream)
    }

    #[test]
    fn test_clone_and_no_changes() {
        let (temp, upstream) = upstream_with(&[("index.md", "# Home")]);
        let content = temp.path().join("content");

        let git = Git::new("origin", "master");
        git.clone_to(upstream.to_str().unwrap(), &content).unwrap();
        assert!(content.join("index.md").exists());

        let (changed, log) = git.has_remote_changes(&content).unwrap();
        assert!(!changed);
        assert!(log.is_empty());
    }

    #[test]
    fn test_detects_and_applies_remote_changes() {
        let (temp, upstream) = upstream_with(&[("index.md", "# Home")]);
        let content = temp.path().join("content");
        let git = Git::new("origin", "master");
        git.clone_to(upstream.to_str().unwrap(), &content).unwrap();

        fs::write(upstream.join("guide.md"), "# Guide").unwrap();
        fs::write(upstream.join("index.md"), "# New home").unwrap();
        commit_all(&upstream, "add guide");

        let (changed, log) = git.has_remote_changes(&content).unwrap();
        assert!(changed);
        assert!(log.contains("add guide"));

        let mut paths = git.changed_paths(&content).unwrap();
        paths.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].path, "guide.md");
        assert!(!paths[0].deleted);

        let (applied, _) = git.apply_remote_changes(&content).unwrap();
        assert!(applied);
        assert_eq!(
            fs::read_to_string(content.join("index.md")).unwrap(),
            "# New home"
        );
        assert!(content.join("guide.md").exists());

        // A second pass is a clean no-op.
        let (changed, _) = git.has_remote_changes(&content).unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_detects_deletions() {
        let (temp, upstream) = upstream_with(&[("index.md", "# Home"), ("old.md", "# Old")]);
        let content = temp.path().join("content");
        let git = Git::new("origin", "master");
        git.clone_to(upstream.to_str().unwrap(), &content).unwrap();

        fs::remove_file(upstream.join("old.md")).unwrap();
        commit_all(&upstream, "drop old page");

        let (changed, _) = git.has_remote_changes(&content).unwrap();
        assert!(changed);

        let paths = git.changed_paths(&content).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path, "old.md");
        assert!(paths[0].deleted);

        git.apply_remote_changes(&content).unwrap();
        assert!(!content.join("old.md").exists());
    }
}
