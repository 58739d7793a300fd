//! Error taxonomy for the page engine.
//!
//! Operational errors callers are expected to match on. Everything else is
//! carried as plain `anyhow` context.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Another invocation already holds the named sync lock.
    #[error("command is already running: lock `{0}` is held by another process")]
    LockContention(String),

    /// A leading metadata block was opened but never closed.
    #[error("malformed front matter: `{opening}` without a matching `{closing}`")]
    MetadataParse {
        opening: &'static str,
        closing: &'static str,
    },

    /// A page URL was requested that has no record in the index.
    #[error("no page found for url `{0}`")]
    MissingPage(String),

    /// The content tree has not been cloned yet.
    #[error("content directory {0:?} does not exist")]
    MissingContentRoot(PathBuf),
}
