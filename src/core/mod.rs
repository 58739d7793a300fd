//! Sync and indexing pipeline.

pub mod indexer;
pub mod lock;
pub mod meta;
pub mod snippets;
pub mod sync;

pub use indexer::{Indexer, IndexOutcome, IndexSummary};
pub use lock::NamedLock;
pub use sync::{SyncOutcome, Syncer};
