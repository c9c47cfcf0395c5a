//! # Moonlight Store
//!
//! The storage collaborator behind the availability engine.
//!
//! Everything above this crate talks to storage through [`DocumentStore`] using
//! structural values only: a [`Predicate`] describes which documents match, a
//! list of [`Stage`]s describes an aggregation, and a [`Mutation`] describes an
//! update. No query language string crosses this boundary.
//!
//! [`MemoryStore`] is the bundled implementation. It keeps every collection in
//! memory and, when opened on a data directory, persists each collection as a
//! `<collection>.json` array of objects.
//!
//! ## Atomicity
//!
//! Each call is atomic for the documents it touches. There are no transactions
//! spanning more than one call.

mod memory;
mod mutation;
mod pipeline;
mod predicate;

pub use memory::MemoryStore;
pub use mutation::Mutation;
pub use pipeline::{Accumulator, FindOptions, Group, Sort, SortDirection, Stage};
pub use predicate::{lookup, Predicate};

use std::path::PathBuf;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field holding a document's identity.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("data directory does not exist: {}", .0.display())]
    MissingDataDir(PathBuf),
    #[error("failed to read collection file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write collection file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("collection file {} is not a JSON array of objects: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialise collection {collection}: {source}")]
    Serialise {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// True when the failure stems from the shape of the request rather than
    /// from the storage backend itself.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidQuery(_) | StoreError::InvalidPattern { .. }
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Contract every storage backend fulfils.
///
/// Implementations provide their own connection handling; callers hold an
/// `Arc<dyn DocumentStore>` and share it freely across request workers.
pub trait DocumentStore: Send + Sync {
    fn count(&self, collection: &str, predicate: &Predicate) -> StoreResult<u64>;

    fn find_one(
        &self,
        collection: &str,
        predicate: &Predicate,
        sort: Option<&Sort>,
    ) -> StoreResult<Option<Document>>;

    fn find_many(
        &self,
        collection: &str,
        predicate: &Predicate,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;

    fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> StoreResult<Vec<Document>>;

    /// Applies `mutation` to the first matching document. With `upsert`, a
    /// missing document is created from the predicate's equality fields.
    fn update_one(
        &self,
        collection: &str,
        predicate: &Predicate,
        mutation: &Mutation,
        upsert: bool,
    ) -> StoreResult<UpdateResult>;

    fn delete_one(&self, collection: &str, predicate: &Predicate) -> StoreResult<DeleteResult>;
}
