//! Document-store layer for the clinic.
//!
//! The repositories only ever talk to a [`DocumentStore`]: a collection of
//! schema-less JSON documents addressable by a generated id and queryable by
//! conjunctive field predicates. Two stores ship with the crate:
//!
//! - [`MemoryStore`]: in-process maps, used by tests and ephemeral setups
//! - [`SqliteStore`]: embedded SQLite holding one JSON body per document

mod memory;
mod predicate;
mod schema;
mod sqlite;

pub use memory::*;
pub use predicate::*;
pub use schema::*;
pub use sqlite::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Document-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Unsupported predicate value for field {0}")]
    UnsupportedValue(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store lock poisoned: {0}")]
    Poisoned(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Stable label for logs and error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Sqlite(_) => "sqlite",
            StoreError::Json(_) => "json",
            StoreError::NotFound(_) => "not_found",
            StoreError::InvalidField(_) => "invalid_field",
            StoreError::UnsupportedValue(_) => "unsupported_value",
            StoreError::InvalidInput(_) => "invalid_input",
            StoreError::Poisoned(_) => "poisoned",
            StoreError::Task(_) => "task",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Top-level fields of a stored document (the id is kept outside the body).
pub type Fields = Map<String, Value>;

/// A document snapshot returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Body with the id folded in as an `id` field, ready for deserialization.
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Value::Object(fields)
    }
}

/// Outcome of a write guarded by a uniqueness condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedWrite<T> {
    /// No conflicting document existed; the write was performed.
    Applied(T),
    /// A conflicting document exists; nothing was written.
    Conflict,
}

/// The boundary to the document database.
///
/// Every method is a single round trip. Queries AND their predicates together
/// and return documents in ascending id order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` if absent.
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Run a conjunctive query. An empty predicate list returns the whole collection.
    async fn query(&self, collection: &str, predicates: &[Predicate]) -> StoreResult<Vec<Document>>;

    /// Insert a document and return its generated id.
    async fn insert_document(&self, collection: &str, fields: Fields) -> StoreResult<String>;

    /// Merge `fields` into an existing document. Fails with
    /// [`StoreError::NotFound`] when the id does not exist.
    async fn update_document(&self, collection: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Delete a document. Deleting a missing id succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Insert unless a document matching `unique` already exists, atomically.
    async fn insert_unique(
        &self,
        collection: &str,
        fields: Fields,
        unique: &[Predicate],
    ) -> StoreResult<GuardedWrite<String>>;

    /// Merge into `id` unless another document matches `unique`, atomically.
    ///
    /// With `exclude_self` unset the document being updated counts as a
    /// conflict when it matches.
    async fn update_unique(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        unique: &[Predicate],
        exclude_self: bool,
    ) -> StoreResult<GuardedWrite<()>>;
}

/// Native timestamp representation: epoch milliseconds.
pub fn timestamp_value(instant: &DateTime<Utc>) -> Value {
    Value::from(instant.timestamp_millis())
}

/// Generate a new document id.
pub(crate) fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Shallow merge, the semantics of a partial document update.
pub(crate) fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}
