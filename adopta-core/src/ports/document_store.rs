//! Document store port - keyed documents grouped into collections

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::Document;

/// Remote document store abstraction
///
/// Documents are addressed by `(collection, key)`. Every call is
/// independently failable and the store is last-writer-wins; this core
/// adds no retries or conflict resolution on top.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` if it does not exist
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Create or fully replace a document
    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<()>;

    /// Merge the given fields into an existing document
    ///
    /// Fields not named are untouched. Fails if the document is missing.
    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<()>;

    /// Delete a document (deleting a missing key is store-defined)
    async fn delete(&self, collection: &str, key: &str) -> Result<()>;

    /// Insert a new document under a store-assigned key, returning the key
    async fn insert(&self, collection: &str, doc: Document) -> Result<String>;
}
