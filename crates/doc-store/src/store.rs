use async_trait::async_trait;
use serde_json::Value;

use crate::{
    Document, DocumentSnapshot, DocumentWrite, FieldChange, Listener, Query, QuerySnapshot,
    StoreResult,
};

/// Operations the application needs from the hosted document database.
///
/// Collections are addressed by path, so subcollections are plain strings
/// such as `users/u1/likes`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Runs a query once.
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Opens a live query. The current result set is delivered first.
    fn listen_query(&self, query: Query) -> StoreResult<Listener<QuerySnapshot>>;

    /// Opens a live listener on one document. The current state is delivered first.
    fn listen_document(&self, collection: &str, id: &str)
        -> StoreResult<Listener<DocumentSnapshot>>;

    /// Creates or replaces a document.
    async fn set(&self, collection: &str, id: &str, write: DocumentWrite) -> StoreResult<()>;

    /// Applies field changes to an existing document, all or nothing.
    async fn update(&self, collection: &str, id: &str, changes: Vec<FieldChange>)
        -> StoreResult<()>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> StoreResult<()> {
        self.update(collection, id, vec![FieldChange::increment(field, delta)])
            .await
    }

    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        self.update(collection, id, vec![FieldChange::array_union(field, value)])
            .await
    }

    async fn array_remove(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> StoreResult<()> {
        self.update(collection, id, vec![FieldChange::array_remove(field, value)])
            .await
    }
}
