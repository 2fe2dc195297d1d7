//! In-process [`DocumentStore`] with live listeners.
//!
//! Besides serving the application in demos and tests, `MemoryStore`
//! records every call it receives and can be told to fail specific calls,
//! which is how adapter behaviour under partial failure is exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    Document, DocumentSnapshot, DocumentStore, DocumentWrite, FieldChange, Fields, Listener,
    ListenerRegistration, Query, QuerySnapshot, StoreError, StoreResult, DEFAULT_MAX_IN_VALUES,
};

/// Kind of store call, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Query,
    Listen,
    Set,
    /// Field updates, including increments and array operations.
    Update,
    Delete,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub collection: String,
    pub id: Option<String>,
}

struct Fault {
    op: StoreOp,
    collection: String,
    message: String,
}

struct Delay {
    op: StoreOp,
    collection: String,
    duration: Duration,
}

enum ListenerEntry {
    Query {
        query: Query,
        last: Vec<Document>,
        sender: mpsc::UnboundedSender<StoreResult<QuerySnapshot>>,
    },
    Document {
        collection: String,
        id: String,
        sender: mpsc::UnboundedSender<StoreResult<DocumentSnapshot>>,
    },
}

impl ListenerEntry {
    fn collection(&self) -> &str {
        match self {
            ListenerEntry::Query { query, .. } => &query.collection,
            ListenerEntry::Document { collection, .. } => collection,
        }
    }
}

type Collections = HashMap<String, BTreeMap<String, Fields>>;

struct Inner {
    collections: RwLock<Collections>,
    listeners: Mutex<HashMap<u64, ListenerEntry>>,
    next_listener_id: AtomicU64,
    last_timestamp: Mutex<i64>,
    calls: Mutex<Vec<StoreCall>>,
    faults: Mutex<Vec<Fault>>,
    delays: Mutex<Vec<Delay>>,
    teardowns: AtomicUsize,
    max_in_values: usize,
}

/// Shared in-memory document store. Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_in_values(DEFAULT_MAX_IN_VALUES)
    }

    /// Store whose `in` filters reject more than `max_in_values` values.
    pub fn with_max_in_values(max_in_values: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                listeners: Mutex::new(HashMap::new()),
                next_listener_id: AtomicU64::new(1),
                last_timestamp: Mutex::new(0),
                calls: Mutex::new(Vec::new()),
                faults: Mutex::new(Vec::new()),
                delays: Mutex::new(Vec::new()),
                teardowns: AtomicUsize::new(0),
                max_in_values,
            }),
        }
    }

    /// Inserts a document without recording a call. Listeners are notified.
    pub fn seed(&self, collection: &str, id: &str, fields: Fields) {
        self.inner
            .collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.notify(collection, id);
    }

    /// Reads a document without recording a call.
    pub fn document(&self, collection: &str, id: &str) -> Option<Fields> {
        self.inner
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.calls.lock().clone()
    }

    /// Number of recorded calls of `op` against `collection`.
    pub fn call_count(&self, op: StoreOp, collection: &str) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|call| call.op == op && call.collection == collection)
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }

    /// Makes the next `op` call against `collection` fail with `message`.
    pub fn fail_next(&self, op: StoreOp, collection: &str, message: &str) {
        self.inner.faults.lock().push(Fault {
            op,
            collection: collection.to_string(),
            message: message.to_string(),
        });
    }

    /// Makes the next `op` call against `collection` wait `duration`
    /// before it is served.
    pub fn delay_next(&self, op: StoreOp, collection: &str, duration: Duration) {
        self.inner.delays.lock().push(Delay {
            op,
            collection: collection.to_string(),
            duration,
        });
    }

    /// Delivers a listener error to every listener on `collection`.
    /// The listeners stay registered.
    pub fn fail_listeners(&self, collection: &str, message: &str) {
        let listeners = self.inner.listeners.lock();
        for entry in listeners.values() {
            if entry.collection() != collection {
                continue;
            }
            let error = StoreError::Unavailable(message.to_string());
            match entry {
                ListenerEntry::Query { sender, .. } => {
                    let _ = sender.send(Err(error));
                }
                ListenerEntry::Document { sender, .. } => {
                    let _ = sender.send(Err(error));
                }
            }
        }
    }

    pub fn active_listeners(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Number of listener registrations torn down so far.
    pub fn teardown_count(&self) -> usize {
        self.inner.teardowns.load(Ordering::SeqCst)
    }

    fn record(&self, op: StoreOp, collection: &str, id: Option<&str>) -> StoreResult<()> {
        self.inner
            .calls
            .lock()
            .push(StoreCall {
                op,
                collection: collection.to_string(),
                id: id.map(str::to_string),
            });

        let mut faults = self.inner.faults.lock();
        if let Some(index) = faults
            .iter()
            .position(|fault| fault.op == op && fault.collection == collection)
        {
            let fault = faults.remove(index);
            warn!(?op, collection, ?id, message = %fault.message, "injected store failure");
            return Err(StoreError::Unavailable(fault.message));
        }
        Ok(())
    }

    async fn stall(&self, op: StoreOp, collection: &str) {
        let duration = {
            let mut delays = self.inner.delays.lock();
            delays
                .iter()
                .position(|delay| delay.op == op && delay.collection == collection)
                .map(|index| delays.remove(index).duration)
        };
        if let Some(duration) = duration {
            debug!(?op, collection, ?duration, "delaying store call");
            tokio::time::sleep(duration).await;
        }
    }

    fn check_in_limit(&self, query: &Query) -> StoreResult<()> {
        let values = query.max_in_values();
        if values > self.inner.max_in_values {
            return Err(StoreError::InvalidQuery(format!(
                "'in' filters support at most {} values, got {}",
                self.inner.max_in_values, values
            )));
        }
        Ok(())
    }

    /// Strictly increasing millisecond clock for server timestamps.
    fn next_timestamp(&self) -> i64 {
        let mut last = self.inner.last_timestamp.lock();
        let now = Utc::now().timestamp_millis().max(*last + 1);
        *last = now;
        now
    }

    fn run_query(collections: &Collections, query: &Query) -> Vec<Document> {
        match collections.get(&query.collection) {
            Some(docs) => query.evaluate(docs.iter()),
            None => Vec::new(),
        }
    }

    /// Pushes fresh snapshots to listeners affected by a write to
    /// `collection/id`. Query listeners only hear about changed result sets.
    fn notify(&self, collection: &str, id: &str) {
        let mut listeners = self.inner.listeners.lock();
        let collections = self.inner.collections.read();

        listeners.retain(|_, entry| match entry {
            ListenerEntry::Query {
                query,
                last,
                sender,
            } => {
                if query.collection != collection {
                    return true;
                }
                let documents = Self::run_query(&collections, query);
                if documents == *last {
                    return true;
                }
                *last = documents.clone();
                sender.send(Ok(QuerySnapshot { documents })).is_ok()
            }
            ListenerEntry::Document {
                collection: watched,
                id: watched_id,
                sender,
            } => {
                if watched != collection || watched_id != id {
                    return true;
                }
                let fields = collections.get(collection).and_then(|docs| docs.get(id)).cloned();
                sender
                    .send(Ok(DocumentSnapshot {
                        id: id.to_string(),
                        fields,
                    }))
                    .is_ok()
            }
        });
    }

    fn register(&self, entry: impl FnOnce(&Collections) -> ListenerEntry) -> ListenerRegistration {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut listeners = self.inner.listeners.lock();
            let collections = self.inner.collections.read();
            listeners.insert(id, entry(&collections));
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                let removed = inner
                    .listeners
                    .lock()
                    .remove(&id)
                    .is_some();
                if removed {
                    inner.teardowns.fetch_add(1, Ordering::SeqCst);
                    debug!(listener_id = id, "listener removed");
                }
            }
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.stall(StoreOp::Get, collection).await;
        self.record(StoreOp::Get, collection, Some(id))?;
        Ok(self
            .document(collection, id)
            .map(|fields| Document::new(id, fields)))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.stall(StoreOp::Query, &query.collection).await;
        self.record(StoreOp::Query, &query.collection, None)?;
        self.check_in_limit(query)?;
        let collections = self.inner.collections.read();
        Ok(Self::run_query(&collections, query))
    }

    fn listen_query(&self, query: Query) -> StoreResult<Listener<QuerySnapshot>> {
        self.record(StoreOp::Listen, &query.collection, None)?;
        self.check_in_limit(&query)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let registration = self.register(move |collections| {
            let documents = Self::run_query(collections, &query);
            let _ = sender.send(Ok(QuerySnapshot {
                documents: documents.clone(),
            }));
            ListenerEntry::Query {
                query,
                last: documents,
                sender,
            }
        });
        Ok(Listener::new(receiver, registration))
    }

    fn listen_document(
        &self,
        collection: &str,
        id: &str,
    ) -> StoreResult<Listener<DocumentSnapshot>> {
        self.record(StoreOp::Listen, collection, Some(id))?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let collection = collection.to_string();
        let id = id.to_string();
        let registration = self.register(move |collections| {
            let fields = collections
                .get(&collection)
                .and_then(|docs| docs.get(&id))
                .cloned();
            let _ = sender.send(Ok(DocumentSnapshot {
                id: id.clone(),
                fields,
            }));
            ListenerEntry::Document {
                collection,
                id,
                sender,
            }
        });
        Ok(Listener::new(receiver, registration))
    }

    async fn set(&self, collection: &str, id: &str, write: DocumentWrite) -> StoreResult<()> {
        self.stall(StoreOp::Set, collection).await;
        self.record(StoreOp::Set, collection, Some(id))?;

        let mut fields = write.fields;
        for field in write.server_timestamps {
            fields.insert(field, self.next_timestamp().into());
        }
        self.inner
            .collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);

        debug!(collection, id, "document set");
        self.notify(collection, id);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Vec<FieldChange>,
    ) -> StoreResult<()> {
        self.stall(StoreOp::Update, collection).await;
        self.record(StoreOp::Update, collection, Some(id))?;

        {
            let mut collections = self.inner.collections.write();
            let fields = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            let now = self.next_timestamp();
            for change in &changes {
                change.apply(fields, now);
            }
        }

        debug!(collection, id, changes = changes.len(), "document updated");
        self.notify(collection, id);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.stall(StoreOp::Delete, collection).await;
        self.record(StoreOp::Delete, collection, Some(id))?;

        let existed = self
            .inner
            .collections
            .write()
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();

        if existed {
            debug!(collection, id, "document deleted");
            self.notify(collection, id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn ids(snapshot: &QuerySnapshot) -> Vec<&str> {
        snapshot.documents.iter().map(|d| d.id.as_str()).collect()
    }

    #[tokio::test]
    async fn query_listener_gets_initial_snapshot_then_changes() {
        let store = MemoryStore::new();
        store.seed("articles", "a", fields(json!({ "published": true })));

        let query = Query::collection("articles").where_eq("published", true);
        let mut listener = store.listen_query(query).unwrap();

        let initial = listener.recv().await.unwrap().unwrap();
        assert_eq!(ids(&initial), vec!["a"]);

        store
            .set("articles", "b", fields(json!({ "published": true })).into())
            .await
            .unwrap();
        let changed = listener.recv().await.unwrap().unwrap();
        assert_eq!(ids(&changed), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn writes_outside_the_result_set_are_not_delivered() {
        let store = MemoryStore::new();
        let query = Query::collection("articles").where_eq("published", true);
        let mut listener = store.listen_query(query).unwrap();
        let _ = listener.recv().await;

        store
            .set("articles", "draft", fields(json!({ "published": false })).into())
            .await
            .unwrap();
        store
            .set("comments", "c1", fields(json!({ "published": true })).into())
            .await
            .unwrap();

        assert!(listener.try_recv().is_none());
    }

    #[tokio::test]
    async fn document_listener_sees_absence_and_creation() {
        let store = MemoryStore::new();
        let mut listener = store.listen_document("articles", "a1").unwrap();

        let first = listener.recv().await.unwrap().unwrap();
        assert!(!first.exists());

        store
            .set("articles", "a1", fields(json!({ "title": "x" })).into())
            .await
            .unwrap();
        let created = listener.recv().await.unwrap().unwrap();
        assert_eq!(created.fields.unwrap()["title"], "x");

        store.delete("articles", "a1").await.unwrap();
        assert!(!listener.recv().await.unwrap().unwrap().exists());
    }

    #[tokio::test]
    async fn removal_is_idempotent_and_counted_once() {
        let store = MemoryStore::new();
        let mut listener = store
            .listen_query(Query::collection("articles"))
            .unwrap();
        let registration = listener.registration();
        assert_eq!(store.active_listeners(), 1);

        assert!(registration.remove());
        assert!(!registration.remove());
        drop(registration);

        let _initial = listener.recv().await;
        assert!(listener.recv().await.is_none());
        drop(listener);

        assert_eq!(store.active_listeners(), 0);
        assert_eq!(store.teardown_count(), 1);
    }

    #[tokio::test]
    async fn listener_errors_keep_the_listener_open() {
        let store = MemoryStore::new();
        let mut listener = store
            .listen_query(Query::collection("comments"))
            .unwrap();
        let _ = listener.recv().await;

        store.fail_listeners("comments", "stream reset");
        let err = listener.recv().await.unwrap().unwrap_err();
        assert_eq!(err, StoreError::Unavailable("stream reset".into()));

        store
            .set("comments", "c1", Fields::new().into())
            .await
            .unwrap();
        assert_eq!(ids(&listener.recv().await.unwrap().unwrap()), vec!["c1"]);
    }

    #[tokio::test]
    async fn in_filter_limit_is_enforced() {
        let store = MemoryStore::with_max_in_values(2);
        let query = Query::collection("articles").where_in("id", ["a", "b", "c"]);

        let err = store.query(&query).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn injected_fault_is_consumed_once() {
        let store = MemoryStore::new();
        store.seed("users", "u1", Fields::new());
        store.fail_next(StoreOp::Update, "users", "deadline exceeded");

        let err = store
            .increment("users", "u1", "visits", 1)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "deadline exceeded");

        store.increment("users", "u1", "visits", 1).await.unwrap();
        assert_eq!(store.document("users", "u1").unwrap()["visits"], 1);
        assert_eq!(store.call_count(StoreOp::Update, "users"), 2);
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .array_union("users", "ghost", "savedArticles", json!("a1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn server_timestamps_strictly_increase() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            store
                .set(
                    "articles",
                    id,
                    DocumentWrite::new(Fields::new()).with_server_timestamp("publishedAt"),
                )
                .await
                .unwrap();
        }
        let stamp = |id: &str| store.document("articles", id).unwrap()["publishedAt"]
            .as_i64()
            .unwrap();
        assert!(stamp("a") < stamp("b"));
        assert!(stamp("b") < stamp("c"));
    }

    #[tokio::test]
    async fn calls_are_logged_in_order() {
        let store = MemoryStore::new();
        let _ = store.get("users", "u1").await;
        let _ = store.delete("users/u1/likes", "a1").await;

        assert_eq!(
            store.calls(),
            vec![
                StoreCall {
                    op: StoreOp::Get,
                    collection: "users".into(),
                    id: Some("u1".into()),
                },
                StoreCall {
                    op: StoreOp::Delete,
                    collection: "users/u1/likes".into(),
                    id: Some("a1".into()),
                },
            ]
        );
        store.clear_calls();
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn delayed_call_waits_once() {
        let store = MemoryStore::new();
        store.seed("users", "u1", fields(json!({ "displayName": "U" })));
        store.delay_next(StoreOp::Get, "users", Duration::from_millis(100));

        let started = std::time::Instant::now();
        assert!(store.get("users", "u1").await.unwrap().is_some());
        assert!(started.elapsed() >= Duration::from_millis(100));

        let again = std::time::Instant::now();
        store.get("users", "u1").await.unwrap();
        assert!(again.elapsed() < Duration::from_millis(100));
    }
}
